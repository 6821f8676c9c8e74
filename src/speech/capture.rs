//! Speech capture adapter
//!
//! Wraps a platform speech-to-text capability. Each start-to-end cycle of the
//! recognizer is a *bout* identified by a `BoutId`; every callback the platform
//! delivers is tagged with the bout it belongs to so that late callbacks from
//! a finished bout can be told apart from the current one.
//!
//! The recognizer runs non-continuous with interim results: it ends itself
//! after one utterance and reports `CaptureSignal::Ended`.

use crate::{QuizError, Result};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of one recognition bout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoutId(Uuid);

impl BoutId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BoutId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BoutId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bout-{}", self.0.simple())
    }
}

/// Configuration handed to the platform recognizer
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// BCP 47 language tag
    pub language: String,

    /// Keep listening after the first utterance
    pub continuous: bool,

    /// Deliver in-progress hypotheses before the segment is final
    pub interim_results: bool,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            language: "fr-FR".to_string(),
            continuous: false,
            interim_results: true,
        }
    }
}

impl RecognizerConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Error kinds reported by a platform recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// The user refused microphone access
    NotAllowed,
    /// The platform refused the recognition service
    ServiceNotAllowed,
    NoSpeech,
    AudioCapture,
    Network,
    LanguageNotSupported,
    /// The bout was stopped by us
    Aborted,
    Other(String),
}

impl RecognitionErrorKind {
    /// Translate into the engine's error taxonomy.
    ///
    /// Returns `None` for errors that only echo our own `stop()`.
    pub fn into_quiz_error(self) -> Option<QuizError> {
        match self {
            RecognitionErrorKind::NotAllowed | RecognitionErrorKind::ServiceNotAllowed => {
                Some(QuizError::PermissionDenied)
            }
            RecognitionErrorKind::NoSpeech => {
                Some(QuizError::Recognition("no speech detected".to_string()))
            }
            RecognitionErrorKind::AudioCapture => {
                Some(QuizError::Recognition("no microphone available".to_string()))
            }
            RecognitionErrorKind::Network => {
                Some(QuizError::Recognition("recognition service unreachable".to_string()))
            }
            RecognitionErrorKind::LanguageNotSupported => Some(QuizError::Unsupported),
            RecognitionErrorKind::Aborted => None,
            RecognitionErrorKind::Other(message) => Some(QuizError::Recognition(message)),
        }
    }
}

/// Messages from the capture device to the session engine
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureSignal {
    /// Best current transcript for the bout
    Transcript { bout: BoutId, text: String },

    /// The bout failed
    Failed { bout: BoutId, error: QuizError },

    /// The bout ended, either on its own or after `stop()`
    Ended { bout: BoutId },
}

impl CaptureSignal {
    pub fn bout(&self) -> BoutId {
        match self {
            CaptureSignal::Transcript { bout, .. }
            | CaptureSignal::Failed { bout, .. }
            | CaptureSignal::Ended { bout } => *bout,
        }
    }
}

/// Live transcript of one bout.
///
/// Final segments are concatenated; the interim segment replaces the previous
/// interim segment after the finalized prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptBuffer {
    finalized: String,
    interim: String,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, is_final: bool, text: &str) {
        let text = text.trim();
        if is_final {
            if !text.is_empty() {
                if !self.finalized.is_empty() {
                    self.finalized.push(' ');
                }
                self.finalized.push_str(text);
            }
            self.interim.clear();
        } else {
            self.interim = text.to_string();
        }
    }

    /// Best current guess for the whole bout
    pub fn current(&self) -> String {
        match (self.finalized.is_empty(), self.interim.is_empty()) {
            (_, true) => self.finalized.clone(),
            (true, false) => self.interim.clone(),
            (false, false) => format!("{} {}", self.finalized, self.interim),
        }
    }

    pub fn clear(&mut self) {
        self.finalized.clear();
        self.interim.clear();
    }
}

/// Callback target handed to a platform recognizer for one bout
#[derive(Clone)]
pub struct RecognitionSink {
    bout: BoutId,
    buffer: Arc<Mutex<TranscriptBuffer>>,
    signal_tx: Sender<CaptureSignal>,
}

impl RecognitionSink {
    pub fn new(bout: BoutId, signal_tx: Sender<CaptureSignal>) -> Self {
        Self {
            bout,
            buffer: Arc::new(Mutex::new(TranscriptBuffer::new())),
            signal_tx,
        }
    }

    pub fn bout(&self) -> BoutId {
        self.bout
    }

    /// A recognition result, final or interim
    pub fn on_result(&self, is_final: bool, text: &str) {
        let text = {
            let mut buffer = self.buffer.lock();
            buffer.apply(is_final, text);
            buffer.current()
        };
        self.emit(CaptureSignal::Transcript {
            bout: self.bout,
            text,
        });
    }

    pub fn on_error(&self, kind: RecognitionErrorKind) {
        match kind.into_quiz_error() {
            Some(error) => self.emit(CaptureSignal::Failed {
                bout: self.bout,
                error,
            }),
            None => debug!("Ignoring abort notification for {}", self.bout),
        }
    }

    pub fn on_end(&self) {
        self.emit(CaptureSignal::Ended { bout: self.bout });
    }

    fn emit(&self, signal: CaptureSignal) {
        if self.signal_tx.send(signal).is_err() {
            debug!("Capture signal for {} dropped, engine is gone", self.bout);
        }
    }
}

/// A platform recognizer bound to one bout
pub trait SpeechRecognizer: Send {
    fn start(&mut self) -> Result<()>;

    /// Best effort. The platform may still deliver a late `on_end`.
    fn stop(&mut self);
}

/// Platform speech-to-text capability
pub trait RecognitionPlatform: Send + Sync {
    fn is_supported(&self) -> bool;

    /// Create a recognizer that reports into `sink`.
    ///
    /// Fails with `QuizError::Unsupported` when the platform has no recognizer.
    fn create(
        &self,
        config: &RecognizerConfig,
        sink: RecognitionSink,
    ) -> Result<Box<dyn SpeechRecognizer>>;
}

/// Platform without any speech recognition
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedPlatform;

impl RecognitionPlatform for UnsupportedPlatform {
    fn is_supported(&self) -> bool {
        false
    }

    fn create(
        &self,
        _config: &RecognizerConfig,
        _sink: RecognitionSink,
    ) -> Result<Box<dyn SpeechRecognizer>> {
        Err(QuizError::Unsupported)
    }
}

/// What a scripted recognizer does when a bout starts
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedBout {
    /// Report the text word by word as interim results, then final, then end
    Utterance(String),
    /// End without any result
    Silence,
    /// Stay silent until stopped
    Hold,
    /// Report an error, then end
    Error(RecognitionErrorKind),
}

/// Recognition platform driven by a queue of scripted bouts.
///
/// Used where no speech hardware exists: the console front end types its
/// "speech", and tests script exact device behaviour. An empty queue
/// behaves like `ScriptedBout::Silence`.
#[derive(Clone, Default)]
pub struct ScriptedPlatform {
    script: Arc<Mutex<VecDeque<ScriptedBout>>>,
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, bout: ScriptedBout) {
        self.script.lock().push_back(bout);
    }

    /// Queue an utterance for the next bout
    pub fn say(&self, text: impl Into<String>) {
        self.push(ScriptedBout::Utterance(text.into()));
    }

    /// Bouts started so far
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Explicit stops issued so far
    pub fn stopped(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl RecognitionPlatform for ScriptedPlatform {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(
        &self,
        _config: &RecognizerConfig,
        sink: RecognitionSink,
    ) -> Result<Box<dyn SpeechRecognizer>> {
        Ok(Box::new(ScriptedRecognizer {
            platform: self.clone(),
            sink,
            ended: false,
        }))
    }
}

struct ScriptedRecognizer {
    platform: ScriptedPlatform,
    sink: RecognitionSink,
    ended: bool,
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(&mut self) -> Result<()> {
        self.platform.started.fetch_add(1, Ordering::SeqCst);
        let bout = self
            .platform
            .script
            .lock()
            .pop_front()
            .unwrap_or(ScriptedBout::Silence);

        match bout {
            ScriptedBout::Utterance(text) => {
                let words: Vec<&str> = text.split_whitespace().collect();
                for n in 1..words.len() {
                    self.sink.on_result(false, &words[..n].join(" "));
                }
                self.sink.on_result(true, &text);
            }
            ScriptedBout::Error(kind) => self.sink.on_error(kind),
            ScriptedBout::Silence => {}
            ScriptedBout::Hold => return Ok(()),
        }

        self.ended = true;
        self.sink.on_end();
        Ok(())
    }

    fn stop(&mut self) {
        self.platform.stopped.fetch_add(1, Ordering::SeqCst);
        if !self.ended {
            // platforms report the abort and a final end after stop()
            self.ended = true;
            self.sink.on_error(RecognitionErrorKind::Aborted);
            self.sink.on_end();
        }
    }
}

struct ActiveBout {
    id: BoutId,
    recognizer: Box<dyn SpeechRecognizer>,
}

/// Owner of the recognition device. At most one bout is active at a time.
pub struct SpeechCapture {
    platform: Arc<dyn RecognitionPlatform>,
    config: RecognizerConfig,
    signal_tx: Sender<CaptureSignal>,
    active: Option<ActiveBout>,
}

impl SpeechCapture {
    pub fn new(
        platform: Arc<dyn RecognitionPlatform>,
        config: RecognizerConfig,
        signal_tx: Sender<CaptureSignal>,
    ) -> Self {
        Self {
            platform,
            config,
            signal_tx,
            active: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.platform.is_supported()
    }

    pub fn active_bout(&self) -> Option<BoutId> {
        self.active.as_ref().map(|active| active.id)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Acquire the device and start a new bout
    pub fn start(&mut self, bout: BoutId) -> Result<()> {
        if let Some(active) = &self.active {
            warn!(
                "Ignoring start of {} while {} is still active",
                bout, active.id
            );
            return Ok(());
        }

        if !self.platform.is_supported() {
            return Err(QuizError::Unsupported);
        }

        let sink = RecognitionSink::new(bout, self.signal_tx.clone());
        let mut recognizer = self.platform.create(&self.config, sink)?;
        if let Err(e) = recognizer.start() {
            recognizer.stop();
            return Err(e);
        }

        info!("Speech capture started ({})", bout);
        self.active = Some(ActiveBout {
            id: bout,
            recognizer,
        });
        Ok(())
    }

    /// Stop and release the given bout if it is the active one
    pub fn stop(&mut self, bout: BoutId) {
        match self.active.take() {
            Some(mut active) if active.id == bout => {
                active.recognizer.stop();
                debug!("Speech capture stopped ({})", bout);
            }
            other => {
                self.active = other;
                debug!("Stop for inactive {} ignored", bout);
            }
        }
    }

    /// Stop whatever bout is active
    pub fn stop_all(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.recognizer.stop();
            debug!("Speech capture released ({})", active.id);
        }
    }

    /// Release the device once the platform reports the bout is over
    pub fn observe(&mut self, signal: &CaptureSignal) {
        let finished = matches!(
            signal,
            CaptureSignal::Ended { .. } | CaptureSignal::Failed { .. }
        );
        if finished && self.active_bout() == Some(signal.bout()) {
            self.stop(signal.bout());
        }
    }
}

impl Drop for SpeechCapture {
    fn drop(&mut self) {
        self.stop_all();
    }
}
