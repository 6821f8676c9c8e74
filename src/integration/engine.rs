//! Quiz engine worker
//!
//! Runs the session machine on a dedicated thread: user commands, recognizer
//! callbacks and backend completions all arrive as messages and are applied
//! one at a time. Backend calls run on a tokio runtime owned by the worker and
//! report back through the completion channel.

use crate::celebration::{Celebration, NoCelebration};
use crate::integration::config::EngineConfig;
use crate::quiz::{QuizClient, QuizFuture};
use crate::session::{elapsed_seconds, Effect, Event, QuizMachine, SessionView};
use crate::speech::{
    CaptureSignal, RecognitionPlatform, SpeechCapture, SpeechPlayback, SpeechSynthesizer,
};
use crate::utils::EngineChannels;
use crate::{QuizError, Result};
use chrono::Utc;
use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, error, info, trace};

/// Actions the view layer can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    /// Start a new session
    Start,

    /// Start or stop the microphone
    ToggleMic,

    /// Commit the current transcript
    Validate,

    /// Commit an empty answer
    Skip,

    /// Re-send answers after a failed submission
    RetrySubmit,

    /// Read the current question aloud
    SpeakPrompt,

    /// Abandon the session
    Reset,

    /// Stop the worker
    Shutdown,
}

impl EngineCommand {
    fn into_event(self) -> Option<Event> {
        match self {
            EngineCommand::Start => Some(Event::Start { at: Utc::now() }),
            EngineCommand::ToggleMic => Some(Event::ToggleMic),
            EngineCommand::Validate => Some(Event::Validate),
            EngineCommand::Skip => Some(Event::Skip),
            EngineCommand::RetrySubmit => Some(Event::RetrySubmit),
            EngineCommand::SpeakPrompt => Some(Event::SpeakPrompt),
            EngineCommand::Reset => Some(Event::Reset),
            EngineCommand::Shutdown => None,
        }
    }
}

/// Notifications emitted by the engine
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// The session view changed
    StateChanged(SessionView),

    /// A high score was celebrated
    Celebrated,

    /// The worker has stopped
    Shutdown,
}

/// Handle for controlling the engine from the view layer
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: Sender<EngineCommand>,
    event_rx: Receiver<EngineEvent>,
    view: Arc<RwLock<SessionView>>,
}

impl EngineHandle {
    /// Send a command to the engine
    pub fn send_command(&self, cmd: EngineCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| QuizError::ChannelError(format!("Failed to send command: {}", e)))
    }

    pub fn start(&self) -> Result<()> {
        self.send_command(EngineCommand::Start)
    }

    pub fn toggle_mic(&self) -> Result<()> {
        self.send_command(EngineCommand::ToggleMic)
    }

    pub fn validate(&self) -> Result<()> {
        self.send_command(EngineCommand::Validate)
    }

    pub fn skip(&self) -> Result<()> {
        self.send_command(EngineCommand::Skip)
    }

    pub fn retry_submit(&self) -> Result<()> {
        self.send_command(EngineCommand::RetrySubmit)
    }

    pub fn speak_prompt(&self) -> Result<()> {
        self.send_command(EngineCommand::SpeakPrompt)
    }

    pub fn reset(&self) -> Result<()> {
        self.send_command(EngineCommand::Reset)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send_command(EngineCommand::Shutdown)
    }

    /// Try to receive an event from the engine
    pub fn try_recv_event(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn event_receiver(&self) -> Receiver<EngineEvent> {
        self.event_rx.clone()
    }

    /// Latest session view (no lock held after return)
    pub fn view(&self) -> SessionView {
        self.view.read().clone()
    }

    /// Poll the view until `predicate` holds or `timeout` expires
    pub fn wait_for<F>(&self, timeout: Duration, predicate: F) -> Option<SessionView>
    where
        F: Fn(&SessionView) -> bool,
    {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let view = self.view();
            if predicate(&view) {
                return Some(view);
            }
            if std::time::Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

/// The engine before its worker thread is started
pub struct QuizEngine {
    config: EngineConfig,
    client: Arc<dyn QuizClient>,
    platform: Arc<dyn RecognitionPlatform>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    celebration: Arc<dyn Celebration>,
    channels: EngineChannels,
    view: Arc<RwLock<SessionView>>,
}

impl QuizEngine {
    /// Create a new engine with the given configuration
    pub fn new(
        config: EngineConfig,
        client: Arc<dyn QuizClient>,
        platform: Arc<dyn RecognitionPlatform>,
    ) -> Result<(Self, EngineHandle)> {
        config.validate()?;

        let channels = EngineChannels::new(config.channel_capacity);
        let view = Arc::new(RwLock::new(SessionView::default()));

        let handle = EngineHandle {
            command_tx: channels.command_tx.clone(),
            event_rx: channels.event_rx.clone(),
            view: Arc::clone(&view),
        };

        let engine = Self {
            config,
            client,
            platform,
            synthesizer: None,
            celebration: Arc::new(NoCelebration),
            channels,
            view,
        };

        Ok((engine, handle))
    }

    /// Start the worker thread
    ///
    /// This consumes the engine and returns the worker's join handle.
    pub fn start(self) -> Result<JoinHandle<()>> {
        let runtime = Runtime::new()
            .map_err(|e| QuizError::ConfigError(format!("Runtime creation failed: {}", e)))?;

        let handle = thread::Builder::new()
            .name("quiz-engine".to_string())
            .spawn(move || {
                info!("Quiz engine started");
                let mut worker = Worker::new(self, runtime);
                worker.run();
                info!("Quiz engine stopped");
            })?;

        Ok(handle)
    }
}

struct Worker {
    machine: QuizMachine,
    capture: SpeechCapture,
    playback: SpeechPlayback,
    client: Arc<dyn QuizClient>,
    celebration: Arc<dyn Celebration>,
    config: EngineConfig,
    runtime: Runtime,
    command_rx: Receiver<EngineCommand>,
    capture_rx: Receiver<CaptureSignal>,
    completion_tx: Sender<Event>,
    completion_rx: Receiver<Event>,
    event_tx: Sender<EngineEvent>,
    view: Arc<RwLock<SessionView>>,
}

impl Worker {
    fn new(engine: QuizEngine, runtime: Runtime) -> Self {
        let QuizEngine {
            config,
            client,
            platform,
            synthesizer,
            celebration,
            channels,
            view,
        } = engine;

        let capture = SpeechCapture::new(
            platform,
            config.recognizer.clone(),
            channels.capture_tx.clone(),
        );
        let machine = QuizMachine::new(capture.is_supported()).with_celebration(config.celebration);
        let playback = SpeechPlayback::new(synthesizer, config.playback.clone());

        Self {
            machine,
            capture,
            playback,
            client,
            celebration,
            config,
            runtime,
            command_rx: channels.command_rx,
            capture_rx: channels.capture_rx,
            completion_tx: channels.completion_tx,
            completion_rx: channels.completion_rx,
            event_tx: channels.event_tx,
            view,
        }
    }

    fn run(&mut self) {
        let effects = self.machine.boot();
        self.apply(effects);
        self.publish();

        let command_rx = self.command_rx.clone();
        let capture_rx = self.capture_rx.clone();
        let completion_rx = self.completion_rx.clone();

        loop {
            select! {
                recv(command_rx) -> msg => match msg.map(EngineCommand::into_event) {
                    Ok(Some(event)) => self.dispatch(event),
                    Ok(None) => {
                        info!("Engine shutdown requested");
                        break;
                    }
                    Err(_) => {
                        debug!("Command channel disconnected");
                        break;
                    }
                },
                recv(capture_rx) -> msg => {
                    if let Ok(signal) = msg {
                        self.capture.observe(&signal);
                        self.dispatch(Event::Capture(signal));
                    }
                },
                recv(completion_rx) -> msg => {
                    if let Ok(event) = msg {
                        self.dispatch(event);
                    }
                },
            }
        }

        self.capture.stop_all();
        let _ = self.event_tx.try_send(EngineEvent::Shutdown);
    }

    /// Apply an event and any follow-up events its effects produce
    fn dispatch(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let effects = self.machine.handle(event);
            queue.extend(self.perform_all(effects));
        }
        self.publish();
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        let follow_ups = self.perform_all(effects);
        for event in follow_ups {
            self.dispatch(event);
        }
    }

    fn perform_all(&mut self, effects: Vec<Effect>) -> Vec<Event> {
        effects
            .into_iter()
            .filter_map(|effect| self.perform(effect))
            .collect()
    }

    /// Carry out one effect. Synchronous failures come back as events.
    fn perform(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::CheckAccess { request } => {
                let call = self.client.check_access();
                self.spawn_call(call, move |result| Event::AccessReceived { request, result });
                None
            }
            Effect::StartSession { request } => {
                let call = self.client.start_session(self.config.topic.clone());
                self.spawn_call(call, move |result| Event::SessionReceived { request, result });
                None
            }
            Effect::StartCapture { bout } => match self.capture.start(bout) {
                Ok(()) => None,
                Err(error) => Some(Event::Capture(CaptureSignal::Failed { bout, error })),
            },
            Effect::StopCapture { bout } => {
                self.capture.stop(bout);
                None
            }
            Effect::Submit {
                request,
                session_id,
                answers,
                started_at,
            } => {
                let elapsed = elapsed_seconds(started_at, Utc::now());
                let call = self.client.submit_answers(session_id, answers, elapsed);
                self.spawn_call(call, move |result| Event::SubmissionReceived { request, result });
                None
            }
            Effect::Celebrate => {
                self.celebration.fire(&self.config.celebration.burst);
                let _ = self.event_tx.try_send(EngineEvent::Celebrated);
                None
            }
            Effect::Speak(text) => {
                self.playback.speak(&text);
                None
            }
        }
    }

    /// Run a backend call with the configured timeout and report its outcome
    fn spawn_call<T, F>(&self, call: QuizFuture<T>, into_event: F)
    where
        T: Send + 'static,
        F: FnOnce(Result<T>) -> Event + Send + 'static,
    {
        let completion_tx = self.completion_tx.clone();
        let timeout = self.config.request_timeout();

        self.runtime.spawn(async move {
            let result = match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(QuizError::Timeout(timeout)),
            };
            if completion_tx.send(into_event(result)).is_err() {
                error!("Completion dropped, engine is gone");
            }
        });
    }

    fn publish(&self) {
        let view = self.machine.view();
        *self.view.write() = view.clone();
        if self.event_tx.try_send(EngineEvent::StateChanged(view)).is_err() {
            trace!("No room for state event, view is still updated");
        }
    }
}

/// Builder for creating an engine
pub struct EngineBuilder {
    config: EngineConfig,
    client: Arc<dyn QuizClient>,
    platform: Arc<dyn RecognitionPlatform>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    celebration: Option<Arc<dyn Celebration>>,
}

impl EngineBuilder {
    /// Create a new builder with default configuration
    pub fn new(client: Arc<dyn QuizClient>, platform: Arc<dyn RecognitionPlatform>) -> Self {
        Self {
            config: EngineConfig::default(),
            client,
            platform,
            synthesizer: None,
            celebration: None,
        }
    }

    /// Set the complete configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable prompt playback
    pub fn with_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.synthesizer = Some(synthesizer);
        self
    }

    pub fn with_celebration(mut self, celebration: Arc<dyn Celebration>) -> Self {
        self.celebration = Some(celebration);
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<(QuizEngine, EngineHandle)> {
        let (mut engine, handle) = QuizEngine::new(self.config, self.client, self.platform)?;
        engine.synthesizer = self.synthesizer;
        if let Some(celebration) = self.celebration {
            engine.celebration = celebration;
        }
        Ok((engine, handle))
    }
}
