use crate::integration::{EngineCommand, EngineEvent};
use crate::session::Event;
use crate::speech::CaptureSignal;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

/// All channels connecting the engine worker to the outside world
pub struct EngineChannels {
    /// User actions from the view layer
    pub command_tx: Sender<EngineCommand>,
    pub command_rx: Receiver<EngineCommand>,
    /// Recognizer callbacks, tagged with their bout. Unbounded: platforms may
    /// call back on the worker thread itself, inside `start()` or `stop()`.
    pub capture_tx: Sender<CaptureSignal>,
    pub capture_rx: Receiver<CaptureSignal>,
    /// Backend completions, tagged with their request id
    pub completion_tx: Sender<Event>,
    pub completion_rx: Receiver<Event>,
    /// Notifications for the view layer
    pub event_tx: Sender<EngineEvent>,
    pub event_rx: Receiver<EngineEvent>,
}

impl EngineChannels {
    pub fn new(buffer_size: usize) -> Self {
        let (command_tx, command_rx) = bounded(buffer_size);
        let (capture_tx, capture_rx) = unbounded();
        let (completion_tx, completion_rx) = bounded(buffer_size);
        let (event_tx, event_rx) = bounded(buffer_size);

        Self {
            command_tx,
            command_rx,
            capture_tx,
            capture_rx,
            completion_tx,
            completion_rx,
            event_tx,
            event_rx,
        }
    }
}

impl Default for EngineChannels {
    fn default() -> Self {
        Self::new(100)
    }
}
