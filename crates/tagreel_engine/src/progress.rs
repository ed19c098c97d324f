use std::sync::mpsc;

use tagreel_core::ProgressEvent;

use crate::EngineEvent;

/// Where a running job reports progress.
///
/// Emission order is the contract: implementations must preserve it and
/// must not block the pipeline.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that forwards events over the engine's channel. Send failures are
/// ignored; a dropped receiver just means nobody is listening anymore.
pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(EngineEvent::Progress(event));
    }
}
