use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::UnboundedSender;

use crate::EngineEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Forwards events into the controller's single-consumer queue.
pub struct ChannelEventSink {
    tx: UnboundedSender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: UnboundedSender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sink wrapper that stops dispatching once closed.
///
/// Emission happens under the lock, so no event escapes after `close` returns.
pub(crate) struct EventGate {
    sink: Mutex<Option<Arc<dyn EventSink>>>,
}

impl EventGate {
    pub(crate) fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink: Mutex::new(Some(sink)),
        }
    }

    pub(crate) fn emit(&self, event: EngineEvent) {
        let guard = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sink) = guard.as_ref() {
            sink.emit(event);
        }
    }

    pub(crate) fn close(&self) {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
