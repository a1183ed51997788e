use std::sync::{mpsc, Arc, Mutex};

use crate::{JobId, JobStatus};

/// State-change notification toward UI collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    StatusChanged { job_id: JobId, status: JobStatus },
}

/// Receives job events. Implementations must not block; the engine emits
/// from async context.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: JobEvent);
}

/// Sink that forwards events onto an mpsc channel, for UI loops that drain
/// events on their own tick.
pub struct ChannelEventSink {
    tx: mpsc::Sender<JobEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<JobEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: JobEvent) {
        let _ = self.tx.send(event);
    }
}

pub type SubscriptionId = u64;

/// Fan-out registry of event sinks with explicit subscribe/unsubscribe.
///
/// Cloning shares the registry; the job client and its handles hold clones.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    inner: Arc<Mutex<DispatcherInner>>,
}

#[derive(Default)]
struct DispatcherInner {
    next_id: SubscriptionId,
    sinks: Vec<(SubscriptionId, Arc<dyn EventSink>)>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, sink: Arc<dyn EventSink>) -> SubscriptionId {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_id;
        inner.next_id += 1;
        inner.sinks.push((id, sink));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let before = inner.sinks.len();
        inner.sinks.retain(|(sink_id, _)| *sink_id != id);
        inner.sinks.len() != before
    }

    pub(crate) fn emit(&self, event: JobEvent) {
        // Snapshot under the lock, emit outside it.
        let sinks: Vec<Arc<dyn EventSink>> = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.sinks.iter().map(|(_, sink)| sink.clone()).collect()
        };
        for sink in sinks {
            sink.emit(event.clone());
        }
    }
}
