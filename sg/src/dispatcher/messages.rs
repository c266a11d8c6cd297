//! Message and state types for the scrobble dispatcher

use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::ScrobbleRequest;
use crate::sink::ErrorRecord;
use crate::transport::TransportError;

/// Errors returned by dispatcher handle operations
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Scrobble dispatcher channel closed")]
    ChannelClosed,
}

/// Identifies one issued call between issue and completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub(crate) u64);

/// Requests sent to the dispatcher task
#[derive(Debug)]
pub enum DispatchCommand {
    /// Queue a scrobble for dispatch
    Submit { request: ScrobbleRequest },

    /// Get queue and in-flight counts
    GetState { reply: oneshot::Sender<DispatcherState> },

    /// Get a snapshot of the error log
    GetErrors { reply: oneshot::Sender<Vec<ErrorRecord>> },

    /// Reply once the queue is empty and nothing is in flight
    WaitIdle { reply: oneshot::Sender<()> },

    /// Abort outstanding calls and stop
    Shutdown { reply: oneshot::Sender<()> },
}

/// Completion posted back by an issued call
#[derive(Debug)]
pub(crate) struct CallCompletion {
    pub call_id: CallId,
    pub song_id: String,
    pub result: Result<Vec<u8>, TransportError>,
}

/// Statistics for the dispatcher
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherStats {
    pub total_submitted: u64,
    pub total_dispatched: u64,
    pub total_completed: u64,
    pub total_errors: u64,
    pub peak_in_flight: usize,
    pub peak_queue_depth: usize,
}

/// Point-in-time view of the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatcherState {
    /// Requests waiting for a slot
    pub queued: usize,

    /// Requests issued but not yet classified
    pub in_flight: usize,

    /// Calls tracked for abort on teardown
    pub outstanding: usize,

    pub stats: DispatcherStats,
}

impl DispatcherState {
    /// Nothing queued and nothing in flight
    pub fn is_idle(&self) -> bool {
        self.queued == 0 && self.in_flight == 0
    }
}
