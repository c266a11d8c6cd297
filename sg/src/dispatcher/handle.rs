//! ScrobblerHandle - client interface to the dispatcher task

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::messages::{DispatchCommand, DispatchError, DispatcherState};
use crate::domain::ScrobbleRequest;
use crate::sink::ErrorRecord;

/// Handle for submitting scrobbles to a running dispatcher
///
/// Cloneable. The dispatcher tears down once every clone is dropped.
#[derive(Clone)]
pub struct ScrobblerHandle {
    tx: mpsc::UnboundedSender<DispatchCommand>,
}

impl ScrobblerHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<DispatchCommand>) -> Self {
        Self { tx }
    }

    /// Queue a scrobble. Fire-and-forget: failures end up in the error log.
    pub fn submit(&self, song_id: impl Into<String>, submission: bool, start_time: DateTime<Utc>) {
        self.submit_request(ScrobbleRequest::new(song_id, submission, start_time));
    }

    /// Queue an already-built request
    pub fn submit_request(&self, request: ScrobbleRequest) {
        debug!(song_id = %request.song_id, "ScrobblerHandle::submit_request: called");
        if self.tx.send(DispatchCommand::Submit { request }).is_err() {
            warn!("Scrobble dropped: dispatcher already shut down");
        }
    }

    /// Current queue and in-flight counts
    pub async fn state(&self) -> Result<DispatcherState, DispatchError> {
        debug!("ScrobblerHandle::state: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(DispatchCommand::GetState { reply: reply_tx })?;
        reply_rx.await.map_err(|_| DispatchError::ChannelClosed)
    }

    /// Snapshot of the error log, oldest first
    pub async fn errors(&self) -> Result<Vec<ErrorRecord>, DispatchError> {
        debug!("ScrobblerHandle::errors: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(DispatchCommand::GetErrors { reply: reply_tx })?;
        reply_rx.await.map_err(|_| DispatchError::ChannelClosed)
    }

    /// Wait until the queue is empty and nothing is in flight
    pub async fn wait_idle(&self) -> Result<(), DispatchError> {
        debug!("ScrobblerHandle::wait_idle: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(DispatchCommand::WaitIdle { reply: reply_tx })?;
        reply_rx.await.map_err(|_| DispatchError::ChannelClosed)
    }

    /// Abort outstanding calls and stop the dispatcher
    ///
    /// Returns once teardown has finished; no completion is handled after.
    pub async fn shutdown(&self) -> Result<(), DispatchError> {
        debug!("ScrobblerHandle::shutdown: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(DispatchCommand::Shutdown { reply: reply_tx })?;
        reply_rx.await.map_err(|_| DispatchError::ChannelClosed)
    }

    /// True once the dispatcher task has stopped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, command: DispatchCommand) -> Result<(), DispatchError> {
        self.tx.send(command).map_err(|_| DispatchError::ChannelClosed)
    }
}
