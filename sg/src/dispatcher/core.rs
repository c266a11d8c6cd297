//! Scrobble dispatcher task implementation
//!
//! One task owns the queue, the in-flight counter, the outstanding calls and
//! the error log. Submissions arrive as commands; issued calls run in their
//! own tasks and post completions back, so every state change happens here.

use std::collections::{HashMap, VecDeque};
use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::handle::ScrobblerHandle;
use super::messages::{CallCompletion, CallId, DispatchCommand, DispatcherState, DispatcherStats};
use crate::classifier::{Classification, classify};
use crate::config::DispatchConfig;
use crate::domain::{SCROBBLE_ENDPOINT, ScrobbleRequest};
use crate::sink::ErrorSink;
use crate::transport::{Transport, TransportError};

/// Maximum scrobble calls in flight at once
pub const MAX_CONCURRENT_SCROBBLES: usize = 3;

/// Queue, concurrency gate and drain loop for scrobble calls
pub struct ScrobbleDispatcher {
    config: DispatchConfig,
    transport: Arc<dyn Transport>,
    rx: mpsc::UnboundedReceiver<DispatchCommand>,
    completion_tx: mpsc::UnboundedSender<CallCompletion>,
    completion_rx: mpsc::UnboundedReceiver<CallCompletion>,

    /// Pending requests, submission order
    queue: VecDeque<ScrobbleRequest>,

    /// Issued but not yet classified
    in_flight: usize,

    /// Issued calls; the tasks own the transport futures
    outstanding: HashMap<CallId, AbortHandle>,

    next_call_id: u64,
    errors: ErrorSink,
    stats: DispatcherStats,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

impl ScrobbleDispatcher {
    /// Spawn a dispatcher task and return a handle to it
    ///
    /// The task stops on `shutdown` or once every handle is dropped.
    pub fn spawn(transport: Arc<dyn Transport>, config: DispatchConfig) -> ScrobblerHandle {
        debug!(?config, "ScrobbleDispatcher::spawn: called");
        let (dispatcher, handle) = Self::new(transport, config);
        tokio::spawn(dispatcher.run());
        info!("Scrobble dispatcher spawned");
        handle
    }

    pub(crate) fn new(transport: Arc<dyn Transport>, config: DispatchConfig) -> (Self, ScrobblerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            config,
            transport,
            rx,
            completion_tx,
            completion_rx,
            queue: VecDeque::new(),
            in_flight: 0,
            outstanding: HashMap::new(),
            next_call_id: 0,
            errors: ErrorSink::new(),
            stats: DispatcherStats::default(),
            idle_waiters: Vec::new(),
        };
        (dispatcher, ScrobblerHandle::new(tx))
    }

    /// Run the dispatcher task
    ///
    /// Commands take priority over completions so a shutdown is never
    /// delayed behind a burst of replies.
    async fn run(mut self) {
        info!("Scrobble dispatcher started");

        loop {
            tokio::select! {
                biased;

                command = self.rx.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).is_break() {
                            return;
                        }
                    }
                    None => {
                        debug!("run: all handles dropped");
                        break;
                    }
                },

                Some(completion) = self.completion_rx.recv() => self.handle_completion(completion),
            }
        }

        self.teardown();
    }

    /// Apply one command; `Break` once the dispatcher has torn down
    fn handle_command(&mut self, command: DispatchCommand) -> ControlFlow<()> {
        match command {
            DispatchCommand::Submit { request } => self.submit(request),
            DispatchCommand::GetState { reply } => {
                let _ = reply.send(self.state());
            }
            DispatchCommand::GetErrors { reply } => {
                let _ = reply.send(self.errors.snapshot());
            }
            DispatchCommand::WaitIdle { reply } => {
                if self.is_idle() {
                    let _ = reply.send(());
                } else {
                    self.idle_waiters.push(reply);
                }
            }
            DispatchCommand::Shutdown { reply } => {
                debug!("handle_command: shutdown requested");
                self.teardown();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Queue a request and start it if a slot is free
    pub(crate) fn submit(&mut self, request: ScrobbleRequest) {
        debug!(song_id = %request.song_id, submission = request.submission, time_ms = request.timestamp_ms, "submit: called");
        self.stats.total_submitted += 1;
        self.queue.push_back(request);

        if self.in_flight < MAX_CONCURRENT_SCROBBLES {
            self.drain();
        }

        let depth = self.queue.len();
        self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(depth);
        let warn_depth = self.config.queue_warn_depth;
        if warn_depth > 0 && depth > 0 && depth % warn_depth == 0 {
            warn!(depth, "Scrobble queue is growing faster than the server answers");
        }
    }

    /// Dispatch queued requests until the queue empties or the gate closes
    fn drain(&mut self) {
        while self.in_flight < MAX_CONCURRENT_SCROBBLES {
            let Some(request) = self.queue.pop_front() else {
                break;
            };
            self.dispatch(request);
        }
        debug!(in_flight = self.in_flight, queued = self.queue.len(), "drain: done");
        self.notify_if_idle();
    }

    fn dispatch(&mut self, request: ScrobbleRequest) {
        let call_id = CallId(self.next_call_id);
        self.next_call_id += 1;
        debug!(?call_id, song_id = %request.song_id, "dispatch: issuing call");

        let pending = self.transport.issue(SCROBBLE_ENDPOINT, request.params());
        let completion_tx = self.completion_tx.clone();
        let song_id = request.song_id;
        let task = tokio::spawn(async move {
            let result = pending.await;
            // Send fails only after teardown, when nobody should hear back
            let _ = completion_tx.send(CallCompletion {
                call_id,
                song_id,
                result,
            });
        });

        self.outstanding.insert(call_id, task.abort_handle());
        self.in_flight += 1;
        self.stats.total_dispatched += 1;
        self.stats.peak_in_flight = self.stats.peak_in_flight.max(self.in_flight);
    }

    /// Free the slot of a finished call, classify its reply, refill
    pub(crate) fn handle_completion(&mut self, completion: CallCompletion) {
        let CallCompletion {
            call_id,
            song_id,
            result,
        } = completion;
        debug!(?call_id, %song_id, "handle_completion: called");

        if self.outstanding.remove(&call_id).is_none() {
            debug!(?call_id, "handle_completion: unknown or late call, ignoring");
            return;
        }
        self.in_flight -= 1;
        self.stats.total_completed += 1;

        match result {
            Ok(body) => self.record_outcome(&song_id, classify(&body)),
            Err(error) => self.record_transport_failure(&song_id, error),
        }

        self.drain();
    }

    fn record_outcome(&mut self, song_id: &str, outcome: Classification) {
        match outcome.error_message() {
            Some(message) => {
                debug!(%song_id, %message, "record_outcome: error reply");
                self.errors.record(message, outcome.diagnostic().cloned());
                self.stats.total_errors += 1;
            }
            None => {
                debug!(%song_id, ?outcome, "record_outcome: success");
            }
        }
    }

    /// An error found in the failure's body wins over the generic message
    fn record_transport_failure(&mut self, song_id: &str, error: TransportError) {
        warn!(%song_id, error = %error, "Scrobble call failed");
        if let Some(body) = error.body() {
            let outcome = classify(body);
            if !outcome.is_success() {
                self.record_outcome(song_id, outcome);
                return;
            }
        }
        self.errors.record(error.to_string(), None);
        self.stats.total_errors += 1;
    }

    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight == 0
    }

    fn notify_if_idle(&mut self) {
        if !self.is_idle() || self.idle_waiters.is_empty() {
            return;
        }
        debug!(waiters = self.idle_waiters.len(), "notify_if_idle: waking waiters");
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    pub(crate) fn state(&self) -> DispatcherState {
        DispatcherState {
            queued: self.queue.len(),
            in_flight: self.in_flight,
            outstanding: self.outstanding.len(),
            stats: self.stats.clone(),
        }
    }

    /// Stop hearing completions, then abort every outstanding call
    fn teardown(&mut self) {
        info!(
            outstanding = self.outstanding.len(),
            queued = self.queue.len(),
            errors = self.errors.len(),
            "Scrobble dispatcher shutting down"
        );

        self.completion_rx.close();
        while let Ok(completion) = self.completion_rx.try_recv() {
            debug!(call_id = ?completion.call_id, "teardown: discarding completion");
        }
        for (call_id, handle) in self.outstanding.drain() {
            debug!(?call_id, "teardown: aborting call");
            handle.abort();
        }
        self.in_flight = 0;

        if !self.queue.is_empty() {
            warn!(dropped = self.queue.len(), "Dropping queued scrobbles on shutdown");
            self.queue.clear();
        }
        self.idle_waiters.clear();
    }
}

impl Drop for ScrobbleDispatcher {
    fn drop(&mut self) {
        // Covers the task being dropped without reaching teardown
        for (_, handle) in self.outstanding.drain() {
            handle.abort();
        }
    }
}
