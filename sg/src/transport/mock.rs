//! Scripted transport for unit tests
//!
//! Records every issued call and leaves it pending until the test completes
//! it by index. Calls dropped while pending are counted as aborted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::debug;

use super::{PendingCall, Transport, TransportError};

type Reply = Result<Vec<u8>, TransportError>;

/// A call as the transport saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCall {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl IssuedCall {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct ScriptState {
    calls: Vec<IssuedCall>,
    replies: Vec<Option<oneshot::Sender<Reply>>>,
}

/// Transport whose calls resolve only when the test says so
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
    aborted: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every issued call, in issue order
    pub fn calls(&self) -> Vec<IssuedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    /// Number of calls dropped before they were completed
    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Resolve call `index` with `body`; false if unknown or already resolved
    pub fn complete(&self, index: usize, body: &str) -> bool {
        self.resolve(index, Ok(body.as_bytes().to_vec()))
    }

    /// Resolve call `index` with a transport failure
    pub fn fail(&self, index: usize, error: TransportError) -> bool {
        self.resolve(index, Err(error))
    }

    fn resolve(&self, index: usize, reply: Reply) -> bool {
        debug!(index, "ScriptedTransport::resolve: called");
        let sender = {
            let mut state = self.state.lock().unwrap();
            state.replies.get_mut(index).and_then(Option::take)
        };
        match sender {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }
}

/// Counts a pending call as aborted if dropped before it resolves
struct AbortGuard {
    counter: Arc<AtomicUsize>,
    armed: bool,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if self.armed {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Transport for ScriptedTransport {
    fn issue(&self, endpoint: &str, params: Vec<(String, String)>) -> PendingCall {
        debug!(%endpoint, "ScriptedTransport::issue: called");
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push(IssuedCall {
                endpoint: endpoint.to_string(),
                params,
            });
            state.replies.push(Some(tx));
        }

        let guard = AbortGuard {
            counter: self.aborted.clone(),
            armed: true,
        };
        async move {
            let mut guard = guard;
            let reply = rx
                .await
                .unwrap_or_else(|_| Err(TransportError::Config("scripted reply dropped".to_string())));
            guard.armed = false;
            reply
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_resolves_pending_call() {
        let transport = ScriptedTransport::new();
        let call = transport.issue("scrobble", vec![("id".to_string(), "1".to_string())]);

        assert_eq!(transport.calls()[0].param("id"), Some("1"));
        assert!(transport.complete(0, "ok"));
        assert!(!transport.complete(0, "again"));

        assert_eq!(call.await.unwrap(), b"ok".to_vec());
        assert_eq!(transport.aborted(), 0);
    }

    #[tokio::test]
    async fn test_dropped_call_counts_as_aborted() {
        let transport = ScriptedTransport::new();
        let call = transport.issue("scrobble", Vec::new());
        assert_eq!(transport.aborted(), 0);
        drop(call);

        assert_eq!(transport.aborted(), 1);
    }
}
