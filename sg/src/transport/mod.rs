//! Transport capability for issuing protocol calls
//!
//! The dispatcher only sees [`Transport`]: it issues a call and gets back a
//! future that resolves to the raw reply body. Dropping that future aborts
//! the call and hands any cleanup to the transport.

use futures::future::BoxFuture;

mod error;
#[cfg(test)]
pub mod mock;
mod subsonic;

pub use error::TransportError;
pub use subsonic::SubsonicTransport;

/// An issued call that has not completed yet
pub type PendingCall = BoxFuture<'static, Result<Vec<u8>, TransportError>>;

/// Issues asynchronous calls against a protocol endpoint
///
/// `issue` must not block. Calls are considered issued in the order `issue`
/// is invoked; completion order is up to the remote side.
pub trait Transport: Send + Sync {
    /// Issue a call to `endpoint` with ordered `(key, value)` parameters
    fn issue(&self, endpoint: &str, params: Vec<(String, String)>) -> PendingCall;
}
