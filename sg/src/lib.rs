//! Scrobblegate - bounded-concurrency scrobble dispatcher
//!
//! Submits play events ("scrobbles") to a Subsonic-compatible server. At most
//! three calls are in flight at once; everything else waits in a FIFO queue
//! that refills the free slots as replies arrive.
//!
//! # Modules
//!
//! - [`dispatcher`] - Queue, concurrency gate and drain loop
//! - [`classifier`] - Reply body classification
//! - [`sink`] - Error log
//! - [`transport`] - Transport trait and Subsonic HTTP implementation
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod classifier;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod sink;
pub mod transport;

// Re-export commonly used types
pub use classifier::{Classification, MalformedReason, classify};
pub use config::{AuthMethod, Config, DispatchConfig, ServerConfig};
pub use dispatcher::{
    DispatchError, DispatcherState, DispatcherStats, MAX_CONCURRENT_SCROBBLES, ScrobbleDispatcher, ScrobblerHandle,
};
pub use domain::{SCROBBLE_ENDPOINT, ScrobbleRequest};
pub use sink::{ErrorRecord, ErrorSink};
pub use transport::{PendingCall, SubsonicTransport, Transport, TransportError};
