//! Scrobble dispatcher
//!
//! Queues scrobble submissions, keeps at most three calls in flight, and
//! refills from the queue after every completion. The queue has no upper
//! bound: submitting faster than the server answers grows it without limit.

mod core;
mod handle;
mod messages;

pub use core::{MAX_CONCURRENT_SCROBBLES, ScrobbleDispatcher};
pub use handle::ScrobblerHandle;
pub use messages::{CallId, DispatchCommand, DispatchError, DispatcherState, DispatcherStats};
