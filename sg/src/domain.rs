//! Scrobble request type
//!
//! A `ScrobbleRequest` is created on submission and never mutated. It lives in
//! the dispatcher queue until it is issued, then is dropped once its reply has
//! been classified.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Protocol endpoint used for every scrobble call
pub const SCROBBLE_ENDPOINT: &str = "scrobble";

/// A single play event waiting to be reported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrobbleRequest {
    /// Server-side song identifier
    #[serde(rename = "song-id")]
    pub song_id: String,

    /// `true` for a completed play, `false` for a "now playing" notification
    pub submission: bool,

    /// Play start time in milliseconds since the Unix epoch
    #[serde(rename = "timestamp-ms")]
    pub timestamp_ms: i64,
}

impl ScrobbleRequest {
    /// Create a request from a play start time
    pub fn new(song_id: impl Into<String>, submission: bool, start_time: DateTime<Utc>) -> Self {
        let song_id = song_id.into();
        debug!(%song_id, submission, %start_time, "ScrobbleRequest::new: called");
        Self {
            song_id,
            submission,
            timestamp_ms: start_time.timestamp_millis(),
        }
    }

    /// Protocol parameters for this request, in wire order
    pub fn params(&self) -> Vec<(String, String)> {
        vec![
            ("id".to_string(), self.song_id.clone()),
            ("submission".to_string(), self.submission.to_string()),
            ("time".to_string(), self.timestamp_ms.to_string()),
        ]
    }
}
