//! Append-only error log for scrobble failures

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

/// One recorded scrobble failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error line
    pub message: String,

    /// Raw payload kept for diagnosis, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// When the error was recorded
    #[serde(rename = "recorded-at")]
    pub recorded_at: DateTime<Utc>,
}

/// Error log owned by the dispatcher
///
/// Entries are never removed; readers take snapshots.
#[derive(Debug, Default)]
pub struct ErrorSink {
    records: Vec<ErrorRecord>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error line, with an optional diagnostic payload
    pub fn record(&mut self, message: impl Into<String>, payload: Option<Value>) {
        let message = message.into();
        if message.is_empty() {
            debug!("ErrorSink::record: empty message, skipping");
            return;
        }

        error!(%message, "Scrobble request failed");
        if let Some(ref payload) = payload {
            debug!(%payload, "ErrorSink::record: diagnostic payload");
        }

        self.records.push(ErrorRecord {
            message,
            payload,
            recorded_at: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of every record, oldest first
    pub fn snapshot(&self) -> Vec<ErrorRecord> {
        self.records.clone()
    }

    /// Error lines only, oldest first
    #[cfg(test)]
    pub fn messages(&self) -> Vec<String> {
        self.records.iter().map(|r| r.message.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_appends_in_order() {
        let mut sink = ErrorSink::new();
        sink.record("first (1)", None);
        sink.record("second", Some(json!({"error": "bad"})));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.messages(), vec!["first (1)", "second"]);

        let records = sink.snapshot();
        assert!(records[0].payload.is_none());
        assert_eq!(records[1].payload, Some(json!({"error": "bad"})));
        assert!(records[0].recorded_at <= records[1].recorded_at);
    }

    #[test]
    fn test_empty_message_is_ignored() {
        let mut sink = ErrorSink::new();
        sink.record("", Some(json!({})));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_serialize_skips_missing_payload() {
        let mut sink = ErrorSink::new();
        sink.record("oops", None);

        let json = serde_json::to_value(&sink.snapshot()[0]).unwrap();
        assert_eq!(json["message"], "oops");
        assert!(json.get("payload").is_none());
        assert!(json.get("recorded-at").is_some());
    }
}
