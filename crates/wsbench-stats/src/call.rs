//! Call timing records and their correlation key

use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp or sequence value that has not been recorded
pub const UNSET: i64 = -1;

/// Composite key identifying one logical call: `protocol-method-sequence`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallKey(String);

impl CallKey {
    /// Build the key from its parts
    pub fn new(protocol: &str, method: &str, sequence: i64) -> Self {
        Self(format!("{}-{}-{}", protocol, method, sequence))
    }

    /// Key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CallKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Timing and status of one measured call.
///
/// Client timestamps are recorded by the benchmark client, server timestamps
/// by the request handler. Timestamps are nanoseconds, [`UNSET`] when not
/// recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    /// Request sequence number within the test suite
    #[serde(rename = "seq", default = "unset")]
    pub sequence: i64,
    /// Wire protocol under test
    pub protocol: String,
    /// Invoked service method
    pub method: String,
    /// Client send time
    #[serde(default = "unset")]
    pub client_start: i64,
    /// Server receive time
    #[serde(default = "unset")]
    pub server_start: i64,
    /// Server response time
    #[serde(default = "unset")]
    pub server_end: i64,
    /// Client receive time
    #[serde(default = "unset")]
    pub client_end: i64,
    /// Whether the call succeeded
    #[serde(default)]
    pub ok: bool,
    /// Failure description
    #[serde(rename = "errMsg", default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

fn unset() -> i64 {
    UNSET
}

impl CallRecord {
    /// Create a record with no timestamps
    pub fn new(protocol: impl Into<String>, method: impl Into<String>, sequence: i64) -> Self {
        Self {
            sequence,
            protocol: protocol.into(),
            method: method.into(),
            client_start: UNSET,
            server_start: UNSET,
            server_end: UNSET,
            client_end: UNSET,
            ok: false,
            error_message: None,
        }
    }

    /// Set the server-observed timestamps
    pub fn with_server_times(mut self, start: i64, end: i64) -> Self {
        self.server_start = start;
        self.server_end = end;
        self
    }

    /// Set the client-observed timestamps
    pub fn with_client_times(mut self, start: i64, end: i64) -> Self {
        self.client_start = start;
        self.client_end = end;
        self
    }

    /// Mark as succeeded
    pub fn succeeded(mut self) -> Self {
        self.ok = true;
        self.error_message = None;
        self
    }

    /// Mark as failed
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.ok = false;
        self.error_message = Some(message.into());
        self
    }

    /// Correlation key
    pub fn key(&self) -> CallKey {
        CallKey::new(&self.protocol, &self.method, self.sequence)
    }

    /// Server processing time, when both server timestamps are recorded
    pub fn server_duration(&self) -> Option<i64> {
        duration(self.server_start, self.server_end)
    }

    /// Round trip seen by the client, when both client timestamps are recorded
    pub fn client_duration(&self) -> Option<i64> {
        duration(self.client_start, self.client_end)
    }

    /// Whether both server timestamps are recorded
    pub fn has_server_times(&self) -> bool {
        self.server_start != UNSET && self.server_end != UNSET
    }
}

fn duration(start: i64, end: i64) -> Option<i64> {
    (start != UNSET && end != UNSET).then(|| end - start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let call = CallRecord::new("rest", "list", 42);
        assert_eq!(call.key().as_str(), "rest-list-42");
        assert_eq!(call.key(), CallKey::new("rest", "list", 42));
    }

    #[test]
    fn test_new_record_is_unset() {
        let call = CallRecord::new("thrift", "get", 1);
        assert_eq!(call.client_start, UNSET);
        assert_eq!(call.server_end, UNSET);
        assert!(!call.ok);
        assert!(call.server_duration().is_none());
        assert!(!call.has_server_times());
    }

    #[test]
    fn test_durations() {
        let call = CallRecord::new("rest", "create", 3)
            .with_client_times(100, 900)
            .with_server_times(300, 700);
        assert_eq!(call.client_duration(), Some(800));
        assert_eq!(call.server_duration(), Some(400));
    }

    #[test]
    fn test_json_shape() {
        let call: CallRecord = serde_json::from_str(
            r#"{"seq": 7, "protocol": "rest", "method": "list", "clientStart": 10, "clientEnd": 20, "ok": true}"#,
        )
        .unwrap();
        assert_eq!(call.sequence, 7);
        assert_eq!(call.client_start, 10);
        assert_eq!(call.server_start, UNSET);
        assert!(call.error_message.is_none());

        let failed = CallRecord::new("rest", "list", 1).failed("boom");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["errMsg"], "boom");
    }
}
