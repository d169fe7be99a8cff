//! Log entry representation shipped to the supervisor.
//!
//! A `LogEntry` captures one log line together with the severity, the time it
//! was produced and the execution id of the invocation that produced it. The
//! serde field names match the supervisor's `/_ah/log` wire format.

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// Current local time as ISO-8601 with milliseconds and a timezone offset.
pub fn timestamp_now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "TextPayload")]
    payload: String,
    #[serde(rename = "Severity")]
    severity: Severity,
    #[serde(rename = "Time")]
    timestamp: String,
    #[serde(rename = "ExecutionID")]
    execution_id: String,
}

impl LogEntry {
    /// Construct an entry stamped with the current time.
    pub fn new(payload: impl Into<String>, severity: Severity, execution_id: &str) -> Self {
        Self::with_timestamp(payload, severity, timestamp_now(), execution_id)
    }

    /// Construct an entry with an explicit timestamp.
    pub fn with_timestamp(
        payload: impl Into<String>,
        severity: Severity,
        timestamp: impl Into<String>,
        execution_id: &str,
    ) -> Self {
        Self {
            payload: payload.into(),
            severity,
            timestamp: timestamp.into(),
            execution_id: execution_id.to_owned(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Byte length of the payload, the unit batch size limits are counted in.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Render the entry for direct console output.
    ///
    /// The format is `[S][timestamp][execution-id] payload`, the execution id
    /// bracket being omitted when empty. A newline is appended unless the
    /// payload already ends with one.
    pub fn console_line(&self) -> String {
        let mut line = String::with_capacity(self.payload.len() + self.timestamp.len() + 8);
        line.push('[');
        line.push(self.severity.initial());
        line.push_str("][");
        line.push_str(&self.timestamp);
        line.push(']');
        if !self.execution_id.is_empty() {
            line.push('[');
            line.push_str(&self.execution_id);
            line.push(']');
        }
        line.push(' ');
        line.push_str(&self.payload);
        if !self.payload.ends_with('\n') {
            line.push('\n');
        }
        line
    }
}
