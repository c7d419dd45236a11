//! Telemetry log record

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::protocol::messages::{ErrorCode, ImuSample, Message};

/// One line of the telemetry log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// Host receive time, RFC 3339 UTC
    pub timestamp: String,

    #[serde(flatten)]
    pub body: RecordBody,
}

/// Record content, tagged by `type`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordBody {
    Telemetry(ImuSample),
    Error { code: ErrorCode, raw: u8 },
}

impl TelemetryRecord {
    /// Build a record stamped with the current time
    ///
    /// Returns `None` for host commands, which are never logged.
    pub fn from_message(message: &Message) -> Option<Self> {
        let body = match *message {
            Message::Telemetry(sample) => RecordBody::Telemetry(sample),
            Message::Error(code) => RecordBody::Error {
                code,
                raw: code.code(),
            },
            Message::SetRate { .. } | Message::SetMotors { .. } => return None,
        };

        Some(Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            body,
        })
    }
}
