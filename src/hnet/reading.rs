use crate::prelude::*;

use chrono::{DateTime, Local, SecondsFormat};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl std::fmt::Display for ReadingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ReadingValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for ReadingValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u8> for ReadingValue {
    fn from(v: u8) -> Self {
        Self::Integer(v.into())
    }
}

impl From<f64> for ReadingValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ReadingValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// Reading {{{
/// One decoded value, keyed by a topic suffix such as `indoor/water_setpoint`.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub topic: String,
    pub value: ReadingValue,
    pub unit: Option<&'static str>,
    pub timestamp: DateTime<Local>,
}

#[derive(Serialize)]
struct Payload<'a> {
    value: &'a ReadingValue,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
}

impl Reading {
    pub fn new(
        topic: impl Into<String>,
        value: impl Into<ReadingValue>,
        unit: Option<&'static str>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            topic: topic.into(),
            value: value.into(),
            unit,
            timestamp,
        }
    }

    /// JSON body published for this reading.
    pub fn to_payload(&self) -> Result<String> {
        let payload = Payload {
            value: &self.value,
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
            unit: self.unit,
        };

        Ok(serde_json::to_string(&payload)?)
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.unit {
            Some(unit) => write!(f, "{} = {} {}", self.topic, self.value, unit),
            None => write!(f, "{} = {}", self.topic, self.value),
        }
    }
} // }}}

// Archive {{{
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArchiveReason {
    InvalidChecksum,
    UnknownOpcode(u8),
}

impl std::fmt::Display for ArchiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChecksum => write!(f, "invalid_checksum"),
            Self::UnknownOpcode(op) => write!(f, "unknown_opcode_0x{:02X}", op),
        }
    }
}

/// A frame kept for offline analysis, with every reason it was flagged.
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveRecord {
    pub frame: Vec<u8>,
    pub reasons: Vec<ArchiveReason>,
    pub timestamp: DateTime<Local>,
}

impl ArchiveRecord {
    /// First recorded reason; a frame is only archived with at least one.
    pub fn reason(&self) -> Option<ArchiveReason> {
        self.reasons.first().copied()
    }

    pub fn has_reason(&self, reason: ArchiveReason) -> bool {
        self.reasons.contains(&reason)
    }

    pub fn hex(&self) -> String {
        Frame::new(&self.frame).hex()
    }
} // }}}
