use crate::prelude::*;
use crate::hnet::frame::{MIN_FRAME_LEN, MIN_PAYLOAD_LEN};
use crate::hnet::sensor::SensorExtractor;
use crate::hnet::status::StatusExtractor;
use crate::hnet::system_info::SystemInfoExtractor;

use chrono::{DateTime, Local};
use enum_dispatch::*;
use std::sync::Arc;

pub const CELSIUS: &str = "°C";

// {{{ DecodeIssue
/// Something wrong with a frame. Never fatal; recorded on `Decoded` and logged.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DecodeIssue {
    #[error("frame too short ({len} bytes, need {min})")]
    TooShort { len: usize, min: usize },
    #[error("invalid checksum: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumInvalid { expected: u8, actual: u8 },
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),
    #[error("{opcode:?} frame too short ({len} bytes, need {min})")]
    UnderLengthForOpcode { opcode: Opcode, len: usize, min: usize },
}
// }}}

/// Everything one decode pass produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Decoded {
    pub readings: Vec<Reading>,
    pub archive: Option<ArchiveRecord>,
    pub issues: Vec<DecodeIssue>,
    pub acknowledgement: bool,
}

impl Decoded {
    pub fn has_issue(&self, f: impl Fn(&DecodeIssue) -> bool) -> bool {
        self.issues.iter().any(f)
    }

    pub fn find(&self, topic: &str) -> Option<&Reading> {
        self.readings.iter().find(|r| r.topic == topic)
    }
}

// {{{ Emitter
/// Collects readings for one frame, all stamped with the same instant.
pub struct Emitter {
    timestamp: DateTime<Local>,
    readings: Vec<Reading>,
}

impl Emitter {
    pub fn new(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            readings: Vec::new(),
        }
    }

    pub fn emit(
        &mut self,
        topic: impl Into<String>,
        value: impl Into<ReadingValue>,
        unit: Option<&'static str>,
    ) {
        let reading = Reading::new(topic, value, unit, self.timestamp);
        debug!("{}", reading);
        self.readings.push(reading);
    }

    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }
} // }}}

// {{{ Extractor
#[enum_dispatch]
pub trait Extract {
    fn opcode(&self) -> Opcode;

    /// Called only once the frame is at least `opcode().min_len()` bytes.
    fn extract(&self, frame: &Frame, tables: &Tables, out: &mut Emitter);
}

#[enum_dispatch(Extract)]
#[derive(Clone, Copy, Debug)]
pub enum Extractor {
    StatusExtractor,
    SensorExtractor,
    SystemInfoExtractor,
}

impl From<Opcode> for Extractor {
    fn from(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Status => StatusExtractor.into(),
            Opcode::Sensor => SensorExtractor.into(),
            Opcode::SystemInfo => SystemInfoExtractor.into(),
        }
    }
} // }}}

// {{{ Decoder
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    tables: Arc<Tables>,
}

impl Decoder {
    pub fn new(tables: Arc<Tables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Decode `bytes` and hand the results to the sinks. Sink failures are logged, not returned.
    pub fn process(
        &self,
        bytes: &[u8],
        readings: &dyn ReadingSink,
        archive: &dyn ArchiveSink,
    ) -> Decoded {
        let decoded = self.decode(bytes);

        for reading in &decoded.readings {
            if let Err(err) = readings.publish(reading) {
                warn!("failed to publish {}: {}", reading.topic, err);
            }
        }

        if let Some(record) = &decoded.archive {
            if let Err(err) = archive.archive(record) {
                warn!("failed to archive frame: {}", err);
            }
        }

        decoded
    }

    pub fn decode(&self, bytes: &[u8]) -> Decoded {
        let frame = Frame::new(bytes);
        let timestamp = Local::now();
        let mut decoded = Decoded::default();

        let &[src, ctrl, declared_len, _, ..] = bytes else {
            warn!("frame too short ({} bytes)", bytes.len());
            decoded.issues.push(DecodeIssue::TooShort {
                len: bytes.len(),
                min: MIN_FRAME_LEN,
            });
            return decoded;
        };

        info!(
            "H-NET frame - Src: 0x{:02X}, Ctrl: 0x{:02X}, Len: {}",
            src, ctrl, declared_len
        );

        let mut reasons = Vec::new();
        if !frame.checksum_valid() {
            let issue = DecodeIssue::ChecksumInvalid {
                expected: Frame::compute_checksum(bytes),
                actual: frame.checksum().unwrap_or_default(),
            };
            warn!("{}", issue);
            decoded.issues.push(issue);
            reasons.push(ArchiveReason::InvalidChecksum);
        }

        if frame.is_ack() {
            debug!("ACK frame from 0x{:02X}", src);
            decoded.acknowledgement = true;
            return decoded;
        }

        let Some(opcode) = frame.opcode() else {
            warn!("frame too short for payload ({} bytes)", bytes.len());
            decoded.issues.push(DecodeIssue::TooShort {
                len: bytes.len(),
                min: MIN_PAYLOAD_LEN,
            });
            return decoded;
        };

        // opcode 0 carries nothing we know how to read, and no device status either
        if opcode != 0 {
            info!("Opcode: 0x{:02X}", opcode);
            let mut out = Emitter::new(timestamp);

            match self.tables.opcode(opcode) {
                Some(known) => {
                    let extractor = Extractor::from(known);
                    if frame.len() < known.min_len() {
                        let issue = DecodeIssue::UnderLengthForOpcode {
                            opcode: known,
                            len: frame.len(),
                            min: known.min_len(),
                        };
                        warn!("{}", issue);
                        decoded.issues.push(issue);
                    } else {
                        extractor.extract(&frame, &self.tables, &mut out);
                    }
                }
                None => {
                    let issue = DecodeIssue::UnknownOpcode(opcode);
                    warn!("{}", issue);
                    decoded.issues.push(issue);
                    reasons.push(ArchiveReason::UnknownOpcode(opcode));
                }
            }

            let device = self.tables.device(src);
            out.emit(format!("{}/status", device), "online", None);
            decoded.readings = out.into_readings();
        }

        if !reasons.is_empty() {
            decoded.archive = Some(ArchiveRecord {
                frame: bytes.to_vec(),
                reasons,
                timestamp,
            });
        }

        decoded
    }
} // }}}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(mut bytes: Vec<u8>) -> Vec<u8> {
        bytes.push(0);
        let last = bytes.len() - 1;
        bytes[last] = Frame::compute_checksum(&bytes);
        bytes
    }

    #[test]
    fn too_short_frames_produce_nothing() {
        let decoder = Decoder::default();
        for bytes in [vec![], vec![0x21], vec![0x21, 0x00, 0x00]] {
            let decoded = decoder.decode(&bytes);
            assert!(decoded.readings.is_empty());
            assert!(decoded.archive.is_none());
            assert!(decoded.has_issue(|i| matches!(i, DecodeIssue::TooShort { min: 4, .. })));
        }
    }

    #[test]
    fn frames_without_opcode_stop_early() {
        let decoder = Decoder::default();
        // bad checksum too, but nothing gets archived without an opcode
        let decoded = decoder.decode(&[0x21, 0x00, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0x42]);
        assert!(decoded.readings.is_empty());
        assert!(decoded.archive.is_none());
        assert!(decoded.has_issue(|i| matches!(i, DecodeIssue::TooShort { min: 10, .. })));
        assert!(decoded.has_issue(|i| matches!(i, DecodeIssue::ChecksumInvalid { .. })));
    }

    #[test]
    fn zero_opcode_emits_no_status() {
        let decoder = Decoder::default();
        let decoded = decoder.decode(&framed(vec![0x21, 0x00, 0x0a, 0x01, 0, 0, 0, 0, 0, 0x00]));
        assert!(decoded.readings.is_empty());
        assert!(decoded.archive.is_none());
        assert!(decoded.issues.is_empty());
    }

    #[test]
    fn under_length_frame_only_reports_status() {
        let decoder = Decoder::default();
        let mut bytes = vec![0u8; 28];
        bytes[0] = 0x12;
        bytes[9] = 0xb8;
        bytes[21] = 50;
        let decoded = decoder.decode(&framed(bytes));
        assert_eq!(decoded.readings.len(), 1);
        assert_eq!(decoded.readings[0].topic, "outdoor/status");
        assert!(decoded.archive.is_none());
        assert!(decoded.has_issue(|i| matches!(
            i,
            DecodeIssue::UnderLengthForOpcode { opcode: Opcode::SystemInfo, len: 29, min: 30 }
        )));
    }

    #[test]
    fn readings_share_a_timestamp() {
        let decoder = Decoder::default();
        let mut bytes = vec![0u8; 75];
        bytes[0] = 0x12;
        bytes[9] = 0xb6;
        bytes[11] = 30;
        bytes[12] = 35;
        let decoded = decoder.decode(&framed(bytes));
        let first = decoded.readings[0].timestamp;
        assert!(decoded.readings.iter().all(|r| r.timestamp == first));
    }

    #[test]
    fn extractor_for_opcode() {
        assert_eq!(Extractor::from(Opcode::Status).opcode(), Opcode::Status);
        assert_eq!(Extractor::from(Opcode::Sensor).opcode(), Opcode::Sensor);
        assert_eq!(Extractor::from(Opcode::SystemInfo).opcode(), Opcode::SystemInfo);
    }
}
