use crate::prelude::*;

use std::sync::Mutex;

/// Somewhere decoded readings go, typically the MQTT publisher.
pub trait ReadingSink {
    fn publish(&self, reading: &Reading) -> Result<()>;
}

/// Somewhere flagged frames go, typically the unknown-frames file.
pub trait ArchiveSink {
    fn archive(&self, record: &ArchiveRecord) -> Result<()>;
}

/// Drops everything handed to it.
#[derive(Clone, Copy, Debug, Default)]
pub struct Discard;

impl ReadingSink for Discard {
    fn publish(&self, _reading: &Reading) -> Result<()> {
        Ok(())
    }
}

impl ArchiveSink for Discard {
    fn archive(&self, _record: &ArchiveRecord) -> Result<()> {
        Ok(())
    }
}

// Collector {{{
/// In-memory sink that remembers everything, for tests and one-shot decoding.
#[derive(Debug, Default)]
pub struct Collector {
    readings: Mutex<Vec<Reading>>,
    records: Mutex<Vec<ArchiveRecord>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.readings.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn records(&self) -> Vec<ArchiveRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn find(&self, topic: &str) -> Option<Reading> {
        self.readings().into_iter().find(|r| r.topic == topic)
    }
}

impl ReadingSink for Collector {
    fn publish(&self, reading: &Reading) -> Result<()> {
        self.readings
            .lock()
            .map_err(|_| anyhow!("sink.rs:Failed to lock readings"))?
            .push(reading.clone());
        Ok(())
    }
}

impl ArchiveSink for Collector {
    fn archive(&self, record: &ArchiveRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow!("sink.rs:Failed to lock records"))?
            .push(record.clone());
        Ok(())
    }
} // }}}
