use crate::prelude::*;

use chrono::SecondsFormat;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
pub enum ChannelData {
    Record(ArchiveRecord),
    Shutdown,
}

pub type Sender = broadcast::Sender<ChannelData>;

/// `ArchiveSink` that hands records to the archive task over `channels.to_archive`.
#[derive(Clone, Debug)]
pub struct ArchiveChannel {
    sender: Sender,
}

impl ArchiveChannel {
    pub fn new(sender: Sender) -> Self {
        Self { sender }
    }
}

impl ArchiveSink for ArchiveChannel {
    fn archive(&self, record: &ArchiveRecord) -> Result<()> {
        if self.sender.send(ChannelData::Record(record.clone())).is_err() {
            bail!("send(to_archive) failed - channel closed?");
        }
        Ok(())
    }
}

/// Append-only log of frames that failed the checksum or had an unknown opcode.
#[derive(Debug, Clone)]
pub struct UnknownFrameArchive {
    file: Arc<Mutex<std::fs::File>>,
    path: String,
    frames_written: Arc<Mutex<u64>>,
}

impl UnknownFrameArchive {
    pub fn new(path: &str) -> Result<Self> {
        info!("Opening unknown frames file at {}", path);

        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to open unknown frames file {}: {}", path, e);
                return Err(crate::file_error_with_source!(e, "opening {}", path));
            }
        };

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            path: path.to_string(),
            frames_written: Arc::new(Mutex::new(0)),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Write one line per reason: `<timestamp> - <reason>: <HEX>`.
    pub fn write_record(&self, record: &ArchiveRecord) -> Result<()> {
        let timestamp = record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false);
        let hex = record.hex();

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("archive.rs:Failed to lock unknown frames file"))?;
        for reason in &record.reasons {
            writeln!(file, "{} - {}: {}", timestamp, reason, hex)?;
        }
        if let Err(e) = file.flush() {
            error!("Failed to flush unknown frames file {}: {}", self.path, e);
            return Err(e.into());
        }

        let mut frames_written = self
            .frames_written
            .lock()
            .map_err(|_| anyhow!("archive.rs:Failed to lock frames counter"))?;
        *frames_written += 1;
        debug!("archived frame #{} to {}", *frames_written, self.path);

        Ok(())
    }

    pub async fn start(&self, channels: Channels) -> Result<()> {
        let mut receiver = channels.to_archive.subscribe();

        debug!("unknown frame archive starting");

        loop {
            match receiver.recv().await {
                Ok(ChannelData::Record(record)) => {
                    if let Err(e) = self.write_record(&record) {
                        error!("failed to archive frame: {}", e);
                    }
                }
                Ok(ChannelData::Shutdown) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("unknown frame archive lagged, {} frames dropped", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("unknown frame archive loop exiting");
        Ok(())
    }

    pub fn stop(&self, channels: &Channels) {
        let _ = channels.to_archive.send(ChannelData::Shutdown);
    }
}

impl ArchiveSink for UnknownFrameArchive {
    fn archive(&self, record: &ArchiveRecord) -> Result<()> {
        self.write_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use tempfile::NamedTempFile;

    fn record(reasons: Vec<ArchiveReason>) -> ArchiveRecord {
        ArchiveRecord {
            frame: vec![0x21, 0x00, 0x0a, 0xff],
            reasons,
            timestamp: Local.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap(),
        }
    }

    #[test]
    fn test_write_invalid_checksum() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let archive = UnknownFrameArchive::new(temp_file.path().to_str().unwrap())?;

        archive.archive(&record(vec![ArchiveReason::InvalidChecksum]))?;

        let contents = std::fs::read_to_string(temp_file.path())?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("2024-03-01T08:15:00.000"));
        assert!(lines[0].ends_with(" - invalid_checksum: 21 00 0A FF"));

        Ok(())
    }

    #[test]
    fn test_one_line_per_reason() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let archive = UnknownFrameArchive::new(temp_file.path().to_str().unwrap())?;

        archive.write_record(&record(vec![
            ArchiveReason::InvalidChecksum,
            ArchiveReason::UnknownOpcode(0xff),
        ]))?;
        archive.write_record(&record(vec![ArchiveReason::UnknownOpcode(0x42)]))?;

        let contents = std::fs::read_to_string(temp_file.path())?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("invalid_checksum"));
        assert!(lines[1].contains("unknown_opcode_0xFF"));
        assert!(lines[2].contains("unknown_opcode_0x42"));

        Ok(())
    }

    #[test]
    fn test_creates_parent_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("logs/nested/unknown_frames.log");
        let archive = UnknownFrameArchive::new(path.to_str().unwrap())?;
        archive.archive(&record(vec![ArchiveReason::InvalidChecksum]))?;
        assert!(path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_archive_task_drains_channel() -> Result<()> {
        let temp_file = NamedTempFile::new()?;
        let archive = UnknownFrameArchive::new(temp_file.path().to_str().unwrap())?;
        let channels = Channels::new();

        let task = {
            let archive = archive.clone();
            let channels = channels.clone();
            tokio::spawn(async move { archive.start(channels).await })
        };

        // wait for the task to subscribe
        while channels.to_archive.receiver_count() == 0 {
            tokio::task::yield_now().await;
        }

        ArchiveChannel::new(channels.to_archive.clone())
            .archive(&record(vec![ArchiveReason::UnknownOpcode(0xff)]))?;
        archive.stop(&channels);
        task.await??;

        let contents = std::fs::read_to_string(temp_file.path())?;
        assert!(contents.contains("unknown_opcode_0xFF: 21 00 0A FF"));
        Ok(())
    }
}
