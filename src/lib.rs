pub mod archive;        // Unknown-frame archive file
pub mod channels;       // Inter-component communication channels
pub mod config;         // Configuration management
pub mod coordinator;    // Frame decoding loop and statistics
pub mod error;          // Error helpers
pub mod hnet;           // H-NET frame decoding core
pub mod home_assistant; // Home Assistant discovery
pub mod mqtt;           // MQTT client and messaging
pub mod options;        // Command line options parsing
pub mod prelude;        // Common imports and types

// Get the package version from Cargo.toml
pub const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;

use crate::archive::UnknownFrameArchive;
use crate::coordinator::{Coordinator, FrameStats};
use crate::hnet::payload;
use crate::hnet::sink::Collector;
use crate::mqtt::Mqtt;
use std::sync::{Arc, Mutex};

/// Initialise `env_logger` with our line format. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();
}

/// Everything `app` started, so it can be stopped in order.
#[derive(Clone)]
pub struct Components {
    pub coordinator: Arc<Coordinator>,
    pub mqtt: Arc<Mqtt>,
    pub archive: Option<Arc<UnknownFrameArchive>>,
    pub channels: Channels,
}

impl Components {
    /// Coordinator first so no new readings are queued, then MQTT, then the archive.
    pub async fn stop(&self) {
        info!("Stopping all components...");

        self.coordinator.stop();
        let _ = self.mqtt.stop().await;
        if let Some(archive) = &self.archive {
            archive.stop(&self.channels);
        }

        info!("Shutdown complete");
    }

    pub fn stats(&self) -> Arc<Mutex<FrameStats>> {
        self.coordinator.shared_stats.clone()
    }
}

pub async fn app(mut shutdown_rx: broadcast::Receiver<()>, config: ConfigWrapper) -> Result<()> {
    info!("Initializing channels...");
    let channels = Channels::new();

    info!("Initializing components...");

    info!("  Creating Coordinator...");
    let coordinator = Arc::new(Coordinator::new(config.clone(), channels.clone()));
    let coordinator_clone = coordinator.clone();
    let coordinator_handle = tokio::spawn(async move {
        if let Err(e) = coordinator_clone.start().await {
            error!("Coordinator task failed: {}", e);
        }
    });

    let archive = if config.debug().save_unknown_frames() {
        info!("  Creating unknown frame archive...");
        match UnknownFrameArchive::new(config.debug().unknown_frames_file()) {
            Ok(archive) => Some(Arc::new(archive)),
            Err(e) => {
                error!("Unknown frames will not be saved: {}", e);
                None
            }
        }
    } else {
        None
    };
    let archive_handle = archive.clone().map(|archive| {
        let channels = channels.clone();
        tokio::spawn(async move {
            if let Err(e) = archive.start(channels).await {
                error!("Archive task failed: {}", e);
            }
        })
    });

    info!("  Creating MQTT client...");
    let mqtt = Arc::new(Mqtt::new(
        config.clone(),
        channels.clone(),
        coordinator.shared_stats.clone(),
    ));
    let mqtt_clone = mqtt.clone();
    let mqtt_handle = tokio::spawn(async move {
        if let Err(e) = mqtt_clone.start().await {
            error!("MQTT task failed: {}", e);
        }
    });

    info!("Waiting for shutdown signal...");
    let _ = shutdown_rx.recv().await;

    info!("Shutdown signal received, stopping components...");
    let components = Components {
        coordinator,
        mqtt,
        archive,
        channels,
    };
    components.stop().await;

    if let Err(e) = coordinator_handle.await {
        error!("Error waiting for coordinator task: {}", e);
    }
    if let Err(e) = mqtt_handle.await {
        error!("Error waiting for MQTT task: {}", e);
    }
    if let Some(handle) = archive_handle {
        if let Err(e) = handle.await {
            error!("Error waiting for archive task: {}", e);
        }
    }

    if let Ok(stats) = components.stats().lock() {
        stats.print_summary();
    }

    info!("Application shutdown complete");
    Ok(())
}

/// Decode a single payload offline, returning the lines `--decode` prints.
pub fn decode_once(config: &ConfigWrapper, input: &str) -> Result<Vec<String>> {
    let frame = payload::parse(input)?;
    let decoder = Decoder::new(Arc::new(Tables::new(config.hnet())));
    let collector = Collector::new();

    let decoded = decoder.process(&frame, &collector, &collector);

    let mut lines = Vec::new();
    for reading in collector.readings() {
        lines.push(format!(
            "{}/{} {}",
            config.mqtt().namespace(),
            reading.topic,
            reading.to_payload()?
        ));
    }
    for record in collector.records() {
        for reason in &record.reasons {
            lines.push(format!("archive {}: {}", reason, record.hex()));
        }
    }
    for issue in &decoded.issues {
        lines.push(format!("issue: {}", issue));
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_once_prints_readings_and_archive() -> Result<()> {
        let config = ConfigWrapper::from_config(Config::default());
        // unknown opcode 0xFF from the outdoor unit, bad checksum
        let lines = decode_once(&config, "2024-03-01T08:15:00 12000a000000000000ff0000")?;

        assert!(lines.iter().any(|l| l.starts_with("PDC/outdoor/status ")));
        assert!(lines.iter().any(|l| l == "archive invalid_checksum: 12 00 0A 00 00 00 00 00 00 FF 00 00"));
        assert!(lines.iter().any(|l| l == "archive unknown_opcode_0xFF: 12 00 0A 00 00 00 00 00 00 FF 00 00"));
        Ok(())
    }

    #[test]
    fn decode_once_rejects_garbage() {
        let config = ConfigWrapper::from_config(Config::default());
        assert!(decode_once(&config, "not-a-frame").is_err());
    }
}
