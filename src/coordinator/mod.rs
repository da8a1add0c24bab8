use crate::prelude::*;

use crate::archive::ArchiveChannel;
use crate::hnet::payload;
use crate::hnet::sink::Discard;
use std::sync::{Arc, Mutex};

#[derive(Default, Debug, Clone)]
pub struct FrameStats {
    pub payloads_received: u64,
    pub unparseable_payloads: u64,
    pub frames_decoded: u64,
    // Frame type counters
    pub status_frames: u64,
    pub sensor_frames: u64,
    pub system_info_frames: u64,
    pub acknowledgements: u64,
    // Problems
    pub too_short: u64,
    pub invalid_checksums: u64,
    pub unknown_opcodes: u64,
    pub under_length: u64,
    pub frames_archived: u64,
    // Output
    /// Readings handed to the sink, not broker acknowledgements
    pub readings_emitted: u64,
    pub mqtt_messages_sent: u64,
    pub mqtt_errors: u64,
}

impl FrameStats {
    pub fn print_summary(&self) {
        info!("Frame Statistics:");
        info!("  Payloads received: {}", self.payloads_received);
        info!("  Unparseable payloads: {}", self.unparseable_payloads);
        info!("  Frames decoded: {}", self.frames_decoded);
        info!("  Frame Types:");
        info!("    Status frames: {}", self.status_frames);
        info!("    Sensor frames: {}", self.sensor_frames);
        info!("    System info frames: {}", self.system_info_frames);
        info!("    Acknowledgements: {}", self.acknowledgements);
        info!("  Problems:");
        info!("    Too short: {}", self.too_short);
        info!("    Invalid checksums: {}", self.invalid_checksums);
        info!("    Unknown opcodes: {}", self.unknown_opcodes);
        info!("    Under length: {}", self.under_length);
        info!("    Frames archived: {}", self.frames_archived);
        info!("  MQTT:");
        info!("    Readings emitted: {}", self.readings_emitted);
        info!("    Messages sent: {}", self.mqtt_messages_sent);
        info!("    Errors: {}", self.mqtt_errors);
    }

    fn record(&mut self, opcode: Option<Opcode>, decoded: &Decoded) {
        self.frames_decoded += 1;
        self.readings_emitted += decoded.readings.len() as u64;

        if decoded.acknowledgement {
            self.acknowledgements += 1;
        }
        if decoded.archive.is_some() {
            self.frames_archived += 1;
        }

        for issue in &decoded.issues {
            match issue {
                DecodeIssue::TooShort { .. } => self.too_short += 1,
                DecodeIssue::ChecksumInvalid { .. } => self.invalid_checksums += 1,
                DecodeIssue::UnknownOpcode(_) => self.unknown_opcodes += 1,
                DecodeIssue::UnderLengthForOpcode { .. } => self.under_length += 1,
            }
        }

        match opcode {
            Some(Opcode::Status) => self.status_frames += 1,
            Some(Opcode::Sensor) => self.sensor_frames += 1,
            Some(Opcode::SystemInfo) => self.system_info_frames += 1,
            None => {}
        }
    }
}

#[derive(Clone)]
pub struct Coordinator {
    config: ConfigWrapper,
    channels: Channels,
    decoder: Decoder,
    pub shared_stats: Arc<Mutex<FrameStats>>,
}

impl Coordinator {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        let decoder = Decoder::new(Arc::new(Tables::new(config.hnet())));

        Self {
            config,
            channels,
            decoder,
            shared_stats: Arc::new(Mutex::new(FrameStats::default())),
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut receiver = self.channels.from_mqtt.subscribe();

        loop {
            match receiver.recv().await {
                Ok(mqtt::ChannelData::Message(message)) => self.process_message(&message),
                Ok(mqtt::ChannelData::Shutdown) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("coordinator lagged, {} payloads dropped", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        info!("coordinator loop exiting");
        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.from_mqtt.send(mqtt::ChannelData::Shutdown);
    }

    /// Decode one raw-frame message from the bus sniffer.
    ///
    /// Unparseable payloads are logged and counted; nothing about a single
    /// bad frame stops the loop.
    pub fn process_message(&self, message: &mqtt::Message) {
        if let Ok(mut stats) = self.shared_stats.lock() {
            stats.payloads_received += 1;
        }

        let frame = match payload::parse(&message.payload) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("ignoring payload on {}: {}", message.topic, err);
                if let Ok(mut stats) = self.shared_stats.lock() {
                    stats.unparseable_payloads += 1;
                }
                return;
            }
        };

        self.process_frame(&frame);
    }

    pub fn process_frame(&self, frame: &[u8]) -> Decoded {
        if self.config.debug().print_raw_frames() {
            debug!("RAW: {}", Frame::new(frame).hex());
        }

        let readings = mqtt::ReadingPublisher::new(self.channels.to_mqtt.clone(), self.config.mqtt().retain());

        let decoded = if self.config.debug().save_unknown_frames() {
            let archive = ArchiveChannel::new(self.channels.to_archive.clone());
            self.decoder.process(frame, &readings, &archive)
        } else {
            self.decoder.process(frame, &readings, &Discard)
        };

        let opcode = Frame::new(frame).opcode().and_then(|o| self.decoder.tables().opcode(o));
        if let Ok(mut stats) = self.shared_stats.lock() {
            stats.record(opcode, &decoded);
        }

        decoded
    }
}
