#![allow(dead_code)]

#[allow(unused_imports)]
pub use hnet_bridge::hnet::sink::Collector;
pub use hnet_bridge::prelude::*;

pub const INDOOR: u8 = 0x21;
pub const OUTDOOR: u8 = 0x12;

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Set the trailing byte so the frame passes the checksum.
pub fn with_checksum(mut frame: Vec<u8>) -> Vec<u8> {
    if let Some(last) = frame.len().checked_sub(1) {
        frame[last] = Frame::compute_checksum(&frame);
    }
    frame
}

/// Frame of `len` zero bytes with the given source and opcode, checksum fixed up.
pub fn frame(src: u8, opcode: u8, len: usize, fields: &[(usize, u8)]) -> Vec<u8> {
    let mut frame = vec![0u8; len];
    frame[0] = src;
    frame[3] = 0x01;
    frame[9] = opcode;
    for &(index, value) in fields {
        frame[index] = value;
    }
    with_checksum(frame)
}

pub fn decoder() -> Decoder {
    Decoder::default()
}

pub fn decoder_with(yaml: &str) -> Decoder {
    let config = Config::from_yaml(yaml).unwrap();
    Decoder::new(std::sync::Arc::new(Tables::new(&config.hnet)))
}

pub fn topics(decoded: &Decoded) -> Vec<&str> {
    decoded.readings.iter().map(|r| r.topic.as_str()).collect()
}

pub fn value(decoded: &Decoded, topic: &str) -> Option<ReadingValue> {
    decoded.find(topic).map(|r| r.value.clone())
}

pub struct Factory;

impl Factory {
    /// Indoor status frame: AUTO MODE - CYCLE ON, water setpoint 45, mode COOLING.
    pub fn status() -> Vec<u8> {
        frame(INDOOR, 0xb1, 48, &[(10, 0x05), (12, 45), (13, 0x00)])
    }

    pub fn status_with(src: u8, fields: &[(usize, u8)]) -> Vec<u8> {
        let mut base = vec![(10, 0x05), (12, 45), (13, 0x00)];
        base.extend_from_slice(fields);
        frame(src, 0xb1, 48, &base)
    }

    /// Outdoor sensor frame with every probe populated.
    pub fn sensor() -> Vec<u8> {
        frame(
            OUTDOOR,
            0xb6,
            76,
            &[
                (11, 35),
                (12, 40),
                (13, 38),
                (16, 41),
                (39, 12),
                (40, 22),
                (43, 9),
                (44, 10),
                (65, 18),
                (66, 3),
                (67, 60),
                (68, 4),
            ],
        )
    }

    pub fn sensor_with(fields: &[(usize, u8)]) -> Vec<u8> {
        frame(OUTDOOR, 0xb6, 76, fields)
    }

    /// Outdoor system info frame: 50 Hz, 25.8 A, params 7 and 9.
    pub fn system_info() -> Vec<u8> {
        frame(
            OUTDOOR,
            0xb8,
            30,
            &[(10, 7), (11, 9), (21, 50), (23, 0x02), (24, 0x01)],
        )
    }

    pub fn system_info_with(fields: &[(usize, u8)]) -> Vec<u8> {
        frame(OUTDOOR, 0xb8, 30, fields)
    }

    pub fn ack() -> Vec<u8> {
        with_checksum(vec![INDOOR, 0x06, 0x00, 0x00])
    }
}
