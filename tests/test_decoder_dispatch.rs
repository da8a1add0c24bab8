mod common;
use common::*;

#[test]
fn checksum_law() {
    let frames: Vec<Vec<u8>> = vec![
        vec![0x21, 0x00, 0x0a, 0x01],
        vec![0x12, 0x06, 0x00, 0x00, 0x34],
        Factory::status(),
        Factory::sensor(),
        (0u8..=200).step_by(7).collect(),
    ];

    for frame in frames {
        let (last, body) = frame.split_last().unwrap();
        let folded = body.iter().fold(0u8, |acc, b| acc ^ b) ^ frame[0];
        assert_eq!(Frame::new(&frame).checksum_valid(), folded == *last, "{:02X?}", frame);
    }

    assert!(!Frame::new(&[0x21, 0x00, 0x21]).checksum_valid());
}

#[test]
fn unknown_opcode() {
    common_setup();

    let frame = frame(INDOOR, 0xff, 48, &[(10, 0x05), (12, 45), (13, 0x00)]);
    let decoded = decoder().decode(&frame);

    assert_eq!(topics(&decoded), vec!["indoor/status"]);
    assert_eq!(value(&decoded, "indoor/status"), Some("online".into()));

    let record = decoded.archive.expect("archive record");
    assert_eq!(record.reasons, vec![ArchiveReason::UnknownOpcode(0xff)]);
    assert_eq!(record.reason().map(|r| r.to_string()), Some("unknown_opcode_0xFF".to_string()));
}

#[test]
fn unknown_opcode_with_bad_checksum_records_both() {
    let mut frame = frame(OUTDOOR, 0x42, 20, &[]);
    frame[19] ^= 0x01;

    let decoded = decoder().decode(&frame);
    let record = decoded.archive.as_ref().expect("archive record");
    assert_eq!(
        record.reasons,
        vec![ArchiveReason::InvalidChecksum, ArchiveReason::UnknownOpcode(0x42)]
    );
    assert_eq!(topics(&decoded), vec!["outdoor/status"]);
}

#[test]
fn acknowledgement_frame() {
    let decoded = decoder().decode(&Factory::ack());
    assert!(decoded.acknowledgement);
    assert!(decoded.readings.is_empty());
    assert!(decoded.archive.is_none());

    // a bad checksum on an ACK is not archived either
    let decoded = decoder().decode(&[0x21, 0x06, 0x00, 0x00]);
    assert!(decoded.acknowledgement);
    assert!(decoded.readings.is_empty());
    assert!(decoded.archive.is_none());
}

#[test]
fn too_short_frames() {
    for len in 0..4 {
        let bytes = vec![0x21u8; len];
        let decoded = decoder().decode(&bytes);
        assert!(decoded.readings.is_empty());
        assert!(decoded.archive.is_none());
        assert_eq!(decoded.issues, vec![DecodeIssue::TooShort { len, min: 4 }]);
    }

    let bytes = with_checksum(vec![0x21, 0x00, 0x08, 0x01, 0, 0, 0, 0, 0]);
    let decoded = decoder().decode(&bytes);
    assert!(decoded.readings.is_empty());
    assert!(decoded.archive.is_none());
    assert_eq!(decoded.issues, vec![DecodeIssue::TooShort { len: 9, min: 10 }]);
}

#[test]
fn zero_opcode_emits_nothing() {
    let decoded = decoder().decode(&frame(INDOOR, 0x00, 48, &[(10, 0x05)]));
    assert!(decoded.readings.is_empty());
    assert!(decoded.archive.is_none());
    assert!(decoded.issues.is_empty());
}

#[test]
fn unsupported_opcode_is_archived() {
    let decoder = decoder_with("hnet:\n  supported_opcodes: [0xb1, 0xb6]\n");
    let decoded = decoder.decode(&Factory::system_info());

    assert_eq!(topics(&decoded), vec!["outdoor/status"]);
    assert!(decoded.has_issue(|i| *i == DecodeIssue::UnknownOpcode(0xb8)));
    assert_eq!(
        decoded.archive.map(|a| a.reasons),
        Some(vec![ArchiveReason::UnknownOpcode(0xb8)])
    );
}

#[test]
fn decode_is_idempotent() {
    let decoder = decoder();
    for frame in [Factory::status(), Factory::sensor(), Factory::system_info()] {
        let a = decoder.decode(&frame);
        let b = decoder.decode(&frame);

        let strip = |d: &Decoded| {
            d.readings
                .iter()
                .map(|r| (r.topic.clone(), r.value.clone(), r.unit))
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(&a), strip(&b));
        assert_eq!(a.issues, b.issues);
    }
}

#[test]
fn readings_share_one_timestamp() {
    let decoded = decoder().decode(&Factory::sensor());
    let first = decoded.readings[0].timestamp;
    assert!(decoded.readings.iter().all(|r| r.timestamp == first));
}

#[test]
fn process_hands_results_to_sinks() {
    let collector = Collector::new();
    let mut bad = Factory::status();
    bad[47] ^= 0xff;

    let decoded = decoder().process(&bad, &collector, &collector);

    assert_eq!(collector.readings(), decoded.readings);
    assert_eq!(collector.readings().len(), 8);
    assert_eq!(
        collector.find("indoor/operation_command").map(|r| r.value),
        Some("AUTO MODE - CYCLE ON".into())
    );

    let records = collector.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].has_reason(ArchiveReason::InvalidChecksum));
}

#[test]
fn reading_payload_json() -> Result<()> {
    let decoded = decoder().decode(&Factory::status());

    let json: serde_json::Value =
        serde_json::from_str(&decoded.find("indoor/water_setpoint").unwrap().to_payload()?)?;
    assert_eq!(json["value"], 45);
    assert_eq!(json["unit"], "°C");
    assert!(json["timestamp"].is_string());

    let json: serde_json::Value =
        serde_json::from_str(&decoded.find("indoor/cycle_1_active").unwrap().to_payload()?)?;
    assert_eq!(json["value"], false);
    assert!(json.get("unit").is_none());
    Ok(())
}
