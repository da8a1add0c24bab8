mod common;
use common::*;

#[test]
fn system_info_frame() {
    common_setup();

    let decoded = decoder().decode(&Factory::system_info());

    assert_eq!(
        topics(&decoded),
        vec![
            "outdoor/inverter_frequency",
            "outdoor/evo_current",
            "outdoor/system_param_1",
            "outdoor/system_param_2",
            "outdoor/status",
        ]
    );
    assert_eq!(value(&decoded, "outdoor/inverter_frequency"), Some(ReadingValue::Integer(50)));
    assert_eq!(decoded.find("outdoor/inverter_frequency").unwrap().unit, Some("Hz"));
    assert_eq!(value(&decoded, "outdoor/evo_current"), Some(ReadingValue::Float(25.8)));
    assert_eq!(decoded.find("outdoor/evo_current").unwrap().unit, Some("A"));
    assert_eq!(value(&decoded, "outdoor/system_param_1"), Some(ReadingValue::Integer(7)));
    assert_eq!(value(&decoded, "outdoor/system_param_2"), Some(ReadingValue::Integer(9)));
}

#[test]
fn system_info_zero_fields() {
    let decoded = decoder().decode(&Factory::system_info_with(&[]));

    assert!(decoded.find("outdoor/inverter_frequency").is_none());
    assert!(decoded.find("outdoor/evo_current").is_none());
    // params are reported even when zero
    assert_eq!(value(&decoded, "outdoor/system_param_1"), Some(ReadingValue::Integer(0)));
    assert_eq!(value(&decoded, "outdoor/system_param_2"), Some(ReadingValue::Integer(0)));
}

#[test]
fn system_info_evo_current_one_byte_set() {
    let decoded = decoder().decode(&Factory::system_info_with(&[(24, 0x01)]));
    assert_eq!(value(&decoded, "outdoor/evo_current"), Some(ReadingValue::Float(25.6)));

    let decoded = decoder().decode(&Factory::system_info_with(&[(23, 0x05)]));
    assert_eq!(value(&decoded, "outdoor/evo_current"), Some(ReadingValue::Float(0.5)));
}

#[test]
fn system_info_under_length() {
    let mut frame = Factory::system_info();
    frame.truncate(29);
    let frame = with_checksum(frame);

    let decoded = decoder().decode(&frame);
    assert!(decoded.has_issue(|i| matches!(
        i,
        DecodeIssue::UnderLengthForOpcode { opcode: Opcode::SystemInfo, len: 29, min: 30 }
    )));
    assert_eq!(topics(&decoded), vec!["outdoor/status"]);
}
