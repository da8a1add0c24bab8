use crate::prelude::*;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::collections::BTreeMap;

// {{{ Opcode
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Status = 0xb1,
    Sensor = 0xb6,
    SystemInfo = 0xb8,
}

impl Opcode {
    /// Frames shorter than this are not decoded at all for the opcode.
    pub fn min_len(&self) -> usize {
        match self {
            Self::Status => 48,
            Self::Sensor => 76,
            Self::SystemInfo => 30,
        }
    }
}
// }}}

/// Lookup tables and addressing seeded from `config::Hnet` at startup.
///
/// Shared read-only between decoders; there is no way to mutate it once built.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tables {
    commands: BTreeMap<u8, String>,
    modes: BTreeMap<u8, String>,
    indoor_addr: u8,
    outdoor_addr: u8,
    invalid_sensor: u8,
    supported: Vec<u8>,
    extended_cycle_flags: bool,
}

impl Default for Tables {
    fn default() -> Self {
        Self::new(&config::Hnet::default())
    }
}

impl Tables {
    pub fn new(hnet: &config::Hnet) -> Self {
        Self {
            commands: hnet.operation_commands.clone(),
            modes: hnet.operation_modes.clone(),
            indoor_addr: hnet.indoor_controller_addr,
            outdoor_addr: hnet.outdoor_unit_addr,
            invalid_sensor: hnet.invalid_sensor_value,
            supported: hnet.supported_opcodes.clone(),
            extended_cycle_flags: hnet.extended_cycle_flags,
        }
    }

    pub fn command(&self, code: u8) -> Option<&str> {
        self.commands.get(&code).map(String::as_str)
    }

    pub fn mode(&self, code: u8) -> Option<&str> {
        self.modes.get(&code).map(String::as_str)
    }

    pub fn device(&self, source_address: u8) -> DeviceAddress {
        DeviceAddress::classify(source_address, self.indoor_addr)
    }

    pub fn indoor_addr(&self) -> u8 {
        self.indoor_addr
    }

    pub fn outdoor_addr(&self) -> u8 {
        self.outdoor_addr
    }

    pub fn invalid_sensor(&self) -> u8 {
        self.invalid_sensor
    }

    pub fn extended_cycle_flags(&self) -> bool {
        self.extended_cycle_flags
    }

    /// Resolve a raw opcode byte, honouring the configured supported set.
    pub fn opcode(&self, raw: u8) -> Option<Opcode> {
        if !self.supported.contains(&raw) {
            return None;
        }

        Opcode::try_from(raw).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables() {
        let t = Tables::default();
        assert_eq!(t.command(0x05), Some("AUTO MODE - CYCLE ON"));
        assert_eq!(t.command(0x64), Some("HEATING MODE - CYCLE OFF"));
        assert_eq!(t.command(0x06), None);
        assert_eq!(t.mode(0x00), Some("COOLING"));
        assert_eq!(t.mode(0x14), Some("HEATING"));
        assert_eq!(t.mode(0x28), Some("AUTO"));
        assert_eq!(t.mode(0x01), None);
        assert_eq!(t.invalid_sensor(), 129);
        assert_eq!(t.indoor_addr(), 0x21);
        assert_eq!(t.outdoor_addr(), 0x12);
    }

    #[test]
    fn opcode_respects_supported_set() {
        let t = Tables::default();
        assert_eq!(t.opcode(0xb1), Some(Opcode::Status));
        assert_eq!(t.opcode(0xb6), Some(Opcode::Sensor));
        assert_eq!(t.opcode(0xb8), Some(Opcode::SystemInfo));
        assert_eq!(t.opcode(0xff), None);

        let hnet = config::Hnet {
            supported_opcodes: vec![0xb1],
            ..Default::default()
        };
        let t = Tables::new(&hnet);
        assert_eq!(t.opcode(0xb1), Some(Opcode::Status));
        assert_eq!(t.opcode(0xb6), None);
    }

    #[test]
    fn opcode_minimum_lengths() {
        assert_eq!(Opcode::Status.min_len(), 48);
        assert_eq!(Opcode::Sensor.min_len(), 76);
        assert_eq!(Opcode::SystemInfo.min_len(), 30);
        assert_eq!(u8::from(Opcode::Sensor), 0xb6);
    }
}
