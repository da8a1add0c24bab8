use crate::prelude::*;
use crate::hnet::decoder::{Emitter, Extract};

const SYSTEM_PARAM_1: usize = 10;
const SYSTEM_PARAM_2: usize = 11;
const INVERTER_FREQUENCY: usize = 21;
const EVO_CURRENT_LO: usize = 23;
const EVO_CURRENT_HI: usize = 24;

/// Combine the little-endian current pair into amps (0.1 A resolution).
///
/// None when both bytes are 0, i.e. the compressor isn't drawing current.
pub fn evo_current(lo: u8, hi: u8) -> Option<f64> {
    if lo == 0 && hi == 0 {
        return None;
    }

    Some(f64::from(u16::from_le_bytes([lo, hi])) / 10.0)
}

/// Opcode 0xB8: inverter and electrical parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemInfoExtractor;

impl Extract for SystemInfoExtractor {
    fn opcode(&self) -> Opcode {
        Opcode::SystemInfo
    }

    fn extract(&self, frame: &Frame, _tables: &Tables, out: &mut Emitter) {
        info!("decoding system info");

        if let Some(v) = frame.nonzero_field(INVERTER_FREQUENCY) {
            out.emit("outdoor/inverter_frequency", v, Some("Hz"));
        }

        if let (Some(lo), Some(hi)) = (frame.field(EVO_CURRENT_LO), frame.field(EVO_CURRENT_HI)) {
            if let Some(amps) = evo_current(lo, hi) {
                out.emit("outdoor/evo_current", amps, Some("A"));
            }
        }

        if let Some(v) = frame.field(SYSTEM_PARAM_1) {
            out.emit("outdoor/system_param_1", v, None);
        }
        if let Some(v) = frame.field(SYSTEM_PARAM_2) {
            out.emit("outdoor/system_param_2", v, None);
        }
    }
}
