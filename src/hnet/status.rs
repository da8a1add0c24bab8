use crate::prelude::*;
use crate::hnet::decoder::{Emitter, Extract, CELSIUS};

const OPERATION_COMMAND: usize = 10;
const WATER_SETPOINT: usize = 12;
const OPERATION_MODE: usize = 13;
const DHW_SETPOINT: usize = 14;
const POOL_SETPOINT: usize = 15;
const CYCLE_SELECTION: usize = 16;
const INDOOR_TEMPERATURE_1: usize = 18;
const AMBIENT_SETPOINT: usize = 19;
const INDOOR_TEMPERATURE_2: usize = 26;
const CLOCK: std::ops::Range<usize> = 32..38;

/// Mode implied by an operation command description.
pub fn mode_of(description: &str) -> &'static str {
    if description.contains("AUTO") {
        "AUTO"
    } else if description.contains("COOLING") {
        "COOLING"
    } else if description.contains("HEATING") {
        "HEATING"
    } else {
        "UNKNOWN"
    }
}

pub fn cycle_of(description: &str) -> &'static str {
    if description.contains("ON") {
        "ON"
    } else {
        "OFF"
    }
}

/// `DD/MM/YYYY HH:MM:SS` from `[year - 2000, month, day, hour, minute, second]`.
///
/// A zero anywhere means the controller hasn't set its clock, so nothing is returned.
pub fn format_clock(clock: &[u8]) -> Option<String> {
    let &[year, month, day, hour, minute, second] = clock else {
        return None;
    };
    if clock.contains(&0) {
        return None;
    }

    Some(format!(
        "{:02}/{:02}/{:04} {:02}:{:02}:{:02}",
        day,
        month,
        2000 + year as u16,
        hour,
        minute,
        second
    ))
}

/// Opcode 0xB1: mode, setpoints, cycle selection and the controller clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatusExtractor;

impl Extract for StatusExtractor {
    fn opcode(&self) -> Opcode {
        Opcode::Status
    }

    fn extract(&self, frame: &Frame, tables: &Tables, out: &mut Emitter) {
        let device = tables.device(frame.source_address().unwrap_or_default());
        info!("decoding status for {}", device);

        let topic = |name: &str| format!("{}/{}", device, name);

        if let Some(description) = frame.field(OPERATION_COMMAND).and_then(|c| tables.command(c)) {
            out.emit(topic("operation_command"), description, None);
            out.emit(topic("mode"), mode_of(description), None);
            out.emit(topic("cycle_status"), cycle_of(description), None);
        }

        if let Some(v) = frame.nonzero_field(WATER_SETPOINT) {
            out.emit(topic("water_setpoint"), v, Some(CELSIUS));
        }

        // 0x00 is a real key here (COOLING), so no zero suppression
        if let Some(mode) = frame.field(OPERATION_MODE).and_then(|m| tables.mode(m)) {
            out.emit(topic("operation_mode"), mode, None);
        }

        for (index, name) in [
            (DHW_SETPOINT, "dhw_setpoint"),
            (POOL_SETPOINT, "pool_setpoint"),
            (INDOOR_TEMPERATURE_1, "indoor_temperature_1"),
            (INDOOR_TEMPERATURE_2, "indoor_temperature_2"),
            (AMBIENT_SETPOINT, "ambient_setpoint"),
        ] {
            if let Some(v) = frame.nonzero_field(index) {
                out.emit(topic(name), v, Some(CELSIUS));
            }
        }

        if let Some(cycles) = frame.field(CYCLE_SELECTION) {
            out.emit(topic("cycle_1_active"), cycles & 0x01 != 0, None);
            out.emit(topic("cycle_2_active"), cycles & 0x02 != 0, None);
            if tables.extended_cycle_flags() {
                out.emit(topic("cycle_dhw_active"), cycles & 0x04 != 0, None);
                out.emit(topic("cycle_pool_active"), cycles & 0x08 != 0, None);
            }
        }

        match frame.bytes().get(CLOCK).and_then(format_clock) {
            Some(datetime) => out.emit(topic("system_datetime"), datetime, None),
            None => trace!("{} clock not set", device),
        }
    }
}
