use crate::prelude::*;
use crate::hnet::decoder::{Emitter, Extract, CELSIUS};

/// Probe temperatures. Suppressed when 0 or the configured "no sensor" value.
const PROBES: [(usize, &str); 8] = [
    (11, "sensors/water_inlet_temperature"),
    (12, "sensors/water_outlet_temperature_1"),
    (13, "sensors/heat_exchanger_outlet_temperature"),
    (16, "sensors/water_outlet_temperature_2"),
    (39, "sensors/gas_ui_temperature"),
    (40, "sensors/liquid_ui_temperature"),
    (43, "sensors/ambient_temperature"),
    (44, "sensors/ambient_temperature_avg"),
];

/// Suppressed only when 0.
const CIRCUIT: [(usize, &str, Option<&str>); 4] = [
    (65, "sensors/water_flow", Some("L/min")),
    (66, "sensors/water_speed", None),
    (67, "sensors/exhaust_temperature", Some(CELSIUS)),
    (68, "sensors/liquid_evaporation_temperature", Some(CELSIUS)),
];

// same byte as the water inlet probe
const PUMP_STATUS: usize = 11;

/// Opcode 0xB6: temperature, flow and pump readings from the outdoor unit.
#[derive(Clone, Copy, Debug, Default)]
pub struct SensorExtractor;

impl Extract for SensorExtractor {
    fn opcode(&self) -> Opcode {
        Opcode::Sensor
    }

    fn extract(&self, frame: &Frame, tables: &Tables, out: &mut Emitter) {
        info!("decoding sensor data");

        let invalid = tables.invalid_sensor();
        for (index, topic) in PROBES {
            match frame.nonzero_field(index) {
                Some(v) if v != invalid => out.emit(topic, v, Some(CELSIUS)),
                Some(_) => trace!("{}: no sensor", topic),
                None => {}
            }
        }

        for (index, topic, unit) in CIRCUIT {
            if let Some(v) = frame.nonzero_field(index) {
                out.emit(topic, v, unit);
            }
        }

        if let Some(v) = frame.field(PUMP_STATUS) {
            out.emit("outdoor/pump_status", v, None);
        }
    }
}
