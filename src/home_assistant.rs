use crate::prelude::*;

use crate::hnet::decoder::CELSIUS;
use serde::Serialize;

// Entity {{{
/// One discoverable reading topic.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    /// Topic relative to the namespace, eg `sensors/water_flow`
    pub id: String,
    pub name: String,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub icon: &'static str,
}

impl Entity {
    fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        unit: Option<&'static str>,
        device_class: Option<&'static str>,
        icon: &'static str,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit,
            device_class,
            icon,
        }
    }
} // }}}

const TEMPERATURE: Option<&str> = Some("temperature");

// (topic, name, unit, device_class, icon)
type Row = (&'static str, &'static str, Option<&'static str>, Option<&'static str>, &'static str);

const SENSORS: &[Row] = &[
    ("sensors/water_inlet_temperature", "Water Inlet Temperature", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/water_outlet_temperature_1", "Water Outlet Temperature 1", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/water_outlet_temperature_2", "Water Outlet Temperature 2", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/heat_exchanger_outlet_temperature", "Heat Exchanger Outlet Temperature", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/gas_ui_temperature", "Gas UI Temperature", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/liquid_ui_temperature", "Liquid UI Temperature", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/ambient_temperature", "Ambient Temperature", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/ambient_temperature_avg", "Ambient Temperature Average", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/exhaust_temperature", "Exhaust Temperature", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/liquid_evaporation_temperature", "Liquid Evaporation Temperature", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("sensors/water_flow", "Water Flow", Some("L/min"), None, "mdi:water-pump"),
    ("sensors/water_speed", "Water Speed", None, None, "mdi:speedometer"),
    ("outdoor/pump_status", "Outdoor Pump Status", None, None, "mdi:pump"),
    ("outdoor/inverter_frequency", "Inverter Frequency", Some("Hz"), Some("frequency"), "mdi:sine-wave"),
    ("outdoor/evo_current", "EVO Current", Some("A"), Some("current"), "mdi:current-ac"),
    ("outdoor/system_param_1", "System Parameter 1", None, None, "mdi:cog"),
    ("outdoor/system_param_2", "System Parameter 2", None, None, "mdi:cog"),
];

// published under both indoor/ and outdoor/
const PER_DEVICE: &[Row] = &[
    ("water_setpoint", "Water Setpoint", Some(CELSIUS), TEMPERATURE, "mdi:thermostat"),
    ("dhw_setpoint", "DHW Setpoint", Some(CELSIUS), TEMPERATURE, "mdi:water-thermometer"),
    ("pool_setpoint", "Pool Setpoint", Some(CELSIUS), TEMPERATURE, "mdi:pool-thermometer"),
    ("ambient_setpoint", "Ambient Setpoint", Some(CELSIUS), TEMPERATURE, "mdi:thermostat"),
    ("indoor_temperature_1", "Indoor Temperature 1", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("indoor_temperature_2", "Indoor Temperature 2", Some(CELSIUS), TEMPERATURE, "mdi:thermometer"),
    ("operation_command", "Operation Command", None, None, "mdi:cog"),
    ("mode", "Mode", None, None, "mdi:hvac"),
    ("cycle_status", "Cycle Status", None, None, "mdi:power"),
    ("operation_mode", "Operation Mode", None, None, "mdi:hvac"),
    ("status", "Unit Status", None, None, "mdi:connection"),
    ("cycle_1_active", "Cycle 1 Active", None, None, "mdi:power"),
    ("cycle_2_active", "Cycle 2 Active", None, None, "mdi:power"),
    ("system_datetime", "System DateTime", None, None, "mdi:clock"),
];

const EXTENDED_CYCLES: &[Row] = &[
    ("cycle_dhw_active", "Cycle DHW Active", None, None, "mdi:power"),
    ("cycle_pool_active", "Cycle Pool Active", None, None, "mdi:power"),
];

#[derive(Debug, Serialize)]
struct Device {
    identifiers: Vec<String>,
    name: String,
    manufacturer: String,
    model: String,
    sw_version: String,
}

#[derive(Debug, Serialize)]
struct Discovery {
    unique_id: String,
    name: String,
    state_topic: String,
    value_template: &'static str,
    availability_topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_of_measurement: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_class: Option<&'static str>,
    icon: &'static str,
    device: Device,
}

pub struct Config {
    config: ConfigWrapper,
}

impl Config {
    pub fn new(config: &ConfigWrapper) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Every entity the decoders can publish, given the current hnet settings.
    pub fn entities(&self) -> Vec<Entity> {
        let row = |&(id, name, unit, class, icon): &Row| Entity::new(id, name, unit, class, icon);

        let mut entities: Vec<Entity> = SENSORS.iter().map(row).collect();

        let mut per_device: Vec<&Row> = PER_DEVICE.iter().collect();
        if self.config.hnet().extended_cycle_flags {
            per_device.extend(EXTENDED_CYCLES.iter());
        }

        for device in [DeviceAddress::IndoorController, DeviceAddress::OutdoorUnit] {
            let label = match device {
                DeviceAddress::IndoorController => "Indoor",
                DeviceAddress::OutdoorUnit => "Outdoor",
            };
            for &&(id, name, unit, class, icon) in per_device.iter() {
                entities.push(Entity::new(
                    format!("{}/{}", device, id),
                    format!("{} {}", label, name),
                    unit,
                    class,
                    icon,
                ));
            }
        }

        entities
    }

    pub fn all(&self) -> Result<Vec<mqtt::Message>> {
        self.entities()
            .iter()
            .map(|entity| self.discovery(entity))
            .collect()
    }

    fn discovery(&self, entity: &Entity) -> Result<mqtt::Message> {
        let ha = self.config.homeassistant();
        let namespace = self.config.mqtt().namespace();

        let unique_id = format!("{}_{}", ha.device_id, entity.id.replace('/', "_"));

        let config = Discovery {
            unique_id: unique_id.clone(),
            name: entity.name.clone(),
            state_topic: format!("{}/{}", namespace, entity.id),
            value_template: "{{ value_json.value }}",
            availability_topic: format!("{}/availability", namespace),
            unit_of_measurement: entity.unit,
            device_class: entity.device_class,
            icon: entity.icon,
            device: Device {
                identifiers: vec![ha.device_id.clone()],
                name: ha.device_name.clone(),
                manufacturer: ha.manufacturer.clone(),
                model: ha.model.clone(),
                sw_version: ha.sw_version.clone(),
            },
        };

        Ok(mqtt::Message {
            topic: format!("{}/sensor/{}/config", ha.prefix(), unique_id),
            retain: true,
            payload: serde_json::to_string(&config)?,
        })
    }
}
