use crate::prelude::*;

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mqtt: Mqtt,
    pub hnet: Hnet,
    pub homeassistant: HomeAssistant,
    pub debug: Diagnostics,

    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: Mqtt::default(),
            hnet: Hnet::default(),
            homeassistant: HomeAssistant::default(),
            debug: Diagnostics::default(),
            loglevel: Self::default_loglevel(),
        }
    }
}

// Mqtt {{{
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Mqtt {
    pub enabled: bool,

    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,

    /// Topic the bus sniffer publishes raw frames on
    pub input_topic: String,
    /// Prefix for every published reading, eg PDC/sensors/water_flow
    pub namespace: String,

    pub qos: u8,
    pub retain: bool,
    pub keepalive: u64,
    pub reconnect_delay: u64,
}

impl Default for Mqtt {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "localhost".to_string(),
            port: 1883,
            username: None,
            password: None,
            client_id: "hnet-bridge".to_string(),
            input_topic: "hisense/hnet/raw".to_string(),
            namespace: "PDC".to_string(),
            qos: 1,
            retain: true,
            keepalive: 60,
            reconnect_delay: 5,
        }
    }
}

impl Mqtt {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn input_topic(&self) -> &str {
        &self.input_topic
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn qos(&self) -> rumqttc::QoS {
        match self.qos {
            0 => rumqttc::QoS::AtMostOnce,
            2 => rumqttc::QoS::ExactlyOnce,
            _ => rumqttc::QoS::AtLeastOnce,
        }
    }

    pub fn retain(&self) -> bool {
        self.retain
    }

    pub fn keepalive(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.keepalive)
    }

    pub fn reconnect_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reconnect_delay)
    }
} // }}}

// Hnet {{{
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Hnet {
    pub indoor_controller_addr: u8,
    pub outdoor_unit_addr: u8,
    /// Byte value a probe reports when nothing is attached
    pub invalid_sensor_value: u8,
    pub supported_opcodes: Vec<u8>,
    pub operation_commands: BTreeMap<u8, String>,
    pub operation_modes: BTreeMap<u8, String>,
    /// Also publish the DHW and pool cycle bits of the status frame
    pub extended_cycle_flags: bool,
}

impl Default for Hnet {
    fn default() -> Self {
        Self {
            indoor_controller_addr: 0x21,
            outdoor_unit_addr: 0x12,
            invalid_sensor_value: 129,
            supported_opcodes: vec![0xb1, 0xb6, 0xb8],
            operation_commands: Self::default_operation_commands(),
            operation_modes: Self::default_operation_modes(),
            extended_cycle_flags: false,
        }
    }
}

impl Hnet {
    fn default_operation_commands() -> BTreeMap<u8, String> {
        [
            (0x04, "AUTO MODE - CYCLE OFF"),
            (0x05, "AUTO MODE - CYCLE ON"),
            (0x08, "COOLING MODE - CYCLE OFF"),
            (0x09, "COOLING MODE - CYCLE ON"),
            (0x64, "HEATING MODE - CYCLE OFF"),
            (0x65, "HEATING MODE - CYCLE ON"),
        ]
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }

    fn default_operation_modes() -> BTreeMap<u8, String> {
        [(0x00, "COOLING"), (0x14, "HEATING"), (0x28, "AUTO")]
            .into_iter()
            .map(|(k, v)| (k, v.to_string()))
            .collect()
    }
} // }}}

// HomeAssistant {{{
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HomeAssistant {
    pub enabled: bool,
    pub prefix: String,
    pub device_name: String,
    pub device_id: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
}

impl Default for HomeAssistant {
    fn default() -> Self {
        Self {
            enabled: false,
            prefix: "homeassistant".to_string(),
            device_name: "Hisense Heat Pump".to_string(),
            device_id: "hisense_hnet".to_string(),
            manufacturer: "Hisense".to_string(),
            model: "H-NET Heat Pump".to_string(),
            sw_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl HomeAssistant {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
} // }}}

// Diagnostics {{{
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    pub print_raw_frames: bool,
    pub save_unknown_frames: bool,
    pub unknown_frames_file: String,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            print_raw_frames: true,
            save_unknown_frames: true,
            unknown_frames_file: "logs/unknown_frames.log".to_string(),
        }
    }
}

impl Diagnostics {
    pub fn print_raw_frames(&self) -> bool {
        self.print_raw_frames
    }

    pub fn save_unknown_frames(&self) -> bool {
        self.save_unknown_frames
    }

    pub fn unknown_frames_file(&self) -> &str {
        &self.unknown_frames_file
    }
} // }}}

/// Cheap to clone handle on the loaded config. Config never changes after startup.
#[derive(Clone, Debug)]
pub struct ConfigWrapper {
    config: Arc<Config>,
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        let config = Config::new(file)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn mqtt(&self) -> &Mqtt {
        &self.config.mqtt
    }

    pub fn hnet(&self) -> &Hnet {
        &self.config.hnet
    }

    pub fn homeassistant(&self) -> &HomeAssistant {
        &self.config.homeassistant
    }

    pub fn debug(&self) -> &Diagnostics {
        &self.config.debug
    }

    pub fn loglevel(&self) -> &str {
        &self.config.loglevel
    }

    pub fn homeassistant_enabled(&self) -> bool {
        self.config.homeassistant.enabled
    }

    pub fn log_summary(&self) {
        self.config.log_summary()
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| crate::file_error_with_source!(err, "error reading {}", file))?;

        Self::from_yaml(&content)
    }

    pub fn log_summary(&self) {
        let config = self;
        info!("Configuration loaded successfully:");
        info!("  MQTT: {}", if config.mqtt.enabled { "enabled" } else { "disabled" });
        if config.mqtt.enabled {
            info!("    Host: {}", config.mqtt.host);
            info!("    Port: {}", config.mqtt.port);
            info!("    Input topic: {}", config.mqtt.input_topic);
            info!("    Namespace: {}", config.mqtt.namespace);
        }
        info!("  H-NET:");
        info!("    Indoor controller: 0x{:02X}", config.hnet.indoor_controller_addr);
        info!("    Outdoor unit: 0x{:02X}", config.hnet.outdoor_unit_addr);
        info!("    Invalid sensor value: {}", config.hnet.invalid_sensor_value);
        info!(
            "    Supported opcodes: {}",
            config
                .hnet
                .supported_opcodes
                .iter()
                .map(|o| format!("0x{:02X}", o))
                .collect::<Vec<_>>()
                .join(", ")
        );
        info!("  Home Assistant: {}", if config.homeassistant.enabled { "enabled" } else { "disabled" });
        if config.debug.save_unknown_frames {
            info!("  Unknown frames file: {}", config.debug.unknown_frames_file);
        }
        info!("  Log Level: {}", config.loglevel);
    }

    /// Parse YAML after `${VAR}` / `${VAR:-default}` substitution, then validate.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let content = expand_env(content);

        // an empty document deserializes as unit, not as an empty map
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.mqtt.enabled {
            if self.mqtt.port == 0 {
                bail!("mqtt.port must be between 1 and 65535");
            }
            if self.mqtt.host.is_empty() {
                return Err(crate::file_error!("MQTT host cannot be empty"));
            }
        }
        if self.mqtt.qos > 2 {
            bail!("mqtt.qos must be 0, 1 or 2");
        }
        if self.mqtt.input_topic.is_empty() {
            return Err(crate::file_error!("mqtt.input_topic cannot be empty"));
        }
        if self.mqtt.namespace.is_empty() {
            return Err(crate::file_error!("mqtt.namespace cannot be empty"));
        }

        if self.hnet.indoor_controller_addr == self.hnet.outdoor_unit_addr {
            bail!("hnet.indoor_controller_addr and hnet.outdoor_unit_addr must differ");
        }
        if self.hnet.operation_commands.is_empty() {
            return Err(crate::file_error!("hnet.operation_commands cannot be empty"));
        }
        if self.hnet.operation_modes.is_empty() {
            return Err(crate::file_error!("hnet.operation_modes cannot be empty"));
        }

        if self.debug.save_unknown_frames && self.debug.unknown_frames_file.is_empty() {
            return Err(crate::file_error!("debug.unknown_frames_file cannot be empty"));
        }

        Ok(())
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}

/// Replace `${VAR}` and `${VAR:-default}` with values from the environment.
///
/// Unset variables without a default become empty; unterminated `${` is left alone.
pub fn expand_env(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let expr = &after[..end];
        let (name, default) = match expr.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (expr, None),
        };

        match std::env::var(name) {
            Ok(value) if !value.is_empty() || default.is_none() => out.push_str(&value),
            _ => out.push_str(default.unwrap_or_default()),
        }

        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
