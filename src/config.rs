use crate::buttons::Button;
use crate::controller::Pins;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub controller: ControllerConfig,
    pub gpio: GpioConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub buttons: Vec<ButtonMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub port: u8,
    pub data_pin: u8,
    pub clock_pin: u8,
    pub latch_pin: u8,
}

impl ControllerConfig {
    pub fn pins(&self) -> Pins {
        Pins::new(self.data_pin, self.clock_pin, self.latch_pin)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpioConfig {
    /// BCM line backing each register bit of a port, bit 0 first.
    pub ports: BTreeMap<u8, Vec<Option<u8>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 16 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonMapping {
    pub button: Button,
    pub command: String,
    pub description: Option<String>,
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse configuration file")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// The command bound to `button`, if any. The first mapping wins.
    pub fn binding(&self, button: Button) -> Option<&ButtonMapping> {
        self.buttons.iter().find(|m| m.button == button)
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut ports = BTreeMap::new();
        ports.insert(1, vec![None, Some(17), Some(27), Some(22)]);
        Self {
            controller: ControllerConfig {
                port: 1,
                data_pin: 1,
                clock_pin: 2,
                latch_pin: 3,
            },
            gpio: GpioConfig { ports },
            polling: PollingConfig::default(),
            buttons: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
controller:
  port: 2
  data_pin: 0
  clock_pin: 1
  latch_pin: 2
gpio:
  ports:
    2: [5, 6, 13]
polling:
  interval_ms: 20
buttons:
  - button: start
    command: "systemctl restart kiosk"
    description: Restart kiosk
  - button: l
    command: "amixer set Master 5%-"
"#;

    #[test]
    fn test_parse_example() {
        let config = Config::from_yaml(EXAMPLE).unwrap();
        assert_eq!(config.controller.port, 2);
        assert_eq!(config.controller.pins(), Pins::new(0, 1, 2));
        assert_eq!(config.gpio.ports[&2], vec![Some(5), Some(6), Some(13)]);
        assert_eq!(config.polling.interval_ms, 20);
        assert_eq!(config.buttons.len(), 2);
        assert_eq!(
            config.binding(Button::Start).unwrap().description.as_deref(),
            Some("Restart kiosk")
        );
        assert!(config.binding(Button::L).unwrap().description.is_none());
        assert!(config.binding(Button::R).is_none());
    }

    #[test]
    fn test_optional_sections() {
        let config = Config::from_yaml(
            "controller: {port: 1, data_pin: 1, clock_pin: 2, latch_pin: 3}\ngpio: {ports: {1: [null, 17, 27, 22]}}\n",
        )
        .unwrap();
        assert_eq!(config.polling, PollingConfig::default());
        assert!(config.buttons.is_empty());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_button_is_rejected() {
        let yaml = "controller: {port: 1, data_pin: 1, clock_pin: 2, latch_pin: 3}\ngpio: {ports: {}}\nbuttons: [{button: turbo, command: ls}]\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::load("/nonexistent/snes-ctrl.yaml").is_err());
    }
}
