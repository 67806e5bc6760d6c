//! Protocol dialect constants and bridge configuration.
//!
//! The remote device's message definitions fix the field widths and the
//! command identifiers. They are kept here as configuration so that a device
//! with a different dialect only needs a different config file.

use super::wifi::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default SSID field width in bytes.
pub const DEFAULT_SSID_LEN: usize = 32;

/// Default password field width in bytes.
pub const DEFAULT_PASSWORD_LEN: usize = 64;

/// Default component id of the device's wireless module.
pub const DEFAULT_WIFI_COMPONENT_ID: u8 = 200;

/// Default quiet period that settles a saved-network refresh.
pub const DEFAULT_REFRESH_QUIET_PERIOD_MS: u64 = 1500;

/// Command identifiers understood by the wireless component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandIds {
    /// Switch the radio into access point mode.
    pub start_access_point: u16,
    /// Ask for a status report.
    pub request_status: u16,
    /// Ask for one network-information report per saved profile.
    pub request_networks: u16,
}

impl Default for CommandIds {
    fn default() -> Self {
        Self {
            start_access_point: 48000,
            request_status: 48001,
            request_networks: 48002,
        }
    }
}

/// Wire-level constants of the device dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Width of every SSID field in bytes.
    pub ssid_len: usize,
    /// Width of every password field in bytes.
    pub password_len: usize,
    /// Component id that receives wireless commands.
    pub wifi_component_id: u8,
    pub commands: CommandIds,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            ssid_len: DEFAULT_SSID_LEN,
            password_len: DEFAULT_PASSWORD_LEN,
            wifi_component_id: DEFAULT_WIFI_COMPONENT_ID,
            commands: CommandIds::default(),
        }
    }
}

impl ProtocolConfig {
    /// Validate configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if either field width is 0 or does not fit in a frame.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid_len == 0 || self.ssid_len > u8::MAX as usize {
            return Err(ConfigError::InvalidFormat(format!(
                "ssid_len must be in 1..=255, got {}",
                self.ssid_len
            )));
        }
        if self.password_len == 0 || self.password_len > u8::MAX as usize {
            return Err(ConfigError::InvalidFormat(format!(
                "password_len must be in 1..=255, got {}",
                self.password_len
            )));
        }
        Ok(())
    }
}

/// Identity the console stamps on outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionIds {
    pub system_id: u8,
    pub component_id: u8,
}

impl Default for SessionIds {
    fn default() -> Self {
        // Ground station system id, console component id
        Self {
            system_id: 255,
            component_id: 190,
        }
    }
}

/// Full bridge configuration, loadable from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub protocol: ProtocolConfig,
    pub session: SessionIds,
    /// Quiet period after the last network report before a refresh settles.
    pub refresh_quiet_period_ms: u64,
    /// Settings file; `None` uses the default location.
    pub settings_path: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolConfig::default(),
            session: SessionIds::default(),
            refresh_quiet_period_ms: DEFAULT_REFRESH_QUIET_PERIOD_MS,
            settings_path: None,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidFormat(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Parse configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        config.protocol.validate()?;
        Ok(config)
    }

    pub fn refresh_quiet_period(&self) -> Duration {
        Duration::from_millis(self.refresh_quiet_period_ms)
    }
}
