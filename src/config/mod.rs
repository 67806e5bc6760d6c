//! Bridge configuration.
//!
//! # Components
//!
//! - [`wifi`] - credential validation and encryption kinds
//! - [`protocol`] - device dialect constants and the loadable [`BridgeConfig`]

mod protocol;
mod wifi;

pub use protocol::{
    BridgeConfig, CommandIds, ProtocolConfig, SessionIds, DEFAULT_PASSWORD_LEN,
    DEFAULT_REFRESH_QUIET_PERIOD_MS, DEFAULT_SSID_LEN, DEFAULT_WIFI_COMPONENT_ID,
};
pub use wifi::{
    validate_password, validate_password_length, validate_ssid, ConfigError, EncryptionKind,
    NetworkCredentials, ENCRYPTION_KIND_STRINGS, MIN_WPA_PASSWORD_LEN,
};
