//! Device operating mode, as reported by the device.
//!
//! The console never sets the mode; it only applies status reports. Each
//! report's mode code maps to exactly one [`DeviceMode`], and unknown codes are
//! rejected rather than cast.
//!
//! Invariant: the active network name is non-empty if and only if the mode is
//! [`DeviceMode::Client`].

use std::fmt;

/// Radio operating mode of the remote device. Discriminants are wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DeviceMode {
    /// Hosting its own network.
    AccessPoint = 0,
    /// Joined to an existing network.
    Client = 1,
    /// No report received yet, or the link was lost.
    Undefined = 2,
    /// Moving between modes.
    Switching = 3,
}

impl DeviceMode {
    pub fn from_code(code: u8) -> Result<Self, ModeError> {
        match code {
            0 => Ok(Self::AccessPoint),
            1 => Ok(Self::Client),
            2 => Ok(Self::Undefined),
            3 => Ok(Self::Switching),
            other => Err(ModeError::UnknownModeCode(other)),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccessPoint => "access-point",
            Self::Client => "client",
            Self::Undefined => "undefined",
            Self::Switching => "switching",
        }
    }
}

impl TryFrom<u8> for DeviceMode {
    type Error = ModeError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeError {
    /// Mode code outside the known set.
    UnknownModeCode(u8),
    /// Client mode reported without a network name.
    MissingClientSsid,
}

impl fmt::Display for ModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownModeCode(code) => write!(f, "unknown mode code: {}", code),
            Self::MissingClientSsid => write!(f, "client mode reported without SSID"),
        }
    }
}

impl std::error::Error for ModeError {}

/// What an applied report changed.
///
/// The mode itself is re-announced after every applied report, so only the
/// active network carries a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the caller fires notifications from this"]
pub struct ModeUpdate {
    /// True when the active network name differs from before.
    pub active_network_changed: bool,
}

/// Mode state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTracker {
    mode: DeviceMode,
    active_network: String,
}

impl Default for ModeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeTracker {
    pub fn new() -> Self {
        Self {
            mode: DeviceMode::Undefined,
            active_network: String::new(),
        }
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    /// SSID the device is joined to; empty unless in client mode.
    pub fn active_network(&self) -> &str {
        &self.active_network
    }

    /// Apply a status report.
    ///
    /// A rejected report leaves the state untouched.
    pub fn apply_report(&mut self, mode_code: u8, ssid: &str) -> Result<ModeUpdate, ModeError> {
        let mode = DeviceMode::from_code(mode_code)?;
        if mode == DeviceMode::Client && ssid.is_empty() {
            return Err(ModeError::MissingClientSsid);
        }
        let active = if mode == DeviceMode::Client { ssid } else { "" };
        Ok(self.transition(mode, active))
    }

    /// Drop back to [`DeviceMode::Undefined`], e.g. when the link is lost.
    pub fn reset(&mut self) -> ModeUpdate {
        self.transition(DeviceMode::Undefined, "")
    }

    fn transition(&mut self, mode: DeviceMode, active: &str) -> ModeUpdate {
        let active_network_changed = self.active_network != active;
        self.mode = mode;
        if active_network_changed {
            self.active_network = active.to_string();
        }
        ModeUpdate {
            active_network_changed,
        }
    }
}
