//! Wireless network credential types.
//!
//! Platform-independent validation for the credentials the operator sends to
//! the remote device. Length bounds come from [`ProtocolConfig`] because the
//! wire field widths are fixed by the device's message definitions.
//!
//! # Example
//!
//! ```
//! use wifi_bridge::config::{EncryptionKind, NetworkCredentials, ProtocolConfig};
//!
//! let protocol = ProtocolConfig::default();
//! let creds = NetworkCredentials::new("HomeNet", EncryptionKind::Wpa2, "secret123", &protocol).unwrap();
//! assert_eq!(creds.ssid(), "HomeNet");
//!
//! let kind: EncryptionKind = "wpa2".parse().unwrap();
//! assert_eq!(kind, EncryptionKind::Wpa2);
//! ```

use super::protocol::ProtocolConfig;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Minimum passphrase length for WPA and WPA2.
pub const MIN_WPA_PASSWORD_LEN: usize = 8;

/// Valid WEP key lengths as ASCII characters (40-bit and 104-bit keys).
const WEP_ASCII_LENGTHS: [usize; 2] = [5, 13];

/// Valid WEP key lengths as hex digits.
const WEP_HEX_LENGTHS: [usize; 2] = [10, 26];

/// Display names for each encryption kind, indexed by wire code.
pub const ENCRYPTION_KIND_STRINGS: [&str; 4] = ["OPEN", "WEP", "WPA", "WPA2"];

/// Encryption used by a wireless network.
///
/// The discriminant is the wire code carried in the add-network message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EncryptionKind {
    Open = 0,
    Wep = 1,
    Wpa = 2,
    Wpa2 = 3,
}

impl EncryptionKind {
    /// All kinds in wire-code order.
    pub const ALL: [EncryptionKind; 4] = [Self::Open, Self::Wep, Self::Wpa, Self::Wpa2];

    /// Wire code for this kind.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Map a wire code back to a kind.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            1 => Some(Self::Wep),
            2 => Some(Self::Wpa),
            3 => Some(Self::Wpa2),
            _ => None,
        }
    }

    /// Display name shown to operators.
    pub fn as_str(self) -> &'static str {
        ENCRYPTION_KIND_STRINGS[self as usize]
    }
}

impl std::str::FromStr for EncryptionKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ConfigError::UnknownEncryptionKind(s.to_string()))
    }
}

impl fmt::Display for EncryptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check that an SSID fits the wire field.
pub fn validate_ssid(ssid: &str, protocol: &ProtocolConfig) -> Result<(), ConfigError> {
    if ssid.len() > protocol.ssid_len {
        return Err(ConfigError::SsidTooLong {
            len: ssid.len(),
            max: protocol.ssid_len,
        });
    }
    Ok(())
}

/// Check that a password fits the wire field. No per-kind rules.
pub fn validate_password_length(password: &str, protocol: &ProtocolConfig) -> Result<(), ConfigError> {
    if password.len() > protocol.password_len {
        return Err(ConfigError::PasswordTooLong {
            len: password.len(),
            max: protocol.password_len,
        });
    }
    Ok(())
}

/// Validate a password for the given encryption kind.
///
/// Applies the wire bound plus the usual per-kind rules. Open networks accept
/// any password within the bound since the device ignores it.
pub fn validate_password(
    password: &str,
    kind: EncryptionKind,
    protocol: &ProtocolConfig,
) -> Result<(), ConfigError> {
    validate_password_length(password, protocol)?;

    match kind {
        EncryptionKind::Open => Ok(()),
        EncryptionKind::Wep => {
            let len = password.len();
            let is_hex = password.bytes().all(|b| b.is_ascii_hexdigit());
            if WEP_ASCII_LENGTHS.contains(&len) || (is_hex && WEP_HEX_LENGTHS.contains(&len)) {
                Ok(())
            } else {
                Err(ConfigError::InvalidWepKey { len })
            }
        }
        EncryptionKind::Wpa | EncryptionKind::Wpa2 => {
            if password.len() < MIN_WPA_PASSWORD_LEN {
                Err(ConfigError::PasswordTooShort {
                    len: password.len(),
                    min: MIN_WPA_PASSWORD_LEN,
                })
            } else {
                Ok(())
            }
        }
    }
}

/// Credentials for a network profile stored on the device.
///
/// The password is wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct NetworkCredentials {
    ssid: String,
    #[zeroize(skip)]
    kind: EncryptionKind,
    password: String,
}

impl NetworkCredentials {
    /// Create credentials, checking both strings against the wire bounds.
    pub fn new(
        ssid: impl Into<String>,
        kind: EncryptionKind,
        password: impl Into<String>,
        protocol: &ProtocolConfig,
    ) -> Result<Self, ConfigError> {
        let creds = Self {
            ssid: ssid.into(),
            kind,
            password: password.into(),
        };
        creds.validate(protocol)?;
        Ok(creds)
    }

    /// Credentials for an open network (no password).
    pub fn open(ssid: impl Into<String>, protocol: &ProtocolConfig) -> Result<Self, ConfigError> {
        Self::new(ssid, EncryptionKind::Open, String::new(), protocol)
    }

    /// Validate against the wire bounds only.
    pub fn validate(&self, protocol: &ProtocolConfig) -> Result<(), ConfigError> {
        validate_ssid(&self.ssid, protocol)?;
        validate_password_length(&self.password, protocol)
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn kind(&self) -> EncryptionKind {
        self.kind
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Check if this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

impl fmt::Debug for NetworkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredentials")
            .field("ssid", &self.ssid)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Errors that can occur while validating operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// SSID exceeds the wire field width.
    SsidTooLong { len: usize, max: usize },
    /// Password is too short for WPA/WPA2.
    PasswordTooShort { len: usize, min: usize },
    /// Password exceeds the wire field width.
    PasswordTooLong { len: usize, max: usize },
    /// WEP key has an unsupported length or encoding.
    InvalidWepKey { len: usize },
    /// Unknown encryption kind name.
    UnknownEncryptionKind(String),
    /// Invalid data format in a configuration file.
    InvalidFormat(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::PasswordTooShort { len, min } => {
                write!(f, "password too short: {} bytes (min {})", len, min)
            }
            Self::PasswordTooLong { len, max } => {
                write!(f, "password too long: {} bytes (max {})", len, max)
            }
            Self::InvalidWepKey { len } => write!(
                f,
                "invalid WEP key: {} characters (expected 5 or 13, or 10 or 26 hex digits)",
                len
            ),
            Self::UnknownEncryptionKind(s) => write!(f, "unknown encryption kind: {}", s),
            Self::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn protocol() -> ProtocolConfig {
        ProtocolConfig::default()
    }

    // ==================== NetworkCredentials Tests ====================

    #[test]
    fn test_valid_credentials() {
        let creds =
            NetworkCredentials::new("TestNetwork", EncryptionKind::Wpa2, "password123", &protocol())
                .unwrap();
        assert_eq!(creds.ssid(), "TestNetwork");
        assert_eq!(creds.password(), "password123");
        assert_eq!(creds.kind(), EncryptionKind::Wpa2);
    }

    #[test]
    fn test_open_network() {
        let creds = NetworkCredentials::open("OpenNetwork", &protocol()).unwrap();
        assert!(creds.is_open());
        assert_eq!(creds.kind(), EncryptionKind::Open);
    }

    #[test]
    fn test_empty_ssid_within_bound() {
        assert_eq!(validate_ssid("", &protocol()), Ok(()));
        assert!(NetworkCredentials::open("", &protocol()).is_ok());
    }

    #[test]
    fn test_ssid_too_long() {
        let long_ssid = "a".repeat(protocol().ssid_len + 1);
        let result = NetworkCredentials::new(long_ssid, EncryptionKind::Wpa2, "password123", &protocol());
        assert!(matches!(result, Err(ConfigError::SsidTooLong { .. })));
    }

    #[test]
    fn test_ssid_max_length() {
        let max_ssid = "a".repeat(protocol().ssid_len);
        assert!(NetworkCredentials::open(max_ssid, &protocol()).is_ok());
    }

    #[test]
    fn test_ssid_bound_counts_utf8_bytes() {
        // 11 characters, 33 bytes
        let ssid = "ネットワーク名前です！";
        assert_eq!(ssid.len(), 33);
        let result = validate_ssid(ssid, &protocol());
        assert_eq!(result, Err(ConfigError::SsidTooLong { len: 33, max: 32 }));
    }

    #[test]
    fn test_password_too_long() {
        let long_password = "a".repeat(protocol().password_len + 1);
        let result = NetworkCredentials::new("TestNetwork", EncryptionKind::Wpa2, long_password, &protocol());
        assert!(matches!(result, Err(ConfigError::PasswordTooLong { .. })));
    }

    #[test]
    fn test_credentials_do_not_enforce_kind_rules() {
        // Wire bounds only; "short" would fail validate_password for WPA2
        assert!(NetworkCredentials::new("Net", EncryptionKind::Wpa2, "short", &protocol()).is_ok());
    }

    #[test]
    fn test_debug_hides_password() {
        let creds =
            NetworkCredentials::new("Net", EncryptionKind::Wpa, "hunter2hunter2", &protocol()).unwrap();
        let debug_str = format!("{:?}", creds);
        assert!(debug_str.contains("Net"));
        assert!(!debug_str.contains("hunter2"));
    }

    // ==================== Password Validation Tests ====================

    #[test]
    fn test_wpa_password_min_length() {
        assert!(validate_password("12345678", EncryptionKind::Wpa2, &protocol()).is_ok());
        assert_eq!(
            validate_password("1234567", EncryptionKind::Wpa, &protocol()),
            Err(ConfigError::PasswordTooShort { len: 7, min: 8 })
        );
    }

    #[test]
    fn test_wep_key_lengths() {
        let p = protocol();
        assert!(validate_password("abcde", EncryptionKind::Wep, &p).is_ok());
        assert!(validate_password("abcdefghijklm", EncryptionKind::Wep, &p).is_ok());
        assert!(validate_password("0123456789", EncryptionKind::Wep, &p).is_ok());
        assert!(validate_password("0123456789abcdef0123456789", EncryptionKind::Wep, &p).is_ok());
        assert_eq!(
            validate_password("abcdef", EncryptionKind::Wep, &p),
            Err(ConfigError::InvalidWepKey { len: 6 })
        );
        // Right length for hex but not hex digits
        assert!(validate_password("zzzzzzzzzz", EncryptionKind::Wep, &p).is_err());
    }

    #[test]
    fn test_open_accepts_any_password_within_bound() {
        let p = protocol();
        assert!(validate_password("", EncryptionKind::Open, &p).is_ok());
        assert!(validate_password("x", EncryptionKind::Open, &p).is_ok());
        let too_long = "a".repeat(p.password_len + 1);
        assert!(matches!(
            validate_password(&too_long, EncryptionKind::Open, &p),
            Err(ConfigError::PasswordTooLong { .. })
        ));
    }

    // ==================== EncryptionKind Tests ====================

    #[test]
    fn test_kind_codes() {
        assert_eq!(EncryptionKind::Open.code(), 0);
        assert_eq!(EncryptionKind::Wep.code(), 1);
        assert_eq!(EncryptionKind::Wpa.code(), 2);
        assert_eq!(EncryptionKind::Wpa2.code(), 3);
        for kind in EncryptionKind::ALL {
            assert_eq!(EncryptionKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(EncryptionKind::from_code(4), None);
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(EncryptionKind::Open.as_str(), "OPEN");
        assert_eq!(EncryptionKind::Wpa2.to_string(), "WPA2");
        assert_eq!(ENCRYPTION_KIND_STRINGS, ["OPEN", "WEP", "WPA", "WPA2"]);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!(EncryptionKind::from_str("wpa2").unwrap(), EncryptionKind::Wpa2);
        assert_eq!(EncryptionKind::from_str("  Open ").unwrap(), EncryptionKind::Open);
        assert!(matches!(
            EncryptionKind::from_str("wpa3"),
            Err(ConfigError::UnknownEncryptionKind(_))
        ));
    }
}
