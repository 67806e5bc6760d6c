//! Key-value settings persistence.
//!
//! The bridge only needs `get`/`set` on string keys. [`JsonFileStore`] keeps
//! them in a JSON object on disk, by default `~/.wifi-bridge/settings.json`.
//!
//! # Usage
//!
//! ```no_run
//! use wifi_bridge::settings::{JsonFileStore, SettingsStore};
//!
//! let mut store = JsonFileStore::open_default()?;
//! store.set("wifi.default_network", "HomeNet")?;
//! assert_eq!(store.get("wifi.default_network").as_deref(), Some("HomeNet"));
//! # Ok::<(), wifi_bridge::settings::PersistenceError>(())
//! ```

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Settings key holding the operator's preferred network.
pub const DEFAULT_NETWORK_KEY: &str = "wifi.default_network";

/// String key-value store the bridge persists its settings in.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value and flush it.
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// Settings store errors.
#[derive(Debug)]
pub enum PersistenceError {
    /// Filesystem error.
    Io(io::Error),
    /// Settings could not be encoded or decoded.
    Serialization(serde_json::Error),
    /// Data read back after a write did not match.
    VerificationFailed { path: PathBuf },
    /// Store cannot accept writes.
    Unavailable(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::Serialization(e) => write!(f, "serialization error: {}", e),
            Self::VerificationFailed { path } => {
                write!(f, "settings verification failed for {:?}", path)
            }
            Self::Unavailable(reason) => write!(f, "settings store unavailable: {}", reason),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PersistenceError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

/// Get the default settings file path.
///
/// Returns `~/.wifi-bridge/settings.json`
pub fn default_settings_path() -> io::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| io::Error::new(io::ErrorKind::NotFound, "HOME not set"))?;
    Ok(PathBuf::from(home).join(".wifi-bridge").join("settings.json"))
}

/// Settings persisted as a JSON object of strings.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing or corrupted file yields an empty store; the next write
    /// replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(values) => values,
                Err(e) => {
                    warn!("Ignoring corrupted settings file {:?}: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No settings file found at {:?}", path);
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Failed to read settings file {:?}: {}", path, e);
                BTreeMap::new()
            }
        };
        Self { path, values }
    }

    /// Open the store at the default path.
    pub fn open_default() -> Result<Self, PersistenceError> {
        Ok(Self::open(default_settings_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let text = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, &text)?;

        // Verify write by reading back
        let read_back = fs::read_to_string(&self.path)?;
        if read_back != text {
            return Err(PersistenceError::VerificationFailed {
                path: self.path.clone(),
            });
        }

        info!("Settings saved to {:?}", self.path);
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.values.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// In-memory store, optionally failing every write.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with one value.
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_string(), value.to_string());
        store
    }

    /// Make every subsequent `set` fail with [`PersistenceError::Unavailable`].
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if self.fail_writes {
            return Err(PersistenceError::Unavailable("writes disabled".to_string()));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Counter to ensure unique test files even in parallel execution
    static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn unique_settings_path() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let pid = std::process::id();
        env::temp_dir()
            .join(format!("wifi-bridge-test-{}-{}", pid, id))
            .join("settings.json")
    }

    #[test]
    fn test_file_store_roundtrip() {
        let path = unique_settings_path();

        let mut store = JsonFileStore::open(&path);
        assert_eq!(store.get(DEFAULT_NETWORK_KEY), None);
        store.set(DEFAULT_NETWORK_KEY, "HomeNet").expect("Failed to save");

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get(DEFAULT_NETWORK_KEY).as_deref(), Some("HomeNet"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_file_store_keeps_other_keys() {
        let path = unique_settings_path();

        let mut store = JsonFileStore::open(&path);
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.set("a", "3").unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("a").as_deref(), Some("3"));
        assert_eq!(reopened.get("b").as_deref(), Some("2"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_corrupted_file_opens_empty() {
        let path = unique_settings_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::open(&path);
        assert_eq!(store.get(DEFAULT_NETWORK_KEY), None);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_memory_store_write_failure() {
        let mut store = MemoryStore::with_value(DEFAULT_NETWORK_KEY, "Old");
        store.fail_writes(true);
        assert!(matches!(
            store.set(DEFAULT_NETWORK_KEY, "New"),
            Err(PersistenceError::Unavailable(_))
        ));
        assert_eq!(store.get(DEFAULT_NETWORK_KEY).as_deref(), Some("Old"));
    }
}
