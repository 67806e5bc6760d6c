//! Wireless network configuration bridge.
//!
//! Lets an operator console configure the radio of a remote device over a
//! message link: switch it between access point and client mode, manage the
//! network profiles it stores, and observe the mode and network it reports.
//!
//! The pieces, bottom-up:
//!
//! - [`codec`] - fixed-width text fields and the wire messages
//! - [`network_list`] - ordered lists with row change events
//! - [`mode`] - the reported mode state machine
//! - [`bridge`] - the controller tying requests and reports together
//! - [`service`] - async task owning the controller
//! - [`transport`] / [`settings`] - the link and the persistent settings

pub mod bridge;
pub mod codec;
pub mod config;
pub mod console;
pub mod mode;
pub mod network_list;
pub mod refresh;
pub mod service;
pub mod settings;
pub mod transport;

// Re-export commonly used items
pub use bridge::{BridgeController, BridgeError, BridgeEvent, BridgeSnapshot};
pub use codec::{CodecError, CommandRequest, Message, Payload};
pub use config::{BridgeConfig, ConfigError, EncryptionKind, ProtocolConfig, SessionIds};
pub use mode::{DeviceMode, ModeError};
pub use network_list::{ListError, ListEvent, NetworkList, NetworkRecord, NetworkRole};
pub use refresh::RefreshPhase;
pub use service::{BridgeHandle, BridgeService, Intent};
pub use settings::{JsonFileStore, MemoryStore, PersistenceError, SettingsStore};
pub use transport::{Transport, TransportError, UdpTransport};
