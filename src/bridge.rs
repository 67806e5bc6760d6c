//! Bridge controller.
//!
//! Turns operator intents into outbound messages and device reports into
//! updates of the saved-network list and the mode state machine. Everything
//! runs on one logical thread: operations never block, and the effect of a
//! request only shows up later as an independent inbound report.
//!
//! # Notifications
//!
//! Observers subscribe to a broadcast of [`BridgeEvent`]s. Row-level changes
//! of each list are available from the list itself
//! ([`NetworkList::subscribe`]).
//!
//! # Example
//!
//! ```ignore
//! let mut bridge = BridgeController::new(transport, JsonFileStore::open_default()?, &config);
//! let mut events = bridge.subscribe();
//!
//! bridge.save_network("HomeNet", EncryptionKind::Wpa2, "secret123")?;
//! // ... inbound frames from the link:
//! bridge.handle_frame(&datagram);
//! ```

use crate::codec::{
    self, decode_frame, parse_network_info_message, parse_status_message, CodecError,
    CommandRequest, Frame, Message, Payload,
};
use crate::config::{
    validate_password, validate_password_length, validate_ssid, BridgeConfig, ConfigError,
    EncryptionKind, NetworkCredentials, ProtocolConfig, SessionIds, ENCRYPTION_KIND_STRINGS,
};
use crate::mode::{DeviceMode, ModeError, ModeTracker, ModeUpdate};
use crate::network_list::{ListError, NetworkList, NetworkRecord};
use crate::refresh::{RefreshCycle, RefreshPhase};
use crate::settings::{PersistenceError, SettingsStore, DEFAULT_NETWORK_KEY};
use crate::transport::Transport;
use log::{debug, info, warn};
use std::fmt;
use std::time::Instant;
use tokio::sync::broadcast;

/// Capacity of the bridge event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// `param1` sent with every wireless command.
const COMMAND_PARAM: f32 = 1.0;

/// Change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    SavedNetworksUpdated,
    ModeChanged(DeviceMode),
    ActiveNetworkChanged(String),
    DefaultNetworkChanged(String),
    ScannedNetworksUpdated,
}

/// Errors surfaced to callers of bridge operations.
#[derive(Debug)]
pub enum BridgeError {
    /// Input rejected before anything was sent.
    InvalidInput(ConfigError),
    /// List index outside `[0, count)`.
    OutOfRange(ListError),
    /// Settings could not be written.
    Persistence(PersistenceError),
    /// Inbound message could not be decoded.
    Codec(CodecError),
    /// Inbound status report carried an invalid mode.
    Mode(ModeError),
    /// The service owning the controller has stopped.
    Stopped,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(e) => write!(f, "invalid input: {}", e),
            Self::OutOfRange(e) => write!(f, "{}", e),
            Self::Persistence(e) => write!(f, "persistence error: {}", e),
            Self::Codec(e) => write!(f, "malformed message: {}", e),
            Self::Mode(e) => write!(f, "malformed message: {}", e),
            Self::Stopped => write!(f, "bridge service stopped"),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidInput(e) => Some(e),
            Self::OutOfRange(e) => Some(e),
            Self::Persistence(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::Mode(e) => Some(e),
            Self::Stopped => None,
        }
    }
}

impl From<ConfigError> for BridgeError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidInput(e)
    }
}

impl From<ListError> for BridgeError {
    fn from(e: ListError) -> Self {
        Self::OutOfRange(e)
    }
}

impl From<PersistenceError> for BridgeError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}

impl From<CodecError> for BridgeError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<ModeError> for BridgeError {
    fn from(e: ModeError) -> Self {
        Self::Mode(e)
    }
}

/// Point-in-time copy of the bridge state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSnapshot {
    pub mode: DeviceMode,
    pub active_network: String,
    pub default_network: String,
    pub saved_networks: Vec<String>,
    pub scanned_networks: Vec<NetworkRecord>,
    pub refresh: RefreshPhase,
}

impl Default for BridgeSnapshot {
    fn default() -> Self {
        Self {
            mode: DeviceMode::Undefined,
            active_network: String::new(),
            default_network: String::new(),
            saved_networks: Vec::new(),
            scanned_networks: Vec::new(),
            refresh: RefreshPhase::Idle,
        }
    }
}

/// Mediates wireless configuration between the operator and the device.
pub struct BridgeController<T, S> {
    transport: T,
    settings: S,
    protocol: ProtocolConfig,
    session: SessionIds,
    saved_networks: NetworkList<String>,
    scanned_networks: NetworkList<NetworkRecord>,
    mode: ModeTracker,
    default_network: String,
    refresh: RefreshCycle,
    connection_lost: bool,
    events: broadcast::Sender<BridgeEvent>,
}

impl<T: Transport, S: SettingsStore> BridgeController<T, S> {
    /// Create a controller and load the default network from `settings`.
    pub fn new(transport: T, settings: S, config: &BridgeConfig) -> Self {
        let default_network = settings.get(DEFAULT_NETWORK_KEY).unwrap_or_default();
        if !default_network.is_empty() {
            info!("Default network: {}", default_network);
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            transport,
            settings,
            protocol: config.protocol,
            session: config.session,
            saved_networks: NetworkList::new(),
            scanned_networks: NetworkList::new(),
            mode: ModeTracker::new(),
            default_network,
            refresh: RefreshCycle::new(config.refresh_quiet_period()),
            connection_lost: false,
            events,
        }
    }

    /// Subscribe to change notifications. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    /// Sender side of the event channel, for handles that outlive a borrow.
    pub(crate) fn event_sender(&self) -> broadcast::Sender<BridgeEvent> {
        self.events.clone()
    }

    // ==================== Operator Requests ====================

    /// Ask the device to switch to access point mode.
    pub fn boot_as_access_point(&mut self) {
        info!("Requesting access point mode");
        self.send_wifi_command(self.protocol.commands.start_access_point, true);
    }

    /// Ask the device to join the stored network `ssid`.
    pub fn boot_as_client(&mut self, ssid: &str) -> Result<(), BridgeError> {
        validate_ssid(ssid, &self.protocol)?;
        let message = codec::build_connect_network_message(self.session, &self.protocol, ssid)?;
        info!("Requesting client mode on {}", ssid);
        self.transport.send_message(&message);
        Ok(())
    }

    /// Store a network profile on the device and refresh the saved list.
    pub fn save_network(
        &mut self,
        ssid: &str,
        kind: EncryptionKind,
        password: &str,
    ) -> Result<(), BridgeError> {
        let credentials = NetworkCredentials::new(ssid, kind, password, &self.protocol)?;
        let message = codec::build_add_network_message(
            self.session,
            &self.protocol,
            credentials.ssid(),
            credentials.kind(),
            credentials.password(),
        )?;
        info!("Saving network {} ({})", ssid, kind);
        self.transport.send_message(&message);
        self.refresh_saved_networks();
        Ok(())
    }

    /// Delete a network profile from the device and refresh the saved list.
    pub fn remove_network(&mut self, ssid: &str) -> Result<(), BridgeError> {
        validate_ssid(ssid, &self.protocol)?;
        let message = codec::build_remove_network_message(self.session, &self.protocol, ssid)?;
        info!("Removing network {}", ssid);
        self.transport.send_message(&message);
        self.refresh_saved_networks();
        Ok(())
    }

    /// Set the SSID and password the device hosts in access point mode.
    pub fn configure_access_point(&mut self, ssid: &str, password: &str) -> Result<(), BridgeError> {
        validate_ssid(ssid, &self.protocol)?;
        validate_password_length(password, &self.protocol)?;
        let message = codec::build_configure_access_point_message(
            self.session,
            &self.protocol,
            ssid,
            password,
        )?;
        info!("Configuring access point {}", ssid);
        self.transport.send_message(&message);
        Ok(())
    }

    /// Ask the device for a status report.
    pub fn request_status(&mut self) {
        debug!("Requesting status");
        self.send_wifi_command(self.protocol.commands.request_status, false);
    }

    /// Clear the saved list and ask the device to report its profiles.
    pub fn refresh_saved_networks(&mut self) {
        self.saved_networks.clear();
        self.refresh.start(Instant::now());
        debug!("Refreshing saved networks (cycle {})", self.refresh.generation());
        self.send_wifi_command(self.protocol.commands.request_networks, false);
        self.emit(BridgeEvent::SavedNetworksUpdated);
    }

    /// Persist the operator's preferred network.
    ///
    /// The in-memory value and the notification are updated even when the
    /// write fails; the failure is still returned.
    pub fn set_default_network(&mut self, name: &str) -> Result<(), BridgeError> {
        let result = self.settings.set(DEFAULT_NETWORK_KEY, name);
        if let Err(e) = &result {
            warn!("Failed to persist default network {}: {}", name, e);
        }
        self.default_network = name.to_string();
        self.emit(BridgeEvent::DefaultNetworkChanged(name.to_string()));
        result.map_err(BridgeError::from)
    }

    /// Replace the scanned networks list.
    pub fn set_scanned_networks(&mut self, records: impl IntoIterator<Item = NetworkRecord>) {
        self.scanned_networks.clear();
        for record in records {
            self.scanned_networks.append(record);
        }
        self.emit(BridgeEvent::ScannedNetworksUpdated);
    }

    // ==================== Inbound Reports ====================

    /// Decode a raw frame from the link and dispatch it.
    ///
    /// Malformed frames are logged and dropped.
    pub fn handle_frame(&mut self, bytes: &[u8]) {
        match decode_frame(bytes, &self.protocol) {
            Ok(Frame::Message(message)) => match message.payload {
                Payload::Status { .. } => self.on_status_message(&message),
                Payload::NetworkInformation { .. } => self.on_network_info_message(&message),
                ref other => debug!("Ignoring inbound {} message", other.name()),
            },
            Ok(Frame::Command(command)) => {
                debug!("Ignoring inbound command {}", command.command);
            }
            Err(e) => warn!("Dropping malformed frame ({} bytes): {}", bytes.len(), e),
        }
    }

    /// Apply a status report to the mode state machine.
    pub fn on_status_message(&mut self, message: &Message) {
        match self.apply_status(message) {
            Ok(update) => self.emit_mode_update(update),
            Err(e) => warn!("Dropping status report: {}", e),
        }
    }

    /// Append a station network report to the saved list.
    pub fn on_network_info_message(&mut self, message: &Message) {
        let report = match parse_network_info_message(message) {
            Ok(report) => report,
            Err(e) => {
                warn!("Dropping network report: {}", e);
                return;
            }
        };
        if !report.is_station() {
            debug!("Ignoring network {} of type {}", report.ssid, report.kind);
            return;
        }
        if !self.refresh.accept_report(Instant::now()) {
            debug!("Ignoring network {} reported after refresh settled", report.ssid);
            return;
        }
        if self.saved_networks.contains(&report.ssid) {
            debug!("Ignoring duplicate network {}", report.ssid);
            return;
        }

        debug!("Saved network reported: {}", report.ssid);
        self.saved_networks.append(report.ssid);
        self.emit(BridgeEvent::SavedNetworksUpdated);
    }

    /// Track link state. Losing the link resets the mode; regaining it
    /// re-requests status and the saved list.
    pub fn on_connection_lost(&mut self, lost: bool) {
        if lost == self.connection_lost {
            return;
        }
        self.connection_lost = lost;
        if lost {
            warn!("Connection to device lost");
            let update = self.mode.reset();
            self.emit_mode_update(update);
        } else {
            info!("Connection to device restored");
            self.request_status();
            self.refresh_saved_networks();
        }
    }

    /// Settle the saved-network refresh once the device has gone quiet.
    pub fn poll_refresh(&mut self, now: Instant) {
        if self.refresh.poll(now) {
            info!(
                "Saved network refresh complete: {} network(s)",
                self.saved_networks.count()
            );
            self.emit(BridgeEvent::SavedNetworksUpdated);
        }
    }

    // ==================== Accessors ====================

    pub fn saved_networks(&self) -> &NetworkList<String> {
        &self.saved_networks
    }

    pub fn saved_network(&self, index: usize) -> Result<&str, BridgeError> {
        Ok(self.saved_networks.get(index)?.as_str())
    }

    pub fn saved_networks_contains(&self, ssid: &str) -> bool {
        self.saved_networks.contains(ssid)
    }

    pub fn scanned_networks(&self) -> &NetworkList<NetworkRecord> {
        &self.scanned_networks
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode.mode()
    }

    pub fn active_network(&self) -> &str {
        self.mode.active_network()
    }

    pub fn default_network(&self) -> &str {
        &self.default_network
    }

    pub fn refresh_phase(&self) -> RefreshPhase {
        self.refresh.phase()
    }

    pub fn is_connection_lost(&self) -> bool {
        self.connection_lost
    }

    pub fn ssid_max_length(&self) -> usize {
        self.protocol.ssid_len
    }

    pub fn password_max_length(&self) -> usize {
        self.protocol.password_len
    }

    /// Component id of the device's wireless module.
    pub fn component_id(&self) -> u8 {
        self.protocol.wifi_component_id
    }

    pub fn encryption_kind_strings(&self) -> &'static [&'static str] {
        &ENCRYPTION_KIND_STRINGS
    }

    /// Check a password against the wire bound and the rules of `kind`.
    pub fn validate_password(&self, password: &str, kind: EncryptionKind) -> Result<(), BridgeError> {
        Ok(validate_password(password, kind, &self.protocol)?)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot {
            mode: self.mode(),
            active_network: self.active_network().to_string(),
            default_network: self.default_network.clone(),
            saved_networks: self.saved_networks.as_slice().to_vec(),
            scanned_networks: self.scanned_networks.as_slice().to_vec(),
            refresh: self.refresh.phase(),
        }
    }

    // ==================== Internals ====================

    fn apply_status(&mut self, message: &Message) -> Result<ModeUpdate, BridgeError> {
        let report = parse_status_message(message)?;
        let update = self.mode.apply_report(report.mode_code, &report.ssid)?;
        info!(
            "Device mode: {}{}",
            self.mode.mode(),
            if self.mode.active_network().is_empty() {
                String::new()
            } else {
                format!(" ({})", self.mode.active_network())
            }
        );
        Ok(update)
    }

    fn emit_mode_update(&self, update: ModeUpdate) {
        self.emit(BridgeEvent::ModeChanged(self.mode.mode()));
        if update.active_network_changed {
            self.emit(BridgeEvent::ActiveNetworkChanged(
                self.mode.active_network().to_string(),
            ));
        }
    }

    fn send_wifi_command(&mut self, command: u16, confirmation: bool) {
        let request = CommandRequest::new(
            self.session,
            self.protocol.wifi_component_id,
            command,
            confirmation,
            COMMAND_PARAM,
        );
        self.transport.send_command(&request);
    }

    fn emit(&self, event: BridgeEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_fixed_field, MSG_ID_NETWORK_INFO, MSG_ID_STATUS};
    use crate::settings::{JsonFileStore, MemoryStore};
    use crate::transport::RecordingTransport;
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;

    type TestBridge = BridgeController<RecordingTransport, MemoryStore>;

    fn bridge() -> TestBridge {
        BridgeController::new(
            RecordingTransport::default(),
            MemoryStore::new(),
            &BridgeConfig::default(),
        )
    }

    fn status_frame(state: u8, ssid: &str) -> Vec<u8> {
        let mut bytes = vec![MSG_ID_STATUS, 1, 200, state];
        bytes.extend(encode_fixed_field(ssid, ProtocolConfig::default().ssid_len).unwrap());
        bytes
    }

    fn info_frame(network_type: u8, ssid: &str) -> Vec<u8> {
        let mut bytes = vec![MSG_ID_NETWORK_INFO, 1, 200, network_type];
        bytes.extend(encode_fixed_field(ssid, ProtocolConfig::default().ssid_len).unwrap());
        bytes
    }

    fn drain(rx: &mut broadcast::Receiver<BridgeEvent>) -> Vec<BridgeEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return events,
                Err(e) => panic!("unexpected receive error: {:?}", e),
            }
        }
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    // ==================== Outbound Tests ====================

    #[test]
    fn test_save_network_scenario() {
        let mut bridge = bridge();
        bridge.handle_frame(&info_frame(0, "Stale"));
        let mut rx = bridge.subscribe();

        bridge.save_network("HomeNet", EncryptionKind::Wpa2, "secret123").unwrap();

        let sent = &bridge.transport().messages;
        assert_eq!(sent.len(), 1);
        let Payload::NetworkAdd {
            ssid,
            encryption_type,
            password,
        } = &sent[0].payload
        else {
            panic!("Expected network-add message");
        };
        assert_eq!(ssid, &encode_fixed_field("HomeNet", 32).unwrap());
        assert_eq!(*encryption_type, 3);
        assert_eq!(password.as_bytes(), &encode_fixed_field("secret123", 64).unwrap()[..]);

        // Refresh triggered: list cleared and networks requested
        assert_eq!(bridge.saved_networks().count(), 0);
        assert_eq!(bridge.refresh_phase(), RefreshPhase::Collecting);
        let commands = &bridge.transport().commands;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command, ProtocolConfig::default().commands.request_networks);
        assert_eq!(commands[0].target_component, bridge.component_id());
        assert_eq!(drain(&mut rx), vec![BridgeEvent::SavedNetworksUpdated]);
    }

    #[test]
    fn test_oversized_input_rejected_before_sending() {
        let mut bridge = bridge();
        let long_ssid = "s".repeat(33);
        let long_password = "p".repeat(65);

        assert!(matches!(
            bridge.save_network(&long_ssid, EncryptionKind::Open, ""),
            Err(BridgeError::InvalidInput(ConfigError::SsidTooLong { len: 33, max: 32 }))
        ));
        assert!(matches!(
            bridge.save_network("Net", EncryptionKind::Wpa2, &long_password),
            Err(BridgeError::InvalidInput(ConfigError::PasswordTooLong { len: 65, max: 64 }))
        ));
        assert!(matches!(
            bridge.remove_network(&long_ssid),
            Err(BridgeError::InvalidInput(_))
        ));
        assert!(matches!(
            bridge.boot_as_client(&long_ssid),
            Err(BridgeError::InvalidInput(_))
        ));
        assert!(matches!(
            bridge.configure_access_point("Edge", &long_password),
            Err(BridgeError::InvalidInput(_))
        ));

        assert!(bridge.transport().messages.is_empty());
        assert!(bridge.transport().commands.is_empty());
        assert_eq!(bridge.refresh_phase(), RefreshPhase::Idle);
    }

    #[test]
    fn test_remove_network_triggers_refresh() {
        let mut bridge = bridge();
        bridge.remove_network("Old").unwrap();
        assert!(matches!(
            bridge.transport().messages[0].payload,
            Payload::NetworkDelete { .. }
        ));
        assert_eq!(bridge.transport().commands.len(), 1);
        assert_eq!(bridge.refresh_phase(), RefreshPhase::Collecting);
    }

    #[test]
    fn test_empty_ssid_is_within_bound() {
        let mut bridge = bridge();
        bridge.remove_network("").unwrap();

        let sent = &bridge.transport().messages;
        assert_eq!(sent.len(), 1);
        let Payload::NetworkDelete { ssid } = &sent[0].payload else {
            panic!("Expected network-delete message");
        };
        assert_eq!(ssid, &vec![0u8; bridge.ssid_max_length()]);
        assert_eq!(bridge.refresh_phase(), RefreshPhase::Collecting);

        bridge.boot_as_client("").unwrap();
        assert!(matches!(
            bridge.transport().messages[1].payload,
            Payload::NetworkConnect { .. }
        ));
    }

    #[test]
    fn test_configure_access_point_sends_one_message() {
        let mut bridge = bridge();
        bridge.configure_access_point("EdgeAP", "edgepass1").unwrap();

        let sent = &bridge.transport().messages;
        assert_eq!(sent.len(), 1);
        let Payload::ConfigureAccessPoint { ssid, password } = &sent[0].payload else {
            panic!("Expected access-point-config message");
        };
        assert_eq!(ssid, &encode_fixed_field("EdgeAP", 32).unwrap());
        assert_eq!(password.as_bytes(), &encode_fixed_field("edgepass1", 64).unwrap()[..]);

        // No list refresh for access point settings
        assert!(bridge.transport().commands.is_empty());
        assert_eq!(bridge.refresh_phase(), RefreshPhase::Idle);
    }

    #[test]
    fn test_boot_commands() {
        let mut bridge = bridge();
        let commands = ProtocolConfig::default().commands;

        bridge.boot_as_access_point();
        bridge.request_status();
        bridge.boot_as_client("Office").unwrap();

        let sent = &bridge.transport().commands;
        assert_eq!(sent[0].command, commands.start_access_point);
        assert!(sent[0].confirmation);
        assert_eq!(sent[1].command, commands.request_status);
        assert!(!sent[1].confirmation);
        assert!(matches!(
            bridge.transport().messages[0].payload,
            Payload::NetworkConnect { .. }
        ));
        // Status is only ever changed by reports
        assert_eq!(bridge.mode(), DeviceMode::Undefined);
    }

    // ==================== Inbound Tests ====================

    #[test]
    fn test_status_report_scenario() {
        let mut bridge = bridge();
        let mut rx = bridge.subscribe();

        bridge.handle_frame(&status_frame(1, "OfficeAP"));

        assert_eq!(bridge.mode(), DeviceMode::Client);
        assert_eq!(bridge.active_network(), "OfficeAP");
        assert_eq!(
            drain(&mut rx),
            vec![
                BridgeEvent::ModeChanged(DeviceMode::Client),
                BridgeEvent::ActiveNetworkChanged("OfficeAP".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_status_is_dropped() {
        let mut bridge = bridge();
        bridge.handle_frame(&status_frame(1, "OfficeAP"));
        let mut rx = bridge.subscribe();

        bridge.handle_frame(&status_frame(42, ""));
        let mut truncated = status_frame(0, "");
        truncated.truncate(10);
        bridge.handle_frame(&truncated);
        bridge.handle_frame(&[]);

        assert_eq!(bridge.mode(), DeviceMode::Client);
        assert_eq!(bridge.active_network(), "OfficeAP");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_network_info_scenario() {
        let mut bridge = bridge();
        bridge.refresh_saved_networks();

        bridge.handle_frame(&info_frame(0, "A"));
        bridge.handle_frame(&info_frame(1, "B"));
        bridge.handle_frame(&info_frame(0, "C"));

        assert_eq!(bridge.saved_networks().as_slice(), ["A", "C"]);
        assert!(bridge.saved_networks_contains("C"));
        assert!(!bridge.saved_networks_contains("B"));
        assert_eq!(bridge.saved_network(1).unwrap(), "C");
        assert!(matches!(
            bridge.saved_network(2),
            Err(BridgeError::OutOfRange(ListError::OutOfRange { index: 2, count: 2 }))
        ));
    }

    #[test]
    fn test_refresh_clears_before_new_cycle() {
        let mut bridge = bridge();
        bridge.refresh_saved_networks();
        bridge.handle_frame(&info_frame(0, "A"));
        bridge.handle_frame(&info_frame(0, "B"));

        bridge.refresh_saved_networks();
        assert_eq!(bridge.saved_networks().count(), 0);
        bridge.handle_frame(&info_frame(0, "B"));
        assert_eq!(bridge.saved_networks().as_slice(), ["B"]);
    }

    #[test]
    fn test_duplicate_reports_within_cycle_ignored() {
        let mut bridge = bridge();
        bridge.refresh_saved_networks();
        bridge.handle_frame(&info_frame(0, "A"));
        bridge.handle_frame(&info_frame(0, "A"));
        assert_eq!(bridge.saved_networks().as_slice(), ["A"]);
    }

    #[test]
    fn test_refresh_settles_and_drops_late_reports() {
        let mut bridge = bridge();
        bridge.refresh_saved_networks();
        bridge.handle_frame(&info_frame(0, "A"));
        let mut rx = bridge.subscribe();

        bridge.poll_refresh(later());
        assert_eq!(bridge.refresh_phase(), RefreshPhase::Settled);
        assert_eq!(drain(&mut rx), vec![BridgeEvent::SavedNetworksUpdated]);

        bridge.handle_frame(&info_frame(0, "Late"));
        assert_eq!(bridge.saved_networks().as_slice(), ["A"]);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_unsolicited_reports_accepted_before_first_refresh() {
        let mut bridge = bridge();
        bridge.handle_frame(&info_frame(0, "A"));
        assert_eq!(bridge.saved_networks().as_slice(), ["A"]);
        assert_eq!(bridge.refresh_phase(), RefreshPhase::Collecting);
    }

    #[test]
    fn test_mode_invariant_through_bridge() {
        let mut bridge = bridge();
        for (state, ssid) in [(1, "A"), (3, "A"), (1, "B"), (9, "C"), (0, "B"), (1, "")] {
            bridge.handle_frame(&status_frame(state, ssid));
            assert_eq!(
                bridge.active_network().is_empty(),
                bridge.mode() != DeviceMode::Client
            );
        }
    }

    // ==================== Default Network Tests ====================

    #[test]
    fn test_default_network_loaded_at_startup() {
        let bridge = BridgeController::new(
            RecordingTransport::default(),
            MemoryStore::with_value(DEFAULT_NETWORK_KEY, "HomeNet"),
            &BridgeConfig::default(),
        );
        assert_eq!(bridge.default_network(), "HomeNet");
    }

    #[test]
    fn test_default_network_persists_across_sessions() {
        let dir = std::env::temp_dir().join(format!(
            "wifi-bridge-bridge-test-{}",
            std::process::id()
        ));
        let path = dir.join("settings.json");

        let mut first = BridgeController::new(
            RecordingTransport::default(),
            JsonFileStore::open(&path),
            &BridgeConfig::default(),
        );
        let mut rx = first.subscribe();
        first.set_default_network("HomeNet").unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![BridgeEvent::DefaultNetworkChanged("HomeNet".to_string())]
        );
        drop(first);

        let second = BridgeController::new(
            RecordingTransport::default(),
            JsonFileStore::open(&path),
            &BridgeConfig::default(),
        );
        assert_eq!(second.default_network(), "HomeNet");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_network_write_failure_still_updates_locally() {
        let mut store = MemoryStore::new();
        store.fail_writes(true);
        let mut bridge =
            BridgeController::new(RecordingTransport::default(), store, &BridgeConfig::default());
        let mut rx = bridge.subscribe();

        let result = bridge.set_default_network("HomeNet");
        assert!(matches!(result, Err(BridgeError::Persistence(_))));
        assert_eq!(bridge.default_network(), "HomeNet");
        assert_eq!(
            drain(&mut rx),
            vec![BridgeEvent::DefaultNetworkChanged("HomeNet".to_string())]
        );
    }

    // ==================== Connection and Scan Tests ====================

    #[test]
    fn test_connection_lost_and_restored() {
        let mut bridge = bridge();
        bridge.handle_frame(&status_frame(1, "OfficeAP"));
        let mut rx = bridge.subscribe();

        bridge.on_connection_lost(true);
        assert!(bridge.is_connection_lost());
        assert_eq!(bridge.mode(), DeviceMode::Undefined);
        assert_eq!(bridge.active_network(), "");
        assert_eq!(
            drain(&mut rx),
            vec![
                BridgeEvent::ModeChanged(DeviceMode::Undefined),
                BridgeEvent::ActiveNetworkChanged(String::new()),
            ]
        );

        // Repeated loss notifications are ignored
        bridge.on_connection_lost(true);
        assert!(drain(&mut rx).is_empty());
        assert!(bridge.transport().commands.is_empty());

        bridge.on_connection_lost(false);
        let commands = ProtocolConfig::default().commands;
        let sent: Vec<u16> = bridge.transport().commands.iter().map(|c| c.command).collect();
        assert_eq!(sent, vec![commands.request_status, commands.request_networks]);
    }

    #[test]
    fn test_set_scanned_networks() {
        let mut bridge = bridge();
        let mut rows = bridge.scanned_networks().subscribe();
        let mut rx = bridge.subscribe();

        bridge.set_scanned_networks(vec![
            NetworkRecord::new("Cafe", EncryptionKind::Open),
            NetworkRecord::new("Office", EncryptionKind::Wpa2),
        ]);
        bridge.set_scanned_networks(vec![NetworkRecord::new("Lab", EncryptionKind::Wpa)]);

        assert_eq!(bridge.scanned_networks().count(), 1);
        assert_eq!(bridge.scanned_networks().get(0).unwrap().ssid, "Lab");
        assert_eq!(
            drain(&mut rx),
            vec![
                BridgeEvent::ScannedNetworksUpdated,
                BridgeEvent::ScannedNetworksUpdated
            ]
        );
        // 2 inserts, 1 clear, 1 insert
        let mut row_events = 0;
        while rows.try_recv().is_ok() {
            row_events += 1;
        }
        assert_eq!(row_events, 4);
    }

    #[test]
    fn test_accessors() {
        let bridge = bridge();
        assert_eq!(bridge.ssid_max_length(), 32);
        assert_eq!(bridge.password_max_length(), 64);
        assert_eq!(bridge.encryption_kind_strings(), &["OPEN", "WEP", "WPA", "WPA2"]);
        assert!(bridge.validate_password("short", EncryptionKind::Wpa2).is_err());
        assert!(bridge.validate_password("longenough", EncryptionKind::Wpa2).is_ok());
    }
}
