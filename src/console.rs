//! Operator console: command parsing and display formatting.
//!
//! # Commands
//!
//! - `ap` - Switch the device to access point mode
//! - `client <ssid>` - Join a saved network
//! - `save <ssid> <kind> [password]` - Store a network profile on the device
//! - `remove <ssid>` - Delete a stored profile
//! - `apconfig <ssid> <password>` - Set the device's own access point
//! - `status` - Ask the device for a status report
//! - `refresh` - Re-read the saved networks
//! - `default [ssid]` - Show or set the default network
//! - `list` / `scanned` - Show saved or scanned networks
//!
//! # Example Session
//!
//! ```text
//! > save HomeNet wpa2 secret123
//! [saved networks updated]
//! > list
//! Saved networks:
//!   [0] HomeNet
//! > client HomeNet
//! [mode: client]
//! [active network: HomeNet]
//! ```

use crate::bridge::{BridgeEvent, BridgeSnapshot};
use crate::config::EncryptionKind;
use crate::refresh::RefreshPhase;
use crate::service::Intent;
use zeroize::Zeroizing;

/// Parsed console command.
pub enum ConsoleCommand {
    AccessPoint,
    Client {
        ssid: String,
    },
    Save {
        ssid: String,
        kind: EncryptionKind,
        password: Zeroizing<String>,
    },
    Remove {
        ssid: String,
    },
    ApConfig {
        ssid: String,
        password: Zeroizing<String>,
    },
    Status,
    Refresh,
    /// Show the default network, or set it when a name is given.
    Default {
        ssid: Option<String>,
    },
    List,
    Scanned,
    Help,
    Quit,
    /// Unknown or invalid command, with the message to show.
    Unknown(String),
}

impl ConsoleCommand {
    /// Parse a command from an input line.
    pub fn parse(input: &str) -> Self {
        let mut parts = input.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Self::Unknown(String::new());
        };
        let args: Vec<&str> = parts.collect();

        match cmd.to_lowercase().as_str() {
            "ap" => Self::AccessPoint,
            "client" | "join" => match args.as_slice() {
                [ssid] => Self::Client {
                    ssid: ssid.to_string(),
                },
                _ => Self::Unknown("Usage: client <ssid>".to_string()),
            },
            "save" | "add" => match args.as_slice() {
                [ssid, kind, rest @ ..] if rest.len() <= 1 => match kind.parse() {
                    Ok(kind) => Self::Save {
                        ssid: ssid.to_string(),
                        kind,
                        password: Zeroizing::new(rest.first().unwrap_or(&"").to_string()),
                    },
                    Err(e) => Self::Unknown(format!("{}. Kinds: open, wep, wpa, wpa2", e)),
                },
                _ => Self::Unknown("Usage: save <ssid> <kind> [password]".to_string()),
            },
            "remove" | "rm" => match args.as_slice() {
                [ssid] => Self::Remove {
                    ssid: ssid.to_string(),
                },
                _ => Self::Unknown("Usage: remove <ssid>".to_string()),
            },
            "apconfig" => match args.as_slice() {
                [ssid, password] => Self::ApConfig {
                    ssid: ssid.to_string(),
                    password: Zeroizing::new(password.to_string()),
                },
                _ => Self::Unknown("Usage: apconfig <ssid> <password>".to_string()),
            },
            "status" | "s" => Self::Status,
            "refresh" | "r" => Self::Refresh,
            "default" => match args.as_slice() {
                [] => Self::Default { ssid: None },
                [ssid] => Self::Default {
                    ssid: Some(ssid.to_string()),
                },
                _ => Self::Unknown("Usage: default [ssid]".to_string()),
            },
            "list" | "ls" | "l" => Self::List,
            "scanned" => Self::Scanned,
            "help" | "h" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            _ => Self::Unknown(format!(
                "Unknown command: {}. Type 'help' for commands.",
                cmd
            )),
        }
    }

    /// The bridge request this command issues, if any.
    pub fn into_intent(self) -> Option<Intent> {
        match self {
            Self::AccessPoint => Some(Intent::BootAsAccessPoint),
            Self::Client { ssid } => Some(Intent::BootAsClient { ssid }),
            Self::Save {
                ssid,
                kind,
                password,
            } => Some(Intent::SaveNetwork {
                ssid,
                kind,
                password,
            }),
            Self::Remove { ssid } => Some(Intent::RemoveNetwork { ssid }),
            Self::ApConfig { ssid, password } => {
                Some(Intent::ConfigureAccessPoint { ssid, password })
            }
            Self::Status => Some(Intent::RequestStatus),
            Self::Refresh => Some(Intent::RefreshSavedNetworks),
            Self::Default { ssid: Some(name) } => Some(Intent::SetDefaultNetwork { name }),
            Self::Default { ssid: None }
            | Self::List
            | Self::Scanned
            | Self::Help
            | Self::Quit
            | Self::Unknown(_) => None,
        }
    }
}

/// Help text for available commands.
pub const HELP_TEXT: &str = r#"
Available commands:
  ap                             Switch the device to access point mode
  client <ssid>                  Join a saved network
  save <ssid> <kind> [password]  Store a network (kind: open, wep, wpa, wpa2)
  remove <ssid>                  Delete a stored network
  apconfig <ssid> <password>     Set the device's own access point
  status                         Request a status report
  refresh                        Re-read the saved networks
  default [ssid]                 Show or set the default network
  list                           Show saved networks
  scanned                        Show scanned networks
  help                           Show this help
  quit                           Exit

Shortcuts: s=status, r=refresh, l=list, h=help, q=quit
"#;

/// Format the device state.
pub fn format_status(snapshot: &BridgeSnapshot) -> String {
    let active = if snapshot.active_network.is_empty() {
        "-"
    } else {
        snapshot.active_network.as_str()
    };
    let default = if snapshot.default_network.is_empty() {
        "-"
    } else {
        snapshot.default_network.as_str()
    };
    format!(
        "Device Status:\n  Mode: {}\n  Active network: {}\n  Default network: {}\n  Saved networks: {}{}\n",
        snapshot.mode,
        active,
        default,
        snapshot.saved_networks.len(),
        match snapshot.refresh {
            RefreshPhase::Collecting => " (refreshing)",
            RefreshPhase::Idle | RefreshPhase::Settled => "",
        }
    )
}

/// Format the saved networks, marking the default with `*`.
pub fn format_saved_networks(snapshot: &BridgeSnapshot) -> String {
    if snapshot.saved_networks.is_empty() {
        return "No saved networks. Try 'refresh'.".to_string();
    }

    let mut output = String::from("Saved networks:\n");
    for (idx, ssid) in snapshot.saved_networks.iter().enumerate() {
        let marker = if *ssid == snapshot.default_network {
            " *"
        } else {
            ""
        };
        output.push_str(&format!("  [{}] {}{}\n", idx, ssid, marker));
    }
    output
}

/// Format the scanned networks with their encryption kinds.
pub fn format_scanned_networks(snapshot: &BridgeSnapshot) -> String {
    if snapshot.scanned_networks.is_empty() {
        return "No scanned networks.".to_string();
    }

    let mut output = String::from("Scanned networks:\n");
    for (idx, record) in snapshot.scanned_networks.iter().enumerate() {
        output.push_str(&format!("  [{}] {} ({})\n", idx, record.ssid, record.encryption));
    }
    output
}

/// Format a bridge notification for display.
pub fn format_event(event: &BridgeEvent) -> String {
    match event {
        BridgeEvent::SavedNetworksUpdated => "[saved networks updated]".to_string(),
        BridgeEvent::ModeChanged(mode) => format!("[mode: {}]", mode),
        BridgeEvent::ActiveNetworkChanged(name) if name.is_empty() => {
            "[active network: none]".to_string()
        }
        BridgeEvent::ActiveNetworkChanged(name) => format!("[active network: {}]", name),
        BridgeEvent::DefaultNetworkChanged(name) => format!("[default network: {}]", name),
        BridgeEvent::ScannedNetworksUpdated => "[scanned networks updated]".to_string(),
    }
}
