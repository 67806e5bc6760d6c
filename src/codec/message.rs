//! Protocol messages and their frame encoding.
//!
//! # Frame Format
//!
//! ```text
//! [message_id: 1 byte][system_id: 1 byte][component_id: 1 byte][payload: N bytes]
//! ```
//!
//! Payload layouts (widths from [`ProtocolConfig`]):
//!
//! | Message | Payload |
//! |---------|---------|
//! | network add | `ssid[ssid_len]`, `encryption_type: u8`, `password[password_len]` |
//! | network delete | `ssid[ssid_len]` |
//! | network connect | `ssid[ssid_len]` |
//! | access point config | `ssid[ssid_len]`, `password[password_len]` |
//! | status | `state: u8`, `ssid[ssid_len]` |
//! | network information | `type: u8`, `ssid[ssid_len]` |
//! | command | `target_component: u8`, `command: u16 LE`, `confirmation: u8`, `param1: f32 LE` |

use super::field::{decode_fixed_field, encode_fixed_field};
use super::CodecError;
use crate::config::{EncryptionKind, ProtocolConfig, SessionIds};
use std::fmt;
use zeroize::Zeroizing;

/// Header size in bytes (message id + system id + component id).
pub const HEADER_SIZE: usize = 3;

/// Command payload size in bytes.
pub const COMMAND_PAYLOAD_SIZE: usize = 1 + 2 + 1 + 4;

pub const MSG_ID_NETWORK_ADD: u8 = 1;
pub const MSG_ID_NETWORK_DELETE: u8 = 2;
pub const MSG_ID_NETWORK_CONNECT: u8 = 3;
pub const MSG_ID_CONFIGURE_AP: u8 = 4;
pub const MSG_ID_STATUS: u8 = 5;
pub const MSG_ID_NETWORK_INFO: u8 = 6;
pub const MSG_ID_COMMAND: u8 = 7;

/// A fixed-width field holding secret material.
///
/// Wiped on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretField(Zeroizing<Vec<u8>>);

impl SecretField {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretField(<{} bytes>)", self.0.len())
    }
}

/// Message payloads. Text fields hold their raw fixed-width wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Store a network profile on the device.
    NetworkAdd {
        ssid: Vec<u8>,
        encryption_type: u8,
        password: SecretField,
    },
    /// Delete a stored profile.
    NetworkDelete { ssid: Vec<u8> },
    /// Join a stored network as a client.
    NetworkConnect { ssid: Vec<u8> },
    /// Set the SSID and password the device uses when hosting.
    ConfigureAccessPoint { ssid: Vec<u8>, password: SecretField },
    /// Device report of its radio mode.
    Status { state: u8, ssid: Vec<u8> },
    /// Device report of one known network.
    NetworkInformation { network_type: u8, ssid: Vec<u8> },
}

impl Payload {
    /// Wire message id for this payload.
    pub fn message_id(&self) -> u8 {
        match self {
            Self::NetworkAdd { .. } => MSG_ID_NETWORK_ADD,
            Self::NetworkDelete { .. } => MSG_ID_NETWORK_DELETE,
            Self::NetworkConnect { .. } => MSG_ID_NETWORK_CONNECT,
            Self::ConfigureAccessPoint { .. } => MSG_ID_CONFIGURE_AP,
            Self::Status { .. } => MSG_ID_STATUS,
            Self::NetworkInformation { .. } => MSG_ID_NETWORK_INFO,
        }
    }

    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NetworkAdd { .. } => "network-add",
            Self::NetworkDelete { .. } => "network-delete",
            Self::NetworkConnect { .. } => "network-connect",
            Self::ConfigureAccessPoint { .. } => "access-point-config",
            Self::Status { .. } => "status",
            Self::NetworkInformation { .. } => "network-information",
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::NetworkAdd {
                ssid,
                encryption_type,
                password,
            } => {
                out.extend_from_slice(ssid);
                out.push(*encryption_type);
                out.extend_from_slice(password.as_bytes());
            }
            Self::NetworkDelete { ssid } | Self::NetworkConnect { ssid } => {
                out.extend_from_slice(ssid);
            }
            Self::ConfigureAccessPoint { ssid, password } => {
                out.extend_from_slice(ssid);
                out.extend_from_slice(password.as_bytes());
            }
            Self::Status { state, ssid } => {
                out.push(*state);
                out.extend_from_slice(ssid);
            }
            Self::NetworkInformation { network_type, ssid } => {
                out.push(*network_type);
                out.extend_from_slice(ssid);
            }
        }
    }
}

/// A protocol message with its sender identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub system_id: u8,
    pub component_id: u8,
    pub payload: Payload,
}

impl Message {
    pub fn new(session: SessionIds, payload: Payload) -> Self {
        Self {
            system_id: session.system_id,
            component_id: session.component_id,
            payload,
        }
    }

    /// Serialize to a frame (header + payload).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![self.payload.message_id(), self.system_id, self.component_id];
        self.payload.write_to(&mut bytes);
        bytes
    }
}

/// A command for a device component, as sent by the transport's command primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandRequest {
    pub system_id: u8,
    pub component_id: u8,
    pub target_component: u8,
    pub command: u16,
    /// Ask the device to acknowledge the command.
    pub confirmation: bool,
    pub param1: f32,
}

impl CommandRequest {
    pub fn new(
        session: SessionIds,
        target_component: u8,
        command: u16,
        confirmation: bool,
        param1: f32,
    ) -> Self {
        Self {
            system_id: session.system_id,
            component_id: session.component_id,
            target_component,
            command,
            confirmation,
            param1,
        }
    }

    /// Serialize to a frame (header + payload).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + COMMAND_PAYLOAD_SIZE);
        bytes.extend_from_slice(&[MSG_ID_COMMAND, self.system_id, self.component_id]);
        bytes.push(self.target_component);
        bytes.extend_from_slice(&self.command.to_le_bytes());
        bytes.push(u8::from(self.confirmation));
        bytes.extend_from_slice(&self.param1.to_le_bytes());
        bytes
    }

    fn from_payload(system_id: u8, component_id: u8, payload: &[u8]) -> Self {
        Self {
            system_id,
            component_id,
            target_component: payload[0],
            command: u16::from_le_bytes([payload[1], payload[2]]),
            confirmation: payload[3] != 0,
            param1: f32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]),
        }
    }
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Message(Message),
    Command(CommandRequest),
}

/// Decode one frame, checking the payload against the configured layout.
pub fn decode_frame(bytes: &[u8], protocol: &ProtocolConfig) -> Result<Frame, CodecError> {
    if bytes.len() < HEADER_SIZE {
        return Err(CodecError::TooShort { len: bytes.len() });
    }
    let (id, system_id, component_id) = (bytes[0], bytes[1], bytes[2]);
    let payload = &bytes[HEADER_SIZE..];
    let ssid_len = protocol.ssid_len;
    let password_len = protocol.password_len;

    let expected = match id {
        MSG_ID_NETWORK_ADD => ssid_len + 1 + password_len,
        MSG_ID_NETWORK_DELETE | MSG_ID_NETWORK_CONNECT => ssid_len,
        MSG_ID_CONFIGURE_AP => ssid_len + password_len,
        MSG_ID_STATUS | MSG_ID_NETWORK_INFO => 1 + ssid_len,
        MSG_ID_COMMAND => COMMAND_PAYLOAD_SIZE,
        other => return Err(CodecError::UnknownMessageId(other)),
    };
    if payload.len() != expected {
        return Err(CodecError::LengthMismatch {
            expected,
            actual: payload.len(),
        });
    }

    let payload = match id {
        MSG_ID_NETWORK_ADD => Payload::NetworkAdd {
            ssid: payload[..ssid_len].to_vec(),
            encryption_type: payload[ssid_len],
            password: SecretField::new(payload[ssid_len + 1..].to_vec()),
        },
        MSG_ID_NETWORK_DELETE => Payload::NetworkDelete {
            ssid: payload.to_vec(),
        },
        MSG_ID_NETWORK_CONNECT => Payload::NetworkConnect {
            ssid: payload.to_vec(),
        },
        MSG_ID_CONFIGURE_AP => Payload::ConfigureAccessPoint {
            ssid: payload[..ssid_len].to_vec(),
            password: SecretField::new(payload[ssid_len..].to_vec()),
        },
        MSG_ID_STATUS => Payload::Status {
            state: payload[0],
            ssid: payload[1..].to_vec(),
        },
        MSG_ID_NETWORK_INFO => Payload::NetworkInformation {
            network_type: payload[0],
            ssid: payload[1..].to_vec(),
        },
        _ => {
            return Ok(Frame::Command(CommandRequest::from_payload(
                system_id,
                component_id,
                payload,
            )))
        }
    };

    Ok(Frame::Message(Message {
        system_id,
        component_id,
        payload,
    }))
}

/// Build a message that stores a network profile on the device.
pub fn build_add_network_message(
    session: SessionIds,
    protocol: &ProtocolConfig,
    ssid: &str,
    kind: EncryptionKind,
    password: &str,
) -> Result<Message, CodecError> {
    let ssid = encode_fixed_field(ssid, protocol.ssid_len)?;
    let password = SecretField::new(encode_fixed_field(password, protocol.password_len)?);
    Ok(Message::new(
        session,
        Payload::NetworkAdd {
            ssid,
            encryption_type: kind.code(),
            password,
        },
    ))
}

/// Build a message that deletes a stored network profile.
pub fn build_remove_network_message(
    session: SessionIds,
    protocol: &ProtocolConfig,
    ssid: &str,
) -> Result<Message, CodecError> {
    let ssid = encode_fixed_field(ssid, protocol.ssid_len)?;
    Ok(Message::new(session, Payload::NetworkDelete { ssid }))
}

/// Build a message that makes the device join a stored network.
pub fn build_connect_network_message(
    session: SessionIds,
    protocol: &ProtocolConfig,
    ssid: &str,
) -> Result<Message, CodecError> {
    let ssid = encode_fixed_field(ssid, protocol.ssid_len)?;
    Ok(Message::new(session, Payload::NetworkConnect { ssid }))
}

/// Build a message that sets the device's own access point credentials.
pub fn build_configure_access_point_message(
    session: SessionIds,
    protocol: &ProtocolConfig,
    ssid: &str,
    password: &str,
) -> Result<Message, CodecError> {
    let ssid = encode_fixed_field(ssid, protocol.ssid_len)?;
    let password = SecretField::new(encode_fixed_field(password, protocol.password_len)?);
    Ok(Message::new(
        session,
        Payload::ConfigureAccessPoint { ssid, password },
    ))
}

/// Decoded status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Raw mode code; mapping to a mode is the state machine's job.
    pub mode_code: u8,
    pub ssid: String,
}

/// Decoded network-information report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfoReport {
    /// 0 denotes a station-mode (client-joinable) network.
    pub kind: u8,
    pub ssid: String,
}

impl NetworkInfoReport {
    pub fn is_station(&self) -> bool {
        self.kind == 0
    }
}

pub fn parse_status_message(message: &Message) -> Result<StatusReport, CodecError> {
    match &message.payload {
        Payload::Status { state, ssid } => Ok(StatusReport {
            mode_code: *state,
            ssid: decode_fixed_field(ssid)?,
        }),
        other => Err(CodecError::UnexpectedMessage {
            expected: "status",
            actual: other.name(),
        }),
    }
}

pub fn parse_network_info_message(message: &Message) -> Result<NetworkInfoReport, CodecError> {
    match &message.payload {
        Payload::NetworkInformation { network_type, ssid } => Ok(NetworkInfoReport {
            kind: *network_type,
            ssid: decode_fixed_field(ssid)?,
        }),
        other => Err(CodecError::UnexpectedMessage {
            expected: "network-information",
            actual: other.name(),
        }),
    }
}
