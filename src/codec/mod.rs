//! Wire codec for the device's wireless configuration messages.
//!
//! Pure functions only: text to fixed-width fields and back, message
//! construction for operator requests, and parsing of device reports. The
//! codec owns no transport addressing; callers pass the [`SessionIds`] the
//! messages are stamped with.
//!
//! [`SessionIds`]: crate::config::SessionIds

mod field;
mod message;

pub use field::{decode_fixed_field, encode_fixed_field};
pub use message::{
    build_add_network_message, build_configure_access_point_message, build_connect_network_message,
    build_remove_network_message, decode_frame, parse_network_info_message, parse_status_message,
    CommandRequest, Frame, Message, NetworkInfoReport, Payload, SecretField, StatusReport,
    COMMAND_PAYLOAD_SIZE, HEADER_SIZE, MSG_ID_COMMAND, MSG_ID_CONFIGURE_AP, MSG_ID_NETWORK_ADD,
    MSG_ID_NETWORK_CONNECT, MSG_ID_NETWORK_DELETE, MSG_ID_NETWORK_INFO, MSG_ID_STATUS,
};

use std::fmt;

/// Errors produced while encoding or decoding messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Text does not fit its fixed-width field.
    FieldTooLong { len: usize, max: usize },
    /// Field content is not valid UTF-8.
    InvalidUtf8,
    /// Frame is shorter than the header.
    TooShort { len: usize },
    /// Payload length does not match the configured layout.
    LengthMismatch { expected: usize, actual: usize },
    /// Frame carries a message id this codec does not know.
    UnknownMessageId(u8),
    /// A parser was handed the wrong kind of message.
    UnexpectedMessage {
        expected: &'static str,
        actual: &'static str,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldTooLong { len, max } => {
                write!(f, "field too long: {} bytes (max {})", len, max)
            }
            Self::InvalidUtf8 => write!(f, "field is not valid UTF-8"),
            Self::TooShort { len } => {
                write!(f, "frame too short: {} bytes (header is {})", len, HEADER_SIZE)
            }
            Self::LengthMismatch { expected, actual } => write!(
                f,
                "payload length mismatch: expected {} bytes, got {}",
                expected, actual
            ),
            Self::UnknownMessageId(id) => write!(f, "unknown message id: {}", id),
            Self::UnexpectedMessage { expected, actual } => {
                write!(f, "expected {} message, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for CodecError {}
