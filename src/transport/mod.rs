//! Outbound message transport.
//!
//! The bridge hands whole messages to a [`Transport`] and never waits for a
//! result: delivery, framing, acknowledgement and retry belong to the link.
//! Inbound frames travel the other way through the service's channel.
//!
//! # Implementations
//!
//! | Transport | Notes |
//! |-----------|-------|
//! | [`UdpTransport`] | Datagram per frame, fire-and-forget sends |

mod udp;

pub use udp::{UdpTransport, MAX_DATAGRAM_SIZE};

use crate::codec::{CommandRequest, Message};
use std::fmt;
use std::io;

/// Outbound side of the device link.
pub trait Transport {
    /// Send one protocol message. No delivery result is surfaced.
    fn send_message(&mut self, message: &Message);

    /// Send a command to a device component.
    fn send_command(&mut self, command: &CommandRequest);
}

/// Transport setup errors.
#[derive(Debug)]
pub enum TransportError {
    /// Could not bind the local socket.
    Bind(io::Error),
    /// I/O error on an established socket.
    Io(io::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(e) => write!(f, "bind failed: {}", e),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind(e) | Self::Io(e) => Some(e),
        }
    }
}

/// Transport that records everything sent, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    pub messages: Vec<Message>,
    pub commands: Vec<CommandRequest>,
}

#[cfg(test)]
impl Transport for RecordingTransport {
    fn send_message(&mut self, message: &Message) {
        self.messages.push(message.clone());
    }

    fn send_command(&mut self, command: &CommandRequest) {
        self.commands.push(*command);
    }
}
