//! Ordered network list with row change notification.
//!
//! The same container backs the saved networks (SSID strings reported by the
//! device) and the scanned networks (full [`NetworkRecord`]s). Observers
//! subscribe to a broadcast of [`ListEvent`]s; dropping the receiver
//! unsubscribes.
//!
//! Every mutation completes before its event is sent, so a reader never sees a
//! partially cleared list.

use crate::config::EncryptionKind;
use std::fmt;
use tokio::sync::broadcast;

/// Capacity of the row event channel. Slow observers see `Lagged` and should
/// re-read the list.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A network as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRecord {
    pub ssid: String,
    pub encryption: EncryptionKind,
}

impl NetworkRecord {
    pub fn new(ssid: impl Into<String>, encryption: EncryptionKind) -> Self {
        Self {
            ssid: ssid.into(),
            encryption,
        }
    }
}

/// Named accessors the presentation layer reads rows through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkRole {
    Ssid,
    EncryptionKind,
}

/// Row change, with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListEvent {
    RowsInserted { first: usize, last: usize },
    RowsRemoved { first: usize, last: usize },
}

/// Error for list access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// Index outside `[0, count)`.
    OutOfRange { index: usize, count: usize },
}

impl fmt::Display for ListError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { index, count } => {
                write!(f, "index {} out of range (count {})", index, count)
            }
        }
    }
}

impl std::error::Error for ListError {}

/// Append/clear list with change notification.
#[derive(Debug)]
pub struct NetworkList<T> {
    items: Vec<T>,
    events: broadcast::Sender<ListEvent>,
}

impl<T> NetworkList<T> {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            items: Vec::new(),
            events,
        }
    }

    /// Subscribe to row events. Drop the receiver to unsubscribe.
    pub fn subscribe(&self) -> broadcast::Receiver<ListEvent> {
        self.events.subscribe()
    }

    /// Append at the end and announce the new row.
    pub fn append(&mut self, item: T) {
        self.items.push(item);
        let row = self.items.len() - 1;
        // No receivers is fine
        let _ = self.events.send(ListEvent::RowsInserted {
            first: row,
            last: row,
        });
    }

    /// Remove every row, announced as a single event.
    ///
    /// Clearing an empty list sends nothing.
    pub fn clear(&mut self) {
        let count = self.items.len();
        if count == 0 {
            return;
        }
        self.items.clear();
        let _ = self.events.send(ListEvent::RowsRemoved {
            first: 0,
            last: count - 1,
        });
    }

    pub fn get(&self, index: usize) -> Result<&T, ListError> {
        self.items.get(index).ok_or(ListError::OutOfRange {
            index,
            count: self.items.len(),
        })
    }

    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for NetworkList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkList<NetworkRecord> {
    /// Read one role of a row as display text.
    pub fn data(&self, index: usize, role: NetworkRole) -> Result<String, ListError> {
        let record = self.get(index)?;
        Ok(match role {
            NetworkRole::Ssid => record.ssid.clone(),
            NetworkRole::EncryptionKind => record.encryption.as_str().to_string(),
        })
    }
}

impl NetworkList<String> {
    pub fn contains(&self, ssid: &str) -> bool {
        self.items.iter().any(|s| s == ssid)
    }
}
