//! The bag: an ordered, immutable log of timestamped messages.
//!
//! All structural edits return a new `Bag`; the receiver is never changed.
//! The central invariant is that messages are in non-decreasing timestamp
//! order after every edit.  Edits that cannot preserve the invariant
//! ([`Bag::replace`], [`Bag::swap`]) are rejected rather than re-sorted:
//! re-sorting would silently undo the edit, which is worse than failing.

use crate::codec;
use crate::message::{Message, Timestamp};
use crate::schema::{TopicFilter, TypeRegistry};
use log::debug;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Errors from bag operations.
#[derive(Debug, Error)]
pub enum BagError {
    /// An index-based edit addressed a message that does not exist.
    #[error("message index {index} out of range (bag holds {len} messages)")]
    OutOfRange {
        /// The offending index.
        index: usize,
        /// Number of messages in the bag.
        len: usize,
    },

    /// An edit would break the non-decreasing timestamp invariant.
    #[error("edit at index {index} would break timestamp ordering")]
    OrderViolation {
        /// Index at which the violation was detected.
        index: usize,
    },

    /// A bag file could not be read or written.
    #[error("I/O error on bag file {path}")]
    Io {
        /// The file involved.
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A bag file's contents were malformed or failed schema validation.
    #[error("malformed bag file {path}: {reason}")]
    Format {
        /// The file involved.
        path: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// An ordered, immutable sequence of timestamped messages.
///
/// Bags are cheap to clone and share: the message storage sits behind an
/// `Arc`, and every edit builds fresh storage for the result.
#[derive(Debug, Clone)]
pub struct Bag {
    messages: Arc<[Message]>,
}

impl Bag {
    /// Build a bag from messages already in non-decreasing timestamp
    /// order.
    ///
    /// Fails with [`BagError::OrderViolation`] if the input is not sorted.
    pub fn new(messages: Vec<Message>) -> Result<Self, BagError> {
        if let Some(index) = first_order_violation(&messages) {
            return Err(BagError::OrderViolation { index });
        }
        Ok(Self {
            messages: messages.into(),
        })
    }

    /// An empty bag.
    pub fn empty() -> Self {
        Self {
            messages: Vec::new().into(),
        }
    }

    /// Load a bag from a file, validating every record's topic against the
    /// registry.
    ///
    /// When a `filter` is given, only messages on admitted topics are
    /// loaded; everything else is dropped while reading.
    pub fn load(
        registry: &TypeRegistry,
        path: impl AsRef<Path>,
        filter: Option<&TopicFilter>,
    ) -> Result<Self, BagError> {
        let path = path.as_ref();
        let messages = codec::read_messages(registry, path, filter)?;
        debug!(
            "loaded bag {} ({} messages)",
            path.display(),
            messages.len()
        );
        if let Some(index) = first_order_violation(&messages) {
            return Err(BagError::Format {
                path: path.display().to_string(),
                reason: format!("messages out of timestamp order at record {index}"),
            });
        }
        Ok(Self {
            messages: messages.into(),
        })
    }

    /// Save the bag's contents to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BagError> {
        let path = path.as_ref();
        codec::write_messages(path, &self.messages)?;
        debug!("saved bag {} ({} messages)", path.display(), self.len());
        Ok(())
    }

    /// Number of messages in the bag.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the bag holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The message at a given index, if it exists.
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// All messages, in timestamp order.
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    /// Iterate over the messages in order.  The iterator is finite and a
    /// fresh one can be obtained at any time.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// The set of topics that appear in the bag, in sorted order.
    pub fn topics(&self) -> BTreeSet<String> {
        self.messages.iter().map(|m| m.topic.clone()).collect()
    }

    // ── Structural edits ────────────────────────────────────────

    /// A new bag with the `index`-th message removed.
    pub fn delete(&self, index: usize) -> Result<Self, BagError> {
        self.check_index(index)?;
        let mut messages: Vec<Message> = self.messages.to_vec();
        messages.remove(index);
        Ok(Self {
            messages: messages.into(),
        })
    }

    /// A new bag with `message` inserted at the position that preserves
    /// timestamp order.
    ///
    /// Ties are broken after existing messages with the same timestamp, so
    /// repeated inserts are stable.
    pub fn insert(&self, message: Message) -> Self {
        let position = self
            .messages
            .partition_point(|m| m.time <= message.time);
        let mut messages: Vec<Message> = self.messages.to_vec();
        messages.insert(position, message);
        Self {
            messages: messages.into(),
        }
    }

    /// A new bag with the `index`-th message replaced.
    ///
    /// The replacement's timestamp must fit between its neighbours;
    /// otherwise the edit is rejected with [`BagError::OrderViolation`].
    pub fn replace(&self, index: usize, message: Message) -> Result<Self, BagError> {
        self.check_index(index)?;
        let mut messages: Vec<Message> = self.messages.to_vec();
        messages[index] = message;
        if first_order_violation(&messages).is_some() {
            return Err(BagError::OrderViolation { index });
        }
        Ok(Self {
            messages: messages.into(),
        })
    }

    /// A new bag with the messages at `i` and `j` exchanged.
    ///
    /// Rejected with [`BagError::OrderViolation`] unless the exchange
    /// preserves timestamp order, which in practice means the two messages
    /// carry equal timestamps.
    pub fn swap(&self, i: usize, j: usize) -> Result<Self, BagError> {
        self.check_index(i)?;
        self.check_index(j)?;
        let mut messages: Vec<Message> = self.messages.to_vec();
        messages.swap(i, j);
        if first_order_violation(&messages).is_some() {
            return Err(BagError::OrderViolation { index: i.min(j) });
        }
        Ok(Self {
            messages: messages.into(),
        })
    }

    /// An order-preserving subsequence restricted to one topic.
    pub fn restrict_to_topic(&self, topic: &str) -> Self {
        let messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect();
        Self {
            messages: messages.into(),
        }
    }

    /// Timestamps of the first and last messages, if the bag is non-empty.
    pub fn span(&self) -> Option<(Timestamp, Timestamp)> {
        match (self.messages.first(), self.messages.last()) {
            (Some(first), Some(last)) => Some((first.time, last.time)),
            _ => None,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), BagError> {
        if index < self.messages.len() {
            Ok(())
        } else {
            Err(BagError::OutOfRange {
                index,
                len: self.messages.len(),
            })
        }
    }
}

impl<'a> IntoIterator for &'a Bag {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq for Bag {
    fn eq(&self, other: &Self) -> bool {
        self.messages == other.messages
    }
}

impl Eq for Bag {}

/// Index of the first message whose timestamp precedes its predecessor's,
/// or `None` when the slice is sorted.
fn first_order_violation(messages: &[Message]) -> Option<usize> {
    messages
        .windows(2)
        .position(|pair| pair[0].time > pair[1].time)
        .map(|i| i + 1)
}
