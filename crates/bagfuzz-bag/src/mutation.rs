//! Structural bag mutations.
//!
//! Each variant is a pure, deterministic transform from one bag to
//! another, thin enough to be an adapter over the bag's structural edits.
//! Mutations compose by chaining; applying the same mutation twice with
//! the same parameters is deterministic but not idempotent in effect
//! (two `Drop { index: 0 }` applications remove two distinct messages).

use crate::bag::{Bag, BagError};
use crate::message::Message;
use std::fmt;
use std::time::Duration;

/// A single structural mutation of a [`Bag`].
#[derive(Debug, Clone, PartialEq)]
pub enum BagMutation {
    /// Remove the message at `index`.
    Drop {
        /// Position of the message to remove.
        index: usize,
    },

    /// Shift one message's timestamp forward by `delay` and reposition it
    /// so the bag stays sorted.
    Delay {
        /// Position of the message to delay.
        index: usize,
        /// How far forward to shift it.
        delay: Duration,
    },

    /// Exchange the messages at `i` and `j`.
    ///
    /// Subject to the bag's ordering policy: rejected unless the exchange
    /// preserves timestamp order.
    Swap {
        /// First position.
        i: usize,
        /// Second position.
        j: usize,
    },

    /// Replace the message at `index` with a different message.
    Replace {
        /// Position of the message to replace.
        index: usize,
        /// The replacement.
        message: Message,
    },

    /// Insert a message at its timestamp-ordered position.
    Insert {
        /// The message to insert.
        message: Message,
    },

    /// Replace only the payload of the message at `index`, keeping its
    /// topic and timestamp.
    ReplaceData {
        /// Position of the message to rewrite.
        index: usize,
        /// The new payload.
        data: Vec<u8>,
    },
}

impl BagMutation {
    /// Apply this mutation to a bag, producing a new bag.
    pub fn apply(&self, bag: &Bag) -> Result<Bag, BagError> {
        match self {
            Self::Drop { index } => bag.delete(*index),

            Self::Delay { index, delay } => {
                let message = bag.get(*index).ok_or(BagError::OutOfRange {
                    index: *index,
                    len: bag.len(),
                })?;
                let delayed = message.at(message.time + *delay);
                // Reposition via delete + ordered insert; replace would
                // reject the shifted timestamp.
                Ok(bag.delete(*index)?.insert(delayed))
            }

            Self::Swap { i, j } => bag.swap(*i, *j),

            Self::Replace { index, message } => bag.replace(*index, message.clone()),

            Self::Insert { message } => Ok(bag.insert(message.clone())),

            Self::ReplaceData { index, data } => {
                let message = bag.get(*index).ok_or(BagError::OutOfRange {
                    index: *index,
                    len: bag.len(),
                })?;
                bag.replace(*index, message.with_data(data.clone()))
            }
        }
    }
}

impl fmt::Display for BagMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drop { index } => write!(f, "drop message {index}"),
            Self::Delay { index, delay } => {
                write!(f, "delay message {index} by {}ms", delay.as_millis())
            }
            Self::Swap { i, j } => write!(f, "swap messages {i} and {j}"),
            Self::Replace { index, .. } => write!(f, "replace message {index}"),
            Self::Insert { message } => write!(f, "insert message on {}", message.topic),
            Self::ReplaceData { index, data } => {
                write!(f, "replace payload of message {index} ({} bytes)", data.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bag::tests::build_test_bag;
    use crate::message::Timestamp;

    #[test]
    fn drop_removes_one_message() {
        let bag = build_test_bag(5);
        let dropped = BagMutation::Drop { index: 2 }.apply(&bag).unwrap();
        assert_eq!(dropped.len(), 4);
        assert!(!dropped.iter().any(|m| m.data == vec![2]));
    }

    #[test]
    fn drop_twice_removes_two_distinct_messages() {
        let bag = build_test_bag(5);
        let mutation = BagMutation::Drop { index: 0 };
        let once = mutation.apply(&bag).unwrap();
        let twice = mutation.apply(&once).unwrap();
        assert_eq!(twice.len(), 3);
        // Both of the first two original messages are gone.
        assert!(!twice.iter().any(|m| m.data == vec![0]));
        assert!(!twice.iter().any(|m| m.data == vec![1]));
    }

    #[test]
    fn delay_repositions_and_keeps_order() {
        let bag = build_test_bag(5);
        let mutation = BagMutation::Delay {
            index: 1,
            delay: Duration::from_secs(2),
        };
        let delayed = mutation.apply(&bag).unwrap();

        assert_eq!(delayed.len(), 5);
        let times: Vec<Timestamp> = delayed.iter().map(|m| m.time).collect();
        assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
        // The delayed message (payload 1) now sits after t=3, tie-broken
        // behind the existing message at t=3.
        let position = delayed.iter().position(|m| m.data == vec![1]).unwrap();
        assert_eq!(position, 3);
        assert_eq!(delayed.get(position).unwrap().time, Timestamp::from_secs(3));
    }

    #[test]
    fn delay_out_of_range_fails() {
        let bag = build_test_bag(2);
        let mutation = BagMutation::Delay {
            index: 7,
            delay: Duration::from_secs(1),
        };
        assert!(matches!(
            mutation.apply(&bag),
            Err(BagError::OutOfRange { index: 7, len: 2 })
        ));
    }

    #[test]
    fn replace_data_keeps_topic_and_timestamp() {
        let bag = build_test_bag(3);
        let mutation = BagMutation::ReplaceData {
            index: 1,
            data: vec![0xAA, 0xBB],
        };
        let rewritten = mutation.apply(&bag).unwrap();
        let message = rewritten.get(1).unwrap();
        assert_eq!(message.topic, "/pos");
        assert_eq!(message.time, Timestamp::from_secs(1));
        assert_eq!(message.data, vec![0xAA, 0xBB]);
    }

    #[test]
    fn insert_grows_bag_in_order() {
        let bag = build_test_bag(3);
        let message = Message::new("/pos", Timestamp::new(0, 500_000_000), vec![99]);
        let grown = BagMutation::Insert { message }.apply(&bag).unwrap();
        assert_eq!(grown.len(), 4);
        assert_eq!(grown.get(1).unwrap().data, vec![99]);
    }

    #[test]
    fn swap_follows_bag_ordering_policy() {
        let bag = build_test_bag(3);
        assert!(matches!(
            BagMutation::Swap { i: 0, j: 2 }.apply(&bag),
            Err(BagError::OrderViolation { .. })
        ));
    }

    #[test]
    fn mutations_are_deterministic() {
        let bag = build_test_bag(6);
        let mutation = BagMutation::Delay {
            index: 2,
            delay: Duration::from_millis(1500),
        };
        let first = mutation.apply(&bag).unwrap();
        let second = mutation.apply(&bag).unwrap();
        assert_eq!(first, second);
    }
}
