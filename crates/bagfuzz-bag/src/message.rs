//! Timestamped messages — the atoms of a bag.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::time::Duration;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A logical timestamp: seconds plus nanoseconds since an arbitrary epoch.
///
/// Ordered first by seconds, then by nanoseconds.  Constructors normalize
/// so that `nsecs` is always below one second.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp {
    /// Whole seconds.
    pub secs: u64,
    /// Nanosecond remainder, always `< 1_000_000_000`.
    pub nsecs: u32,
}

impl Timestamp {
    /// Create a timestamp, carrying nanosecond overflow into seconds.
    pub fn new(secs: u64, nsecs: u64) -> Self {
        Self {
            secs: secs + nsecs / NANOS_PER_SEC,
            nsecs: (nsecs % NANOS_PER_SEC) as u32,
        }
    }

    /// A timestamp at a whole number of seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self { secs, nsecs: 0 }
    }

    /// Total nanoseconds since the epoch.
    pub fn as_nanos(&self) -> u128 {
        u128::from(self.secs) * u128::from(NANOS_PER_SEC) + u128::from(self.nsecs)
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, delay: Duration) -> Timestamp {
        Timestamp::new(
            self.secs + delay.as_secs(),
            u64::from(self.nsecs) + u64::from(delay.subsec_nanos()),
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nsecs)
    }
}

/// A single recorded message: an opaque payload tagged with the topic it
/// was published on and the time it was recorded.
///
/// Messages are immutable values; "editing" one means building a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Name of the topic the message was published on.
    pub topic: String,
    /// Time at which the message was recorded.
    pub time: Timestamp,
    /// Serialized message payload.  The bag model treats this as opaque;
    /// decoding belongs to the type registered for the topic.
    pub data: Vec<u8>,
}

impl Message {
    /// Create a new message.
    pub fn new(topic: impl Into<String>, time: Timestamp, data: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            time,
            data,
        }
    }

    /// A copy of this message stamped with a different time.
    pub fn at(&self, time: Timestamp) -> Self {
        Self {
            topic: self.topic.clone(),
            time,
            data: self.data.clone(),
        }
    }

    /// A copy of this message with the payload replaced, keeping topic
    /// and timestamp.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Self {
            topic: self.topic.clone(),
            time: self.time,
            data,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} ({} bytes)", self.topic, self.time, self.data.len())
    }
}
