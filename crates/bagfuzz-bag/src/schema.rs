//! Topic/type registry and topic filters.
//!
//! A bag file records messages for topics whose types are known ahead of
//! time.  The [`TypeRegistry`] maps each topic to its message type name and
//! is consulted when loading: a record on an unregistered topic is a
//! format error, not something to silently pass through.

use std::collections::{BTreeMap, BTreeSet};

/// Maps topic names to message type names (e.g. `/pos` →
/// `geometry_msgs/Vector3`).
///
/// Backed by a `BTreeMap` so iteration order is deterministic.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, String>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a topic with its message type, returning the registry for
    /// chaining.
    pub fn with(mut self, topic: impl Into<String>, message_type: impl Into<String>) -> Self {
        self.register(topic, message_type);
        self
    }

    /// Register a topic with its message type.
    pub fn register(&mut self, topic: impl Into<String>, message_type: impl Into<String>) {
        self.types.insert(topic.into(), message_type.into());
    }

    /// The message type registered for a topic, if any.
    pub fn message_type(&self, topic: &str) -> Option<&str> {
        self.types.get(topic).map(String::as_str)
    }

    /// Whether a topic is registered.
    pub fn contains(&self, topic: &str) -> bool {
        self.types.contains_key(topic)
    }

    /// Number of registered topics.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// An allow-list of topics applied while loading a bag.
#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    topics: BTreeSet<String>,
}

impl TopicFilter {
    /// Build a filter from an iterator of topic names.
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a topic passes the filter.
    pub fn admits(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    /// The admitted topics, in sorted order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        let registry = TypeRegistry::new()
            .with("/pos", "geometry_msgs/Vector3")
            .with("/cmd_vel", "geometry_msgs/Twist");

        assert_eq!(registry.message_type("/pos"), Some("geometry_msgs/Vector3"));
        assert_eq!(registry.message_type("/unknown"), None);
        assert!(registry.contains("/cmd_vel"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn filter_admits_only_listed_topics() {
        let filter = TopicFilter::new(["/pos"]);
        assert!(filter.admits("/pos"));
        assert!(!filter.admits("/cmd_vel"));
    }

    #[test]
    fn empty_filter_admits_nothing() {
        let filter = TopicFilter::default();
        assert!(!filter.admits("/pos"));
    }
}
