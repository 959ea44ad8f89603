//! Immutable message-log (bag) model for bagfuzz.
//!
//! A [`Bag`] is an ordered, immutable sequence of timestamped messages
//! recorded from a running robot application, used as replay input for
//! fuzzing.  Every structural edit returns a new bag and preserves the
//! non-decreasing timestamp invariant.
//!
//! # Module Structure
//!
//! - [`message`] — `Timestamp` and `Message` value types
//! - [`schema`] — topic/type registry and load-time topic filters
//! - [`bag`] — the bag itself: load/save, indexed access, structural edits
//! - [`codec`] — the on-disk record layout (owned here, not by the bag)
//! - [`mutation`] — closed set of structural bag mutations
//!
//! # Determinism
//!
//! Bags and mutations are plain values: applying the same mutation to the
//! same bag always yields the same result, and bags can be shared across
//! threads without locking.

pub mod bag;
pub mod codec;
pub mod message;
pub mod mutation;
pub mod schema;

pub use bag::{Bag, BagError};
pub use message::{Message, Timestamp};
pub use mutation::BagMutation;
pub use schema::{TopicFilter, TypeRegistry};
