//! Capability traits for the isolated runtime hosting the target.
//!
//! These are the seams between the fuzzing core and the outside world.
//! The core only ever holds trait objects; concrete implementations
//! (container runtimes, simulators, test fakes) live elsewhere.

use crate::app::AppDescription;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors from target description and runtime capabilities.
#[derive(Debug, Error)]
pub enum TargetError {
    /// The launch file path was not absolute.
    #[error("launch file path is not absolute: {path}")]
    LaunchFileNotAbsolute {
        /// The offending path.
        path: String,
    },

    /// No nodes were named in the application description.
    #[error("at least one node must be specified")]
    NoNodes,

    /// No topics were named in the application description.
    #[error("at least one topic must be specified")]
    NoTopics,

    /// The runtime could not provision an instance.
    #[error("failed to provision instance: {reason}")]
    Provision {
        /// Why provisioning failed.
        reason: String,
    },

    /// A shell command could not be executed inside the instance.
    #[error("shell execution failed: {reason}")]
    Shell {
        /// Why the command failed.
        reason: String,
    },

    /// A node name could not be resolved to a live process.
    #[error("cannot resolve node {name:?} to a process")]
    UnknownNode {
        /// The unresolvable node name.
        name: String,
    },

    /// Input delivery into the instance failed.
    #[error("failed to inject input: {reason}")]
    Inject {
        /// Why injection failed.
        reason: String,
    },
}

/// A process identifier inside the isolated runtime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A live, addressable instance of the application under test.
///
/// Instances are shared across the coordinating thread and detector
/// observers, so implementations must be thread-safe.  Teardown of the
/// underlying runtime is tied to dropping the last handle.
pub trait AppInstance: Send + Sync {
    /// Run a shell command inside the instance, returning its exit code
    /// and combined output.
    fn shell_execute(&self, cmd: &str) -> Result<(i32, String), TargetError>;

    /// Whether the process with the given pid is currently alive.
    fn is_process_alive(&self, pid: Pid) -> Result<bool, TargetError>;

    /// Resolve a node name to the pid of its hosting process.
    fn resolve_node(&self, name: &str) -> Result<Pid, TargetError>;
}

/// Provisions fresh, isolated instances of an application.
pub trait Provision {
    /// Start an isolated runtime hosting the described application and
    /// hand back a live instance of it.
    fn provision(&self, app: &AppDescription) -> Result<Arc<dyn AppInstance>, TargetError>;
}

impl<T: Provision + ?Sized> Provision for Arc<T> {
    fn provision(&self, app: &AppDescription) -> Result<Arc<dyn AppInstance>, TargetError> {
        (**self).provision(app)
    }
}
