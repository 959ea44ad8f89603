//! Description of the application under test.

use crate::instance::TargetError;
use std::path::Path;

/// A description of the robot application to fuzz.
///
/// Construction validates everything the campaign relies on: the launch
/// file path must be absolute (it is resolved inside the isolated
/// runtime, not the host), and at least one node and one topic must be
/// named — a campaign with nothing to watch or nothing to perturb is a
/// configuration mistake, caught before any trial runs.
#[derive(Debug, Clone)]
pub struct AppDescription {
    /// Name of the runtime image hosting the application.
    pub image: String,
    /// Absolute path, inside the runtime, of the launch file used to
    /// start the application.
    pub launch_filename: String,
    /// Optional prefix prepended to the launch command.
    pub launch_prefix: Option<String>,
    /// Names of the nodes to monitor for crashes.
    pub nodes: Vec<String>,
    /// Names of the topics whose messages are fuzzed.
    pub topics: Vec<String>,
}

impl AppDescription {
    /// Create a validated description.
    pub fn new(
        image: impl Into<String>,
        launch_filename: impl Into<String>,
        nodes: Vec<String>,
        topics: Vec<String>,
    ) -> Result<Self, TargetError> {
        let launch_filename = launch_filename.into();
        if !Path::new(&launch_filename).is_absolute() {
            return Err(TargetError::LaunchFileNotAbsolute {
                path: launch_filename,
            });
        }
        if nodes.is_empty() {
            return Err(TargetError::NoNodes);
        }
        if topics.is_empty() {
            return Err(TargetError::NoTopics);
        }
        Ok(Self {
            image: image.into(),
            launch_filename,
            launch_prefix: None,
            nodes,
            topics,
        })
    }

    /// Attach a launch prefix (e.g. a wrapper command).
    pub fn with_launch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.launch_prefix = Some(prefix.into());
        self
    }
}
