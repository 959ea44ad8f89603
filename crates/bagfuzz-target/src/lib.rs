//! Target-side types for bagfuzz: what is under test and how to reach it.
//!
//! The fuzzing core never talks to a container runtime or a live process
//! graph directly.  It consumes the capability traits defined here —
//! provisioning, shell access, liveness checks, node resolution — and
//! leaves their implementation to an external runtime collaborator.
//!
//! # Module Structure
//!
//! - [`app`] — description of the application under test
//! - [`instance`] — `Pid`, capability traits, and `TargetError`

pub mod app;
pub mod instance;

pub use app::AppDescription;
pub use instance::{AppInstance, Pid, Provision, TargetError};
