//! The bagfuzz fuzzing core: inputs, generators, detectors, and the
//! campaign harness.
//!
//! # Architecture
//!
//! ```text
//! InputGenerator ──→ Input ──→ Fuzzer::execute()
//!                                   │
//!                                   ├─ provision instance     (capability)
//!                                   ├─ start detectors ───────┐
//!                                   ├─ inject input.value()   │ observers
//!                                   ├─ settle wait            │ poll, may
//!                                   ├─ stop detectors ←───────┘ trip cancel
//!                                   └─ Execution { duration, failures }
//! ```
//!
//! One coordinating thread drives the campaign loop and each trial
//! sequentially; within a trial every detector runs its own observer
//! thread.  The only state crossing thread boundaries is the per-trial
//! [`CancelFlag`]; bags, mutations, and inputs are immutable values.
//!
//! # Module Structure
//!
//! - [`input`] — `Mutation` trait and the seed + mutation-chain `Input`
//! - [`generate`] — input generators and the random bag mutator
//! - [`cancel`] — the per-trial shared cancellation flag
//! - [`detect`] — failure-detector framework and the node-crash detector
//! - [`resources`] — stopwatch, resource limits, and usage accounting
//! - [`fuzzer`] — the execution harness and campaign loop
//!
//! # Determinism
//!
//! Input generation is deterministic given its RNG seed (seeded
//! `ChaCha8Rng` throughout).  Trial outcomes depend on the target, not on
//! the generator.

pub mod cancel;
pub mod detect;
pub mod fuzzer;
pub mod generate;
pub mod input;
pub mod resources;

#[cfg(test)]
pub(crate) mod testutil;

pub use cancel::CancelFlag;
pub use detect::{DetectorError, DetectorSpec, DetectorState, Failure, FailureDetector};
pub use fuzzer::{
    CampaignSummary, Execution, FuzzError, Fuzzer, FuzzerConfig, InputInjector,
};
pub use generate::{
    BagMutator, CyclicGenerator, GenerateError, InputGenerator, MutationStrategy, Mutator,
    RandomInputGenerator,
};
pub use input::{Input, Mutation};
pub use resources::{ResourceLimits, ResourceUsage, Stopwatch};
