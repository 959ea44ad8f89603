//! The execution harness and the outer campaign loop.
//!
//! One trial (`execute`) provisions a fresh instance, starts every
//! configured detector, injects the input's materialized value, waits a
//! settle period for effects to manifest, then joins the detectors and
//! collects what they saw.  The campaign loop (`fuzz`) repeats trials
//! until a resource limit is met, checking limits at loop entry so a
//! partial trial is never started.
//!
//! Runtime failures are the product, not a problem: an `Execution`
//! carrying failures is a successful trial.  Errors — a seed pool
//! misconfiguration, an unresolvable node, a broken probe — abort the
//! trial instead, so a trial that could not run is always
//! distinguishable from one that ran clean.

use crate::cancel::CancelFlag;
use crate::detect::{DetectorError, DetectorSpec, Failure, FailureDetector, DEFAULT_POLL_INTERVAL};
use crate::generate::InputGenerator;
use crate::input::{Input, Mutation};
use crate::resources::{ResourceLimits, ResourceUsage, Stopwatch};
use bagfuzz_target::{AppDescription, AppInstance, Provision, TargetError};
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Delivers a materialized input value into a live instance.
///
/// Delivery is fire-and-forget: the call returning does not mean the
/// downstream effects have finished, which is exactly why the harness
/// settles afterwards.
pub trait InputInjector<T> {
    /// Inject the value into the instance.
    fn inject(
        &self,
        instance: &dyn AppInstance,
        cancel: &CancelFlag,
        value: &T,
    ) -> Result<(), TargetError>;
}

/// Errors from harness construction and trial execution.
#[derive(Debug, Error)]
pub enum FuzzError {
    /// No failure detectors were configured.
    #[error("at least one failure detector must be configured")]
    NoDetectors,

    /// The worker count was zero.
    #[error("at least one worker must be used")]
    NoWorkers,

    /// The input's mutation chain could not be materialized.
    #[error("failed to materialize input value")]
    Input {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A runtime capability (provision, inject) failed.
    #[error(transparent)]
    Target(#[from] TargetError),

    /// A detector could not be set up, or its observer broke.
    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// The immutable outcome of one trial.
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    duration: Duration,
    failures: Vec<Failure>,
}

impl Execution {
    /// Build an execution record.
    pub fn new(duration: Duration, failures: Vec<Failure>) -> Self {
        Self { duration, failures }
    }

    /// Wall-clock time from injection to the end of the settle wait.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Every failure detected during the trial.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Whether any failure was detected.  An empty set means the trial
    /// passed.
    pub fn failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Outcome of a whole campaign.
#[derive(Debug, Serialize)]
pub struct CampaignSummary {
    /// Per-trial outcomes, in execution order.
    pub executions: Vec<Execution>,
    /// Resources consumed by the campaign.
    pub usage: ResourceUsage,
}

impl CampaignSummary {
    /// Number of trials that detected at least one failure.
    pub fn trials_failed(&self) -> usize {
        self.executions.iter().filter(|e| e.failed()).count()
    }
}

/// Harness configuration.
#[derive(Debug, Clone)]
pub struct FuzzerConfig {
    /// Worker slots.  Must be at least one; the base harness drives
    /// trials sequentially, so this is capacity planning, not
    /// parallelism.
    pub num_workers: usize,
    /// How long to wait after injection for effects to manifest.
    pub settle_period: Duration,
    /// Poll interval handed to every detector observer.
    pub poll_interval: Duration,
    /// Whether an early cancellation signal may cut the settle wait
    /// short.  Off by default: the base contract waits the full period.
    pub stop_settle_early: bool,
    /// Ceilings on the campaign.
    pub resource_limits: ResourceLimits,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            settle_period: Duration::from_secs(15),
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_settle_early: false,
            resource_limits: ResourceLimits::unlimited(),
        }
    }
}

/// Fuzzes one application with one generation strategy.
///
/// Owns all campaign state — stopwatch, executed-input counter — so two
/// fuzzers never interfere through shared globals.
pub struct Fuzzer<T, M> {
    app: AppDescription,
    provisioner: Box<dyn Provision>,
    injector: Box<dyn InputInjector<T>>,
    generator: Box<dyn InputGenerator<T, M>>,
    detectors: Vec<DetectorSpec>,
    config: FuzzerConfig,
    stopwatch: Stopwatch,
    num_executed: u64,
}

impl<T: Clone, M: Mutation<T>> Fuzzer<T, M> {
    /// Create a harness.  Fails fast on an empty detector list or a zero
    /// worker count, before any trial runs.
    pub fn new(
        app: AppDescription,
        provisioner: Box<dyn Provision>,
        injector: Box<dyn InputInjector<T>>,
        generator: Box<dyn InputGenerator<T, M>>,
        detectors: Vec<DetectorSpec>,
        config: FuzzerConfig,
    ) -> Result<Self, FuzzError> {
        if detectors.is_empty() {
            return Err(FuzzError::NoDetectors);
        }
        if config.num_workers < 1 {
            return Err(FuzzError::NoWorkers);
        }
        Ok(Self {
            app,
            provisioner,
            injector,
            generator,
            detectors,
            config,
            stopwatch: Stopwatch::new(),
            num_executed: 0,
        })
    }

    /// Resources consumed so far, updated once per trial.
    pub fn resource_usage(&self) -> ResourceUsage {
        ResourceUsage {
            wall_clock: self.stopwatch.duration(),
            num_inputs: self.num_executed,
        }
    }

    /// Whether any configured limit has been met.
    pub fn limits_reached(&self) -> bool {
        self.config
            .resource_limits
            .reached_by(&self.resource_usage())
    }

    /// Run one trial against a fresh instance.
    pub fn execute(&self, input: &Input<T, M>) -> Result<Execution, FuzzError> {
        debug!("provisioning instance of {}", self.app.image);
        let instance = self.provisioner.provision(&self.app)?;
        let cancel = CancelFlag::new();
        let mut detectors = Vec::with_capacity(self.detectors.len());

        let result = self.run_trial(&instance, &cancel, &mut detectors, input);
        if result.is_err() {
            // The trial is aborting; no detector may outlive it.
            for detector in &mut detectors {
                if detector.is_running() {
                    if let Err(err) = detector.stop() {
                        warn!("failed to stop detector while aborting trial: {err}");
                    }
                }
            }
        }
        result
    }

    fn run_trial(
        &self,
        instance: &Arc<dyn AppInstance>,
        cancel: &CancelFlag,
        detectors: &mut Vec<FailureDetector>,
        input: &Input<T, M>,
    ) -> Result<Execution, FuzzError> {
        for spec in &self.detectors {
            let mut detector = spec.build(instance, cancel.clone(), self.config.poll_interval)?;
            detector.start()?;
            detectors.push(detector);
        }
        // Every detector has confirmed it is running; from here on the
        // trial is watched.

        let value = input.value().map_err(|source| FuzzError::Input {
            source: Box::new(source),
        })?;

        let mut stopwatch = Stopwatch::new();
        stopwatch.start();
        self.injector.inject(instance.as_ref(), cancel, &value)?;
        self.settle(cancel);
        stopwatch.stop();

        let mut failures = Vec::new();
        for detector in detectors.iter_mut() {
            if let Some(failure) = detector.stop()? {
                failures.push(failure);
            }
        }

        let execution = Execution::new(stopwatch.duration(), failures);
        debug!(
            "trial finished in {:?} with {} failure(s)",
            execution.duration(),
            execution.failures().len()
        );
        Ok(execution)
    }

    /// Wait out the settle period.  With `stop_settle_early`, the wait is
    /// cut short once the trial's cancellation signal trips.
    fn settle(&self, cancel: &CancelFlag) {
        if !self.config.stop_settle_early {
            thread::sleep(self.config.settle_period);
            return;
        }
        let deadline = Instant::now() + self.config.settle_period;
        loop {
            if cancel.is_tripped() {
                debug!("settle wait cut short by cancellation signal");
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            thread::sleep(remaining.min(self.config.poll_interval));
        }
    }

    /// Run the campaign: pull inputs and execute trials until a resource
    /// limit is met.  Limits are checked at loop entry, so a partial
    /// trial is never started.
    pub fn fuzz(&mut self) -> Result<CampaignSummary, FuzzError> {
        info!("started fuzzing campaign against {}", self.app.image);
        self.stopwatch.start();
        let mut executions = Vec::new();
        loop {
            if self.limits_reached() {
                info!("reached resource limits after {} input(s)", self.num_executed);
                break;
            }
            let input = self.generator.next_input();
            info!(
                "fuzzing input #{} (running time: {:.2} mins)",
                self.num_executed,
                self.stopwatch.duration().as_secs_f64() / 60.0
            );
            let execution = self.execute(&input)?;
            if execution.failed() {
                info!(
                    "input #{} triggered {} failure(s)",
                    self.num_executed,
                    execution.failures().len()
                );
            }
            self.num_executed += 1;
            executions.push(execution);
        }
        self.stopwatch.stop();
        info!("finished fuzzing campaign");
        Ok(CampaignSummary {
            usage: self.resource_usage(),
            executions,
        })
    }
}
