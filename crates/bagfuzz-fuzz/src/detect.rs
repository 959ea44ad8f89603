//! Failure detection: background observers watching one trial.
//!
//! A [`FailureDetector`] moves Idle → Running → Stopped.  `start` spawns
//! an observer thread that polls a [`LivenessProbe`] at a fixed interval;
//! on the first observed failure it records it, trips the trial's shared
//! [`CancelFlag`], and exits.  `stop` joins the observer before
//! returning, so no detector outlives its trial, and any error the
//! observer hit is marshaled back to the caller rather than dropped.
//!
//! Failures are the tool's output signal, not errors: a detector that
//! could not even be set up (say, a node name that resolves to nothing)
//! fails its trial with a [`DetectorError`] instead.

use crate::cancel::CancelFlag;
use bagfuzz_target::{AppInstance, Pid, TargetError};
use log::debug;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// How often observers poll their probe unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One detected abnormal condition in the application under test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Failure {
    /// A monitored node's process terminated abnormally.
    NodeCrashed {
        /// Name of the crashed node.
        node: String,
        /// Pid its process had when the trial started.
        pid: Pid,
    },
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeCrashed { node, pid } => {
                write!(f, "node {node} crashed (pid {pid})")
            }
        }
    }
}

/// Errors from detector setup and observation.
#[derive(Debug, Error)]
pub enum DetectorError {
    /// A node name could not be resolved to a process at start time.
    /// This is a trial setup error, distinct from a runtime [`Failure`].
    #[error("cannot resolve node {node:?} to a process")]
    NodeResolution {
        /// The unresolvable node.
        node: String,
        #[source]
        source: TargetError,
    },

    /// The liveness probe itself failed while polling.
    #[error("liveness probe failed")]
    Probe {
        #[source]
        source: TargetError,
    },

    /// The observer thread panicked.
    #[error("detector observer panicked")]
    ObserverPanicked,

    /// `start` was called on a detector that is not idle.
    #[error("detector has already been started")]
    AlreadyStarted,
}

/// Lifecycle state of a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Created, observer not yet running.
    Idle,
    /// Observer thread is polling.
    Running,
    /// Observer has been joined; the detector is finished.
    Stopped,
}

/// The condition a detector's observer polls.
///
/// Returning `Ok(Some(_))` fires the detector; probes are only polled
/// until they fire once.
pub trait LivenessProbe: Send + 'static {
    /// Check the condition once.
    fn poll(&mut self) -> Result<Option<Failure>, DetectorError>;
}

/// Polls whether every watched node's process is still alive.
///
/// Node names are resolved to pids once, when the probe is built;
/// resolution failure is a hard setup error for the whole trial.
pub struct NodeCrashProbe {
    instance: Arc<dyn AppInstance>,
    watched: Vec<(String, Pid)>,
}

impl NodeCrashProbe {
    /// Resolve every node name on the given instance.
    pub fn resolve(
        instance: Arc<dyn AppInstance>,
        nodes: &[String],
    ) -> Result<Self, DetectorError> {
        let mut watched = Vec::with_capacity(nodes.len());
        for node in nodes {
            let pid = instance
                .resolve_node(node)
                .map_err(|source| DetectorError::NodeResolution {
                    node: node.clone(),
                    source,
                })?;
            watched.push((node.clone(), pid));
        }
        debug!("watching {} node(s) for crashes", watched.len());
        Ok(Self { instance, watched })
    }
}

impl LivenessProbe for NodeCrashProbe {
    fn poll(&mut self) -> Result<Option<Failure>, DetectorError> {
        for (node, pid) in &self.watched {
            let alive = self
                .instance
                .is_process_alive(*pid)
                .map_err(|source| DetectorError::Probe { source })?;
            if !alive {
                return Ok(Some(Failure::NodeCrashed {
                    node: node.clone(),
                    pid: *pid,
                }));
            }
        }
        Ok(None)
    }
}

/// The closed set of detector configurations.  Specs are per-campaign;
/// a fresh detector is built from each spec for every trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DetectorSpec {
    /// Watch the named nodes for abrupt process termination.
    NodeCrash {
        /// Node names to watch.
        nodes: Vec<String>,
    },
}

impl DetectorSpec {
    /// Bind this spec to a live instance, producing an idle detector.
    ///
    /// Any resolution work happens here, so a misconfigured detector
    /// aborts the trial before injection instead of silently degrading
    /// the detector set.
    pub fn build(
        &self,
        instance: &Arc<dyn AppInstance>,
        cancel: CancelFlag,
        poll_interval: Duration,
    ) -> Result<FailureDetector, DetectorError> {
        match self {
            Self::NodeCrash { nodes } => {
                let probe = NodeCrashProbe::resolve(Arc::clone(instance), nodes)?;
                Ok(FailureDetector::new(
                    "node-crash",
                    Box::new(probe),
                    cancel,
                    poll_interval,
                ))
            }
        }
    }
}

type ObserverResult = Result<Option<Failure>, DetectorError>;

/// A background observer bound to one trial.
pub struct FailureDetector {
    name: &'static str,
    cancel: CancelFlag,
    poll_interval: Duration,
    state: DetectorState,
    probe: Option<Box<dyn LivenessProbe>>,
    stop_requested: Arc<AtomicBool>,
    observer: Option<JoinHandle<ObserverResult>>,
    failure: Option<Failure>,
}

impl FailureDetector {
    /// Create an idle detector around a probe.
    pub fn new(
        name: &'static str,
        probe: Box<dyn LivenessProbe>,
        cancel: CancelFlag,
        poll_interval: Duration,
    ) -> Self {
        Self {
            name,
            cancel,
            poll_interval,
            state: DetectorState::Idle,
            probe: Some(probe),
            stop_requested: Arc::new(AtomicBool::new(false)),
            observer: None,
            failure: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Whether the observer is currently running.
    pub fn is_running(&self) -> bool {
        self.state == DetectorState::Running
    }

    /// The failure recorded by this detector, if it fired.
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    /// Spawn the observer.  Returns once the observer has confirmed it is
    /// polling, so callers may treat everything after `start` as watched.
    pub fn start(&mut self) -> Result<(), DetectorError> {
        if self.state != DetectorState::Idle {
            return Err(DetectorError::AlreadyStarted);
        }
        let mut probe = self.probe.take().ok_or(DetectorError::AlreadyStarted)?;
        let cancel = self.cancel.clone();
        let stop_requested = Arc::clone(&self.stop_requested);
        let poll_interval = self.poll_interval;
        let (ready_tx, ready_rx) = mpsc::channel();

        let observer = thread::spawn(move || {
            let _ = ready_tx.send(());
            loop {
                if stop_requested.load(Ordering::SeqCst) {
                    return Ok(None);
                }
                match probe.poll() {
                    Ok(Some(failure)) => {
                        cancel.trip();
                        return Ok(Some(failure));
                    }
                    Ok(None) => {}
                    Err(err) => {
                        // The trial can no longer be trusted to observe
                        // failures; let the coordinator know.
                        cancel.trip();
                        return Err(err);
                    }
                }
                thread::sleep(poll_interval);
            }
        });

        if ready_rx.recv().is_err() {
            let _ = observer.join();
            return Err(DetectorError::ObserverPanicked);
        }
        self.observer = Some(observer);
        self.state = DetectorState::Running;
        debug!("started failure detector: {}", self.name);
        Ok(())
    }

    /// Request shutdown and join the observer, returning whatever it
    /// recorded.  Idempotent once stopped.
    pub fn stop(&mut self) -> Result<Option<Failure>, DetectorError> {
        match self.state {
            DetectorState::Idle => {
                self.state = DetectorState::Stopped;
                return Ok(None);
            }
            DetectorState::Stopped => return Ok(self.failure.clone()),
            DetectorState::Running => {}
        }

        debug!("stopping failure detector: {}", self.name);
        self.stop_requested.store(true, Ordering::SeqCst);
        self.state = DetectorState::Stopped;
        let observer = self.observer.take().ok_or(DetectorError::ObserverPanicked)?;
        match observer.join() {
            Err(_) => Err(DetectorError::ObserverPanicked),
            Ok(Err(err)) => Err(err),
            Ok(Ok(failure)) => {
                self.failure = failure;
                Ok(self.failure.clone())
            }
        }
    }
}

impl fmt::Debug for FailureDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureDetector")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}
