//! Shared fakes for harness and detector tests.

use crate::cancel::CancelFlag;
use crate::fuzzer::InputInjector;
use bagfuzz_bag::{Bag, Message, Timestamp};
use bagfuzz_target::{AppDescription, AppInstance, Pid, Provision, TargetError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A bag with `length` messages on `/pos`, one per second, whose payload
/// is the message's original index.
pub(crate) fn build_test_bag(length: usize) -> Bag {
    let messages = (0..length)
        .map(|i| Message::new("/pos", Timestamp::from_secs(i as u64), vec![i as u8]))
        .collect();
    Bag::new(messages).unwrap()
}

/// A minimal valid application description.
pub(crate) fn test_app(nodes: &[&str]) -> AppDescription {
    AppDescription::new(
        "robot:test",
        "/ros/app.launch",
        nodes.iter().map(|n| n.to_string()).collect(),
        vec!["/pos".to_string()],
    )
    .unwrap()
}

/// An in-memory stand-in for a provisioned runtime instance.
///
/// Nodes resolve to fixed pids; pids can be "killed" from the test
/// thread, and liveness checks can be made to fail wholesale to exercise
/// probe-error marshaling.
pub(crate) struct FakeInstance {
    nodes: BTreeMap<String, Pid>,
    alive: Mutex<BTreeSet<Pid>>,
    liveness_broken: AtomicBool,
}

impl FakeInstance {
    pub(crate) fn new(nodes: &[(&str, u32)]) -> Arc<Self> {
        let nodes: BTreeMap<String, Pid> = nodes
            .iter()
            .map(|(name, pid)| (name.to_string(), Pid(*pid)))
            .collect();
        let alive = nodes.values().copied().collect();
        Arc::new(Self {
            nodes,
            alive: Mutex::new(alive),
            liveness_broken: AtomicBool::new(false),
        })
    }

    /// Mark a process as dead.
    pub(crate) fn kill(&self, pid: Pid) {
        self.alive.lock().unwrap().remove(&pid);
    }

    /// Make every subsequent liveness check fail.
    pub(crate) fn break_liveness_checks(&self) {
        self.liveness_broken.store(true, Ordering::SeqCst);
    }
}

impl AppInstance for FakeInstance {
    fn shell_execute(&self, _cmd: &str) -> Result<(i32, String), TargetError> {
        Ok((0, String::new()))
    }

    fn is_process_alive(&self, pid: Pid) -> Result<bool, TargetError> {
        if self.liveness_broken.load(Ordering::SeqCst) {
            return Err(TargetError::Shell {
                reason: "shell unavailable".to_string(),
            });
        }
        Ok(self.alive.lock().unwrap().contains(&pid))
    }

    fn resolve_node(&self, name: &str) -> Result<Pid, TargetError> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| TargetError::UnknownNode {
                name: name.to_string(),
            })
    }
}

/// Hands out the same fake instance for every trial and counts
/// provisions.
pub(crate) struct FakeProvisioner {
    instance: Arc<FakeInstance>,
    provisioned: AtomicUsize,
}

impl FakeProvisioner {
    pub(crate) fn new(instance: Arc<FakeInstance>) -> Self {
        Self {
            instance,
            provisioned: AtomicUsize::new(0),
        }
    }

    pub(crate) fn provision_count(&self) -> usize {
        self.provisioned.load(Ordering::SeqCst)
    }
}

impl Provision for FakeProvisioner {
    fn provision(&self, _app: &AppDescription) -> Result<Arc<dyn AppInstance>, TargetError> {
        self.provisioned.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.instance) as Arc<dyn AppInstance>)
    }
}

/// Records every injected bag; optionally kills a pid on injection to
/// simulate a crash provoked by the replayed input.
pub(crate) struct RecordingInjector {
    instance: Arc<FakeInstance>,
    injected: Mutex<Vec<Bag>>,
    kill_on_inject: Option<Pid>,
}

impl RecordingInjector {
    pub(crate) fn new(instance: Arc<FakeInstance>) -> Arc<Self> {
        Arc::new(Self {
            instance,
            injected: Mutex::new(Vec::new()),
            kill_on_inject: None,
        })
    }

    pub(crate) fn killing(instance: Arc<FakeInstance>, pid: Pid) -> Arc<Self> {
        Arc::new(Self {
            instance,
            injected: Mutex::new(Vec::new()),
            kill_on_inject: Some(pid),
        })
    }

    pub(crate) fn injected(&self) -> Vec<Bag> {
        self.injected.lock().unwrap().clone()
    }
}

impl InputInjector<Bag> for Arc<RecordingInjector> {
    fn inject(
        &self,
        _instance: &dyn AppInstance,
        _cancel: &CancelFlag,
        value: &Bag,
    ) -> Result<(), TargetError> {
        self.injected.lock().unwrap().push(value.clone());
        if let Some(pid) = self.kill_on_inject {
            self.instance.kill(pid);
        }
        Ok(())
    }
}
