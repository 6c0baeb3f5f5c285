//! Mock collaborators for testing

use async_trait::async_trait;
use firebreak_api::BlockRule;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::{HostError, HostResult, RuleEngine, WakeupFired, WakeupScheduler};

/// Mock scheduler for unit/integration testing.
///
/// Timers never fire on their own; tests call [`MockScheduler::fire`] to
/// simulate delivery (or don't, to simulate a dropped wake-up).
pub struct MockScheduler {
    armed: Arc<Mutex<HashMap<String, Duration>>>,
    event_tx: mpsc::UnboundedSender<WakeupFired>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<WakeupFired>>>,

    /// Configure arm to fail
    pub fail_arm: Arc<Mutex<bool>>,
}

impl MockScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            armed: Arc::new(Mutex::new(HashMap::new())),
            event_tx: tx,
            event_rx: Mutex::new(Some(rx)),
            fail_arm: Arc::new(Mutex::new(false)),
        }
    }

    /// The delay the named timer is currently armed with, if any
    pub fn armed_delay(&self, name: &str) -> Option<Duration> {
        self.armed.lock().unwrap().get(name).copied()
    }

    /// Number of pending timers
    pub fn armed_count(&self) -> usize {
        self.armed.lock().unwrap().len()
    }

    /// Simulate the named timer firing. The timer is consumed.
    pub fn fire(&self, name: &str) {
        self.armed.lock().unwrap().remove(name);
        let _ = self.event_tx.send(WakeupFired { name: name.into() });
    }
}

impl Default for MockScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WakeupScheduler for MockScheduler {
    async fn arm(&self, name: &str, delay: Duration) -> HostResult<()> {
        if *self.fail_arm.lock().unwrap() {
            return Err(HostError::Scheduler("mock arm failure".into()));
        }
        self.armed.lock().unwrap().insert(name.to_string(), delay);
        Ok(())
    }

    async fn cancel(&self, name: &str) -> HostResult<()> {
        self.armed.lock().unwrap().remove(name);
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<WakeupFired> {
        self.event_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}

/// Mock rule engine for unit/integration testing
pub struct MockRules {
    rules: Arc<Mutex<Vec<BlockRule>>>,

    /// Configure replace to fail
    pub fail_replace: Arc<Mutex<bool>>,

    /// Configure replace to apply the removal and then fail, simulating
    /// a crash inside the non-transactional remove/add pair
    pub fail_after_remove: Arc<Mutex<bool>>,
}

impl MockRules {
    pub fn new() -> Self {
        Self {
            rules: Arc::new(Mutex::new(Vec::new())),
            fail_replace: Arc::new(Mutex::new(false)),
            fail_after_remove: Arc::new(Mutex::new(false)),
        }
    }

    /// Snapshot of the installed rules (test helper)
    pub fn active(&self) -> Vec<BlockRule> {
        self.rules.lock().unwrap().clone()
    }
}

impl Default for MockRules {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleEngine for MockRules {
    async fn list_active(&self) -> HostResult<Vec<BlockRule>> {
        Ok(self.rules.lock().unwrap().clone())
    }

    async fn replace(&self, remove_ids: Vec<u32>, add_rules: Vec<BlockRule>) -> HostResult<()> {
        if *self.fail_replace.lock().unwrap() {
            return Err(HostError::RuleEngine("mock replace failure".into()));
        }

        let mut rules = self.rules.lock().unwrap();
        rules.retain(|r| !remove_ids.contains(&r.id));

        if *self.fail_after_remove.lock().unwrap() {
            return Err(HostError::RuleEngine("mock failure after remove".into()));
        }

        rules.extend(add_rules);
        rules.sort_by_key(|r| r.id);
        Ok(())
    }
}
