//! Tokio-backed one-shot wake-up scheduler

use async_trait::async_trait;
use firebreak_host_api::{HostResult, WakeupFired, WakeupScheduler};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One-shot named timers as tokio sleep tasks.
///
/// Re-arming a name aborts the pending task and spawns a fresh one, so
/// at most one timer per name is ever pending. Fired wake-ups are
/// delivered through the subscribe channel; if the receiver is gone the
/// fire is dropped, which the subscriber side compensates for with the
/// status self-heal.
pub struct TokioScheduler {
    timers: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    event_tx: mpsc::UnboundedSender<WakeupFired>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<WakeupFired>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        Self {
            timers: Arc::new(Mutex::new(HashMap::new())),
            event_tx: tx,
            event_rx: Mutex::new(Some(rx)),
        }
    }

    /// Number of pending timers
    pub fn pending(&self) -> usize {
        self.timers.lock().unwrap().len()
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WakeupScheduler for TokioScheduler {
    async fn arm(&self, name: &str, delay: Duration) -> HostResult<()> {
        let mut timers = self.timers.lock().unwrap();

        if let Some(previous) = timers.remove(name) {
            previous.abort();
            debug!(name, "Replaced pending timer");
        }

        let tx = self.event_tx.clone();
        let timers_ref = self.timers.clone();
        let timer_name = name.to_string();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            timers_ref.lock().unwrap().remove(&timer_name);
            let _ = tx.send(WakeupFired { name: timer_name });
        });

        timers.insert(name.to_string(), handle);
        debug!(name, delay_secs = delay.as_secs(), "Timer armed");

        Ok(())
    }

    async fn cancel(&self, name: &str) -> HostResult<()> {
        if let Some(handle) = self.timers.lock().unwrap().remove(name) {
            handle.abort();
            debug!(name, "Timer cancelled");
        }
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

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.lock().unwrap().drain() {
            handle.abort();
        }
    }
}
