//! Collaborator traits

use async_trait::async_trait;
use firebreak_api::BlockRule;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from collaborator operations
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Scheduler failure: {0}")]
    Scheduler(String),

    #[error("Rule engine failure: {0}")]
    RuleEngine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HostResult<T> = Result<T, HostError>;

/// A wake-up delivered by the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeupFired {
    /// The name the timer was armed under
    pub name: String,
}

/// One-shot named wake-up timers.
///
/// Delivery is best-effort: a fire may be delayed or dropped entirely
/// (the status self-heal compensates). Arming a name that already has a
/// pending timer replaces it.
#[async_trait]
pub trait WakeupScheduler: Send + Sync {
    /// Arm (or re-arm) the named timer to fire once after `delay`.
    async fn arm(&self, name: &str, delay: Duration) -> HostResult<()>;

    /// Cancel the named timer. Cancelling an absent timer is a no-op.
    async fn cancel(&self, name: &str) -> HostResult<()>;

    /// Subscribe to fired wake-ups. Can be called once.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<WakeupFired>;
}

/// The declarative request-blocking rule set.
///
/// The engine owns rule application to traffic; callers only read and
/// replace the set. `replace` removes then adds sequentially — the pair
/// is not a transaction, and a caller that needs the invariant restored
/// after a crash re-derives the whole set.
#[async_trait]
pub trait RuleEngine: Send + Sync {
    /// The currently installed rules, in id order.
    async fn list_active(&self) -> HostResult<Vec<BlockRule>>;

    /// Remove the rules with the given ids, then add `add_rules`.
    async fn replace(&self, remove_ids: Vec<u32>, add_rules: Vec<BlockRule>) -> HostResult<()>;
}
