//! Session state machine controller

use chrono::{DateTime, Utc};
use firebreak_api::{SessionEndReason, StatusView};
use firebreak_host_api::{RuleEngine, WakeupScheduler};
use firebreak_store::{AuditEvent, AuditEventType, AuditLog, KvStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    load_sites, CoreError, CoreEvent, CoreResult, RuleSynchronizer, SessionState,
};

/// Name the session expiry timer is armed under. Wake-ups carrying any
/// other name are ignored.
pub const SESSION_TIMER: &str = "focus-session";

/// Owns the session state machine: Idle <-> Active, with a Locked
/// sub-mode. Sole writer of the persisted session fields.
///
/// The controller holds no session data in memory: every operation
/// re-reads the durable record, so it behaves identically whether the
/// process ran continuously or was restarted between calls. A single
/// async mutex serializes the read-check-mutate-persist sequences;
/// without it, racing start/stop could leave a stale wake-up armed
/// against a newer session or a lock outliving its session.
pub struct SessionController {
    store: Arc<dyn KvStore>,
    audit: Arc<dyn AuditLog>,
    scheduler: Arc<dyn WakeupScheduler>,
    rules: RuleSynchronizer,
    session_lock: Mutex<()>,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn KvStore>,
        audit: Arc<dyn AuditLog>,
        scheduler: Arc<dyn WakeupScheduler>,
        engine: Arc<dyn RuleEngine>,
    ) -> Self {
        Self {
            rules: RuleSynchronizer::new(store.clone(), engine),
            store,
            audit,
            scheduler,
            session_lock: Mutex::new(()),
        }
    }

    /// Start a focus session of `duration_minutes`, optionally in
    /// strict (locked) mode.
    ///
    /// In order: persist the new record, arm the wake-up timer
    /// (replacing any pending one), install the block rules. Starting
    /// over an already active session overwrites it rather than
    /// stacking; the re-arm under the fixed timer name discards the old
    /// session's pending wake-up.
    pub async fn start(
        &self,
        duration_minutes: i64,
        strict: bool,
        now: DateTime<Utc>,
    ) -> CoreResult<CoreEvent> {
        if duration_minutes <= 0 {
            return Err(CoreError::InvalidDuration(duration_minutes));
        }

        let _guard = self.session_lock.lock().await;

        let end_time = now + chrono::Duration::minutes(duration_minutes);
        SessionState::active(end_time, strict)
            .persist(&*self.store)
            .await?;

        self.scheduler
            .arm(SESSION_TIMER, Duration::from_secs(duration_minutes as u64 * 60))
            .await?;

        let rule_count = self.rules.enable().await?;

        let site_count = load_sites(&*self.store).await.map(|s| s.len()).unwrap_or(0);
        let _ = self
            .audit
            .append(AuditEvent::new(AuditEventType::SessionStarted {
                end_time,
                locked: strict,
                site_count,
            }))
            .await;

        info!(
            duration_minutes,
            strict,
            rule_count,
            end_time = %end_time,
            "Session started"
        );

        Ok(CoreEvent::SessionStarted {
            end_time,
            locked: strict,
        })
    }

    /// Stop the current session early.
    ///
    /// The lock check re-reads the persisted record rather than any
    /// in-memory copy; strict mode has no bypass path here. Stopping
    /// while idle is a harmless reset.
    pub async fn stop(&self) -> CoreResult<CoreEvent> {
        let _guard = self.session_lock.lock().await;

        let state = SessionState::load(&*self.store).await?;
        if state.locked {
            let _ = self
                .audit
                .append(AuditEvent::new(AuditEventType::StopRejected))
                .await;
            warn!("Stop rejected: strict mode is active");
            return Err(CoreError::Locked);
        }

        self.reset(SessionEndReason::Stopped).await
    }

    /// Handle a wake-up from the external scheduler.
    ///
    /// Only the fixed session-timer name is honored; anything else is
    /// some other component's timer. The reset bypasses the lock: the
    /// wake-up *is* the expiry condition, and the lock only guards
    /// user-initiated early stops.
    pub async fn on_wake_up(&self, name: &str) -> CoreResult<Option<CoreEvent>> {
        if name != SESSION_TIMER {
            debug!(name, "Ignoring unrelated wake-up");
            return Ok(None);
        }

        let _guard = self.session_lock.lock().await;
        let event = self.reset(SessionEndReason::Expired).await?;
        Ok(Some(event))
    }

    /// Current status for display.
    ///
    /// An active session whose deadline has already passed means the
    /// wake-up was delayed or dropped; the session self-heals through
    /// the expiry reset before Idle is reported. The accompanying event
    /// (if any) is the reset that was performed.
    pub async fn status(&self, now: DateTime<Utc>) -> CoreResult<(StatusView, Option<CoreEvent>)> {
        let _guard = self.session_lock.lock().await;

        let state = SessionState::load(&*self.store).await?;
        let site_count = load_sites(&*self.store).await?.len();

        if state.is_expired(now) {
            info!("Missed expiry detected, self-healing");
            let event = self.reset(SessionEndReason::Expired).await?;
            return Ok((StatusView::idle(site_count), Some(event)));
        }

        let remaining = state.remaining(now);
        if let Some(remaining) = remaining {
            debug!(remaining = %firebreak_util::format_duration(remaining), "Status queried");
        }

        Ok((
            StatusView {
                phase: state.phase(),
                end_time: state.end_time,
                remaining,
                site_count,
            },
            None,
        ))
    }

    /// Supervisory reconciliation: re-derive everything from persisted
    /// state so that rules are present iff a session is running.
    ///
    /// Called on process start (repairs a crash between the rule
    /// engine's remove and add, or a missed wake-up while the process
    /// was down) and after site-list changes (keeps an active session's
    /// rules tracking the current list).
    pub async fn resync(&self, now: DateTime<Utc>) -> CoreResult<Option<CoreEvent>> {
        let _guard = self.session_lock.lock().await;

        let state = SessionState::load(&*self.store).await?;

        if state.is_expired(now) {
            info!("Expired session found during resync");
            let event = self.reset(SessionEndReason::Expired).await?;
            return Ok(Some(event));
        }

        if state.running {
            let count = self.rules.enable().await?;
            debug!(count, "Resync: session active, rules re-derived");
        } else {
            self.rules.disable().await?;
            debug!("Resync: idle, rules cleared");
        }

        Ok(None)
    }

    /// The shared reset path: clear the record, cancel the wake-up,
    /// remove the rules. Caller must hold `session_lock`.
    async fn reset(&self, reason: SessionEndReason) -> CoreResult<CoreEvent> {
        SessionState::idle().persist(&*self.store).await?;
        self.scheduler.cancel(SESSION_TIMER).await?;
        self.rules.disable().await?;

        let _ = self
            .audit
            .append(AuditEvent::new(AuditEventType::SessionEnded { reason }))
            .await;

        info!(?reason, "Session ended");
        Ok(CoreEvent::SessionEnded { reason })
    }
}
