//! The persisted session record

use chrono::{DateTime, Utc};
use firebreak_api::SessionPhase;
use firebreak_store::KvStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::CoreResult;

/// Persisted state keys
pub mod keys {
    pub const RUNNING: &str = "running";
    pub const END_TIME: &str = "end_time";
    pub const LOCKED: &str = "locked";
    pub const SITES: &str = "sites";
}

/// The single persisted session record.
///
/// Invariant: `locked` implies `running`, and `end_time` is present iff
/// `running`. The store offers no multi-key transaction, so [`load`]
/// normalizes whatever subset of fields is visible back into a record
/// that satisfies the invariant.
///
/// [`load`]: SessionState::load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub running: bool,
    pub end_time: Option<DateTime<Utc>>,
    pub locked: bool,
}

impl SessionState {
    /// The idle record: nothing running, nothing locked.
    pub fn idle() -> Self {
        Self {
            running: false,
            end_time: None,
            locked: false,
        }
    }

    /// An active record ending at `end_time`.
    pub fn active(end_time: DateTime<Utc>, locked: bool) -> Self {
        Self {
            running: true,
            end_time: Some(end_time),
            locked,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match (self.running, self.locked) {
            (false, _) => SessionPhase::Idle,
            (true, false) => SessionPhase::Active,
            (true, true) => SessionPhase::ActiveLocked,
        }
    }

    /// Time remaining, saturating at zero. `None` when idle.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.running {
            return None;
        }
        self.end_time
            .map(|end| firebreak_util::remaining_until(end, now))
    }

    /// Whether an active session's deadline has already passed. An
    /// active record with no deadline visible counts as expired: the
    /// write of `end_time` was lost, so the session cannot be enforced.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match (self.running, self.end_time) {
            (false, _) => false,
            (true, Some(end)) => end <= now,
            (true, None) => true,
        }
    }

    /// Load the record from the store, normalizing partial writes: a
    /// record that is not running drops any leftover lock or deadline.
    pub async fn load(store: &dyn KvStore) -> CoreResult<Self> {
        let fields = store
            .get(&[keys::RUNNING, keys::END_TIME, keys::LOCKED])
            .await?;

        let running = bool_field(&fields, keys::RUNNING);

        if !running {
            return Ok(Self::idle());
        }

        let end_time = fields
            .get(keys::END_TIME)
            .and_then(Value::as_i64)
            .and_then(firebreak_util::from_epoch_ms);

        Ok(Self {
            running: true,
            end_time,
            locked: bool_field(&fields, keys::LOCKED),
        })
    }

    /// The store entries representing this record. Absent optional
    /// fields are written as `null` so a reset clears a previous
    /// session's deadline.
    pub fn to_entries(&self) -> HashMap<String, Value> {
        let mut entries = HashMap::new();
        entries.insert(keys::RUNNING.to_string(), json!(self.running));
        entries.insert(
            keys::END_TIME.to_string(),
            match self.end_time {
                Some(end) => json!(firebreak_util::to_epoch_ms(end)),
                None => Value::Null,
            },
        );
        entries.insert(keys::LOCKED.to_string(), json!(self.locked));
        entries
    }

    pub async fn persist(&self, store: &dyn KvStore) -> CoreResult<()> {
        store.set(self.to_entries()).await?;
        Ok(())
    }
}

fn bool_field(fields: &HashMap<String, Value>, key: &str) -> bool {
    fields.get(key).and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use firebreak_store::MemoryStore;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn load_of_empty_store_is_idle() {
        let store = MemoryStore::new();
        let state = SessionState::load(&store).await.unwrap();
        assert_eq!(state, SessionState::idle());
        assert_eq!(state.phase(), firebreak_api::SessionPhase::Idle);
    }

    #[tokio::test]
    async fn persist_and_load_round_trip() {
        let store = MemoryStore::new();
        let state = SessionState::active(t(600), true);

        state.persist(&store).await.unwrap();
        let loaded = SessionState::load(&store).await.unwrap();

        assert_eq!(loaded, state);
        assert_eq!(loaded.phase(), firebreak_api::SessionPhase::ActiveLocked);
    }

    #[tokio::test]
    async fn load_normalizes_orphaned_lock() {
        // Simulate partial visibility: locked stuck true without running
        let store = MemoryStore::new();
        let mut entries = HashMap::new();
        entries.insert(keys::LOCKED.to_string(), json!(true));
        entries.insert(keys::END_TIME.to_string(), json!(123_456_789_i64));
        store.set(entries).await.unwrap();

        let state = SessionState::load(&store).await.unwrap();
        assert_eq!(state, SessionState::idle());
        assert!(!state.locked);
    }

    #[tokio::test]
    async fn reset_clears_previous_deadline() {
        let store = MemoryStore::new();

        SessionState::active(t(600), false)
            .persist(&store)
            .await
            .unwrap();
        SessionState::idle().persist(&store).await.unwrap();

        assert_eq!(store.raw(keys::END_TIME), Some(Value::Null));
        let loaded = SessionState::load(&store).await.unwrap();
        assert_eq!(loaded.end_time, None);
    }

    #[test]
    fn expiry_and_remaining() {
        let state = SessionState::active(t(60), false);

        assert!(!state.is_expired(t(0)));
        assert_eq!(state.remaining(t(0)), Some(Duration::from_secs(60)));

        assert!(state.is_expired(t(60)));
        assert!(state.is_expired(t(120)));
        assert_eq!(state.remaining(t(120)), Some(Duration::ZERO));
    }

    #[test]
    fn running_without_deadline_is_expired() {
        let state = SessionState {
            running: true,
            end_time: None,
            locked: false,
        };
        assert!(state.is_expired(t(0)));
    }

    #[test]
    fn locked_implies_running_in_all_constructors() {
        assert!(!SessionState::idle().locked);
        let active = SessionState::active(t(10), true);
        assert!(active.running && active.locked);
    }
}
