//! In-memory store for unit and integration tests

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::{AuditEvent, AuditLog, KvStore, StoreResult};

/// In-memory store implementing the same contracts as [`SqliteStore`].
///
/// Also offers failure injection so tests can exercise the
/// storage-error paths.
///
/// [`SqliteStore`]: crate::SqliteStore
#[derive(Default)]
pub struct MemoryStore {
    kv: Mutex<HashMap<String, Value>>,
    audit: Mutex<Vec<AuditEvent>>,

    /// When true, `get` and `set` fail
    pub fail_kv: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peek at a raw stored value (test helper)
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.kv.lock().unwrap().get(key).cloned()
    }

    pub fn set_fail_kv(&self, fail: bool) {
        *self.fail_kv.lock().unwrap() = fail;
    }

    fn check_fail(&self) -> StoreResult<()> {
        if *self.fail_kv.lock().unwrap() {
            return Err(crate::StoreError::Database("injected failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> StoreResult<HashMap<String, Value>> {
        self.check_fail()?;
        let kv = self.kv.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|k| kv.get(*k).map(|v| ((*k).to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, Value>) -> StoreResult<()> {
        self.check_fail()?;
        self.kv.lock().unwrap().extend(entries);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        !*self.fail_kv.lock().unwrap()
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn append(&self, mut event: AuditEvent) -> StoreResult<()> {
        let mut audit = self.audit.lock().unwrap();
        event.id = audit.len() as i64 + 1;
        audit.push(event);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let audit = self.audit.lock().unwrap();
        Ok(audit.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_round_trip() {
        let store = MemoryStore::new();

        let mut entries = HashMap::new();
        entries.insert("locked".to_string(), json!(true));
        store.set(entries).await.unwrap();

        let got = store.get(&["locked"]).await.unwrap();
        assert_eq!(got.get("locked"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn injected_failure_surfaces() {
        let store = MemoryStore::new();
        store.set_fail_kv(true);

        assert!(store.get(&["running"]).await.is_err());
        assert!(!store.is_healthy());
    }
}
