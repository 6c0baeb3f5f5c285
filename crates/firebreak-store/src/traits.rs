//! Store trait definitions

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::{AuditEvent, StoreResult};

/// Durable key/value store for session state and the site list.
///
/// Values are schema-free JSON. `set` acks each write, but there is no
/// multi-key transactional guarantee: a crash mid-write may leave a
/// subset of keys visible, and readers normalize on load. Clearing a
/// field is expressed by writing `null`; readers treat null and absent
/// alike.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch the requested keys. Absent keys are omitted from the map.
    async fn get(&self, keys: &[&str]) -> StoreResult<HashMap<String, Value>>;

    /// Write the given entries, overwriting existing values.
    async fn set(&self, entries: HashMap<String, Value>) -> StoreResult<()>;

    /// Check if the store is healthy
    fn is_healthy(&self) -> bool;
}

/// Append-only audit log
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append an audit event
    async fn append(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    async fn recent(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;
}
