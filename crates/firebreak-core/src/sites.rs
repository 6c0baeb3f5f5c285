//! Site roster: the persisted list of blocked hostnames

use firebreak_store::{AuditEvent, AuditEventType, AuditLog, KvStore};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::{keys, CoreError, CoreResult};

/// Load the site list from the store. Absent means empty.
pub async fn load_sites(store: &dyn KvStore) -> CoreResult<Vec<String>> {
    let fields = store.get(&[keys::SITES]).await?;
    let sites = fields
        .get(keys::SITES)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Ok(sites)
}

/// Owns the persisted site list: an ordered collection of distinct
/// hostnames. Order is insertion order (display order); rule derivation
/// only depends on it for stable identifiers.
///
/// The roster is the sole writer of the `sites` field; a mutex
/// serializes its read-modify-write cycles.
pub struct SiteRoster {
    store: Arc<dyn KvStore>,
    audit: Arc<dyn AuditLog>,
    write_lock: Mutex<()>,
}

impl SiteRoster {
    pub fn new(store: Arc<dyn KvStore>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            store,
            audit,
            write_lock: Mutex::new(()),
        }
    }

    /// Current list in insertion order
    pub async fn sites(&self) -> CoreResult<Vec<String>> {
        load_sites(&*self.store).await
    }

    /// Add a hostname. Rejects empty or malformed names and duplicates.
    /// Returns the updated list.
    pub async fn add(&self, host: &str) -> CoreResult<Vec<String>> {
        let host = normalize_host(host)?;

        let _guard = self.write_lock.lock().await;

        let mut sites = load_sites(&*self.store).await?;
        if sites.iter().any(|s| s == &host) {
            return Err(CoreError::DuplicateSite(host));
        }

        sites.push(host.clone());
        self.persist(&sites).await?;

        info!(host = %host, count = sites.len(), "Site added");
        Ok(sites)
    }

    /// Remove a hostname. Removing an absent host is a no-op.
    /// Returns the updated list.
    pub async fn remove(&self, host: &str) -> CoreResult<Vec<String>> {
        let _guard = self.write_lock.lock().await;

        let mut sites = load_sites(&*self.store).await?;
        let before = sites.len();
        sites.retain(|s| s != host);

        if sites.len() != before {
            self.persist(&sites).await?;
            info!(host = %host, count = sites.len(), "Site removed");
        }

        Ok(sites)
    }

    async fn persist(&self, sites: &[String]) -> CoreResult<()> {
        let mut entries = HashMap::new();
        entries.insert(keys::SITES.to_string(), json!(sites));
        self.store.set(entries).await?;

        let _ = self
            .audit
            .append(AuditEvent::new(AuditEventType::SitesChanged {
                site_count: sites.len(),
            }))
            .await;

        Ok(())
    }
}

/// Trim and sanity-check a user-supplied hostname.
fn normalize_host(host: &str) -> CoreResult<String> {
    let host = host.trim();

    if host.is_empty() || host.chars().any(char::is_whitespace) || host.contains('/') {
        return Err(CoreError::InvalidSite(host.to_string()));
    }

    Ok(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use firebreak_store::MemoryStore;

    fn roster() -> SiteRoster {
        let store = Arc::new(MemoryStore::new());
        SiteRoster::new(store.clone(), store)
    }

    #[tokio::test]
    async fn add_and_list_preserves_order() {
        let roster = roster();

        roster.add("b.com").await.unwrap();
        roster.add("a.com").await.unwrap();

        assert_eq!(roster.sites().await.unwrap(), vec!["b.com", "a.com"]);
    }

    #[tokio::test]
    async fn duplicate_add_is_rejected() {
        let roster = roster();

        roster.add("a.com").await.unwrap();
        let err = roster.add("a.com").await.unwrap_err();

        assert!(matches!(err, CoreError::DuplicateSite(_)));
        assert_eq!(roster.sites().await.unwrap(), vec!["a.com"]);
    }

    #[tokio::test]
    async fn add_then_remove_restores_prior_list() {
        let roster = roster();
        roster.add("keep.com").await.unwrap();
        let before = roster.sites().await.unwrap();

        roster.add("example.com").await.unwrap();
        roster.remove("example.com").await.unwrap();

        assert_eq!(roster.sites().await.unwrap(), before);
    }

    #[tokio::test]
    async fn remove_of_absent_host_is_noop() {
        let roster = roster();
        roster.add("a.com").await.unwrap();

        let sites = roster.remove("nope.com").await.unwrap();
        assert_eq!(sites, vec!["a.com"]);
    }

    #[tokio::test]
    async fn input_is_trimmed_and_validated() {
        let roster = roster();

        roster.add("  spaced.com  ").await.unwrap();
        assert_eq!(roster.sites().await.unwrap(), vec!["spaced.com"]);

        assert!(matches!(
            roster.add("").await.unwrap_err(),
            CoreError::InvalidSite(_)
        ));
        assert!(matches!(
            roster.add("https://a.com").await.unwrap_err(),
            CoreError::InvalidSite(_)
        ));
        assert!(matches!(
            roster.add("a.com/path").await.unwrap_err(),
            CoreError::InvalidSite(_)
        ));
    }
}
