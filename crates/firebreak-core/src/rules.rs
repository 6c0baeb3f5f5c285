//! Declarative rule-set synchronizer

use firebreak_api::{BlockRule, ResourceType, RuleAction};
use firebreak_host_api::RuleEngine;
use firebreak_store::KvStore;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{load_sites, CoreResult};

/// Keeps the rule engine's installed set equal to the set derived from
/// the current site list and the enabled flag.
///
/// Every transition replaces the set wholesale: remove everything
/// currently installed, then add the freshly derived rules. The two
/// steps are sequential, not a transaction — a crash in between leaves
/// zero rules installed, and the supervisory resync on process start
/// re-derives the set from persisted state.
pub struct RuleSynchronizer {
    store: Arc<dyn KvStore>,
    engine: Arc<dyn RuleEngine>,
}

impl RuleSynchronizer {
    pub fn new(store: Arc<dyn KvStore>, engine: Arc<dyn RuleEngine>) -> Self {
        Self { store, engine }
    }

    /// Install the rule set derived from the current site list.
    /// Idempotent: an unchanged list derives an identical set. An empty
    /// list installs zero rules without error.
    pub async fn enable(&self) -> CoreResult<usize> {
        let sites = load_sites(&*self.store).await?;
        let rules = derive_rules(&sites);
        let count = rules.len();

        self.replace_with(rules).await?;

        info!(count, "Block rules installed");
        Ok(count)
    }

    /// Remove all managed rules. No-op when none exist.
    pub async fn disable(&self) -> CoreResult<()> {
        self.replace_with(Vec::new()).await?;
        debug!("Block rules removed");
        Ok(())
    }

    async fn replace_with(&self, rules: Vec<BlockRule>) -> CoreResult<()> {
        let existing = self.engine.list_active().await?;
        let remove_ids: Vec<u32> = existing.iter().map(|r| r.id).collect();

        if remove_ids.is_empty() && rules.is_empty() {
            return Ok(());
        }

        self.engine.replace(remove_ids, rules).await?;
        Ok(())
    }
}

/// Derive the full rule set for a site list: one block rule per site,
/// sequential ids starting at 1 in list order, URL-prefix filter, all
/// resource categories.
pub fn derive_rules(sites: &[String]) -> Vec<BlockRule> {
    sites
        .iter()
        .enumerate()
        .map(|(index, site)| BlockRule {
            id: index as u32 + 1,
            priority: 1,
            action: RuleAction::Block,
            url_filter: format!("||{}", site),
            resource_types: ResourceType::ALL.to_vec(),
        })
        .collect()
}
