//! Rules-file backed rule engine

use async_trait::async_trait;
use firebreak_api::BlockRule;
use firebreak_host_api::{HostError, HostResult, RuleEngine};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rule engine that materializes the active set as a JSON file.
///
/// The file is the handoff point to the external request matcher: it
/// always contains exactly the currently installed rules, and each
/// update replaces it atomically (write to a sibling temp file, then
/// rename). A missing file means zero rules.
pub struct FileRules {
    path: PathBuf,
}

impl FileRules {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> HostResult<Vec<BlockRule>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| HostError::RuleEngine(format!("corrupt rules file: {}", e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, rules: &[BlockRule]) -> HostResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let raw = serde_json::to_string_pretty(rules)
            .map_err(|e| HostError::RuleEngine(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), count = rules.len(), "Rules file written");
        Ok(())
    }
}

#[async_trait]
impl RuleEngine for FileRules {
    async fn list_active(&self) -> HostResult<Vec<BlockRule>> {
        self.load()
    }

    async fn replace(&self, remove_ids: Vec<u32>, add_rules: Vec<BlockRule>) -> HostResult<()> {
        let mut rules = self.load()?;
        rules.retain(|r| !remove_ids.contains(&r.id));
        rules.extend(add_rules);
        rules.sort_by_key(|r| r.id);
        self.persist(&rules)
    }
}
