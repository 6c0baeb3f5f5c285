//! Raw TOML schema and the validated service config

use firebreak_util::{data_dir_without_env, socket_path_without_env};
use serde::Deserialize;
use std::path::PathBuf;

/// Raw configuration as deserialized from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    pub config_version: u32,

    #[serde(default)]
    pub service: RawService,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawService {
    pub socket_path: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    /// Where the rule engine materializes the active rule set
    pub rules_path: Option<PathBuf>,
}

/// Validated service configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub rules_path: PathBuf,
}

impl ServiceConfig {
    pub fn from_raw(raw: RawConfig) -> Self {
        let data_dir = raw
            .service
            .data_dir
            .unwrap_or_else(data_dir_without_env);

        let rules_path = raw
            .service
            .rules_path
            .unwrap_or_else(|| data_dir.join("rules.json"));

        Self {
            socket_path: raw
                .service
                .socket_path
                .unwrap_or_else(socket_path_without_env),
            data_dir,
            rules_path,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig {
            config_version: crate::CURRENT_CONFIG_VERSION,
            service: RawService::default(),
        })
    }
}
