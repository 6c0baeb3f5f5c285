//! Config validation

use crate::RawConfig;
use thiserror::Error;

/// A single validation failure with enough context to fix it
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("service.socket_path must not be empty")]
    EmptySocketPath,

    #[error("service.data_dir must not be empty")]
    EmptyDataDir,

    #[error("service.rules_path must not be empty")]
    EmptyRulesPath,
}

/// Validate a raw config, collecting every problem rather than stopping
/// at the first.
pub fn validate_config(raw: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if matches!(&raw.service.socket_path, Some(p) if p.as_os_str().is_empty()) {
        errors.push(ValidationError::EmptySocketPath);
    }

    if matches!(&raw.service.data_dir, Some(p) if p.as_os_str().is_empty()) {
        errors.push(ValidationError::EmptyDataDir);
    }

    if matches!(&raw.service.rules_path, Some(p) if p.as_os_str().is_empty()) {
        errors.push(ValidationError::EmptyRulesPath);
    }

    errors
}
