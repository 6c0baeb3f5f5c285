//! Session state machine and rule synchronizer for firebreakd
//!
//! This crate is the heart of firebreakd, containing:
//! - Session state machine (Idle <-> Active, with a Locked sub-mode)
//! - Declarative block-rule derivation and wholesale replacement
//! - Site roster management
//! - Self-healing expiry for missed wake-ups
//!
//! The controller is stateless across calls: every operation re-derives
//! the session from the durable store, so the process can be restarted
//! (or suspended) at any point between calls.

mod controller;
mod events;
mod rules;
mod sites;
mod state;

pub use controller::*;
pub use events::*;
pub use rules::*;
pub use sites::*;
pub use state::*;

use firebreak_host_api::HostError;
use firebreak_store::StoreError;
use thiserror::Error;

/// Errors surfaced by core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Stop attempted while strict mode is active. Non-fatal; no state
    /// was changed.
    #[error("Strict mode is active; the session cannot be stopped")]
    Locked,

    /// Rejected before any mutation
    #[error("Invalid duration: {0} minutes")]
    InvalidDuration(i64),

    #[error("Invalid hostname: {0:?}")]
    InvalidSite(String),

    #[error("Already on the block list: {0}")]
    DuplicateSite(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Host(#[from] HostError),
}

pub type CoreResult<T> = Result<T, CoreError>;
