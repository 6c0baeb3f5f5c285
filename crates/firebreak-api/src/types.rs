//! Shared types for the firebreakd API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Phase of the session state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Active,
    ActiveLocked,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// User-initiated stop of an unlocked session
    Stopped,
    /// The wake-up timer fired (or expiry was detected by self-heal)
    Expired,
}

/// Status view for UI display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusView {
    pub phase: SessionPhase,
    /// Absolute expiry; present iff a session is active
    pub end_time: Option<DateTime<Utc>>,
    /// Time remaining; present iff a session is active
    pub remaining: Option<Duration>,
    /// Number of sites on the block list
    pub site_count: usize,
}

impl StatusView {
    pub fn idle(site_count: usize) -> Self {
        Self {
            phase: SessionPhase::Idle,
            end_time: None,
            remaining: None,
            site_count,
        }
    }
}

/// Request resource categories a block rule applies to.
///
/// The set mirrors the request classes the blocking engine distinguishes:
/// top-level documents, frames, scripted fetches, and subresources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    XmlHttpRequest,
    Script,
    Image,
    Stylesheet,
    Media,
    Websocket,
}

impl ResourceType {
    /// Every category, in the order rules list them.
    pub const ALL: [ResourceType; 8] = [
        ResourceType::MainFrame,
        ResourceType::SubFrame,
        ResourceType::XmlHttpRequest,
        ResourceType::Script,
        ResourceType::Image,
        ResourceType::Stylesheet,
        ResourceType::Media,
        ResourceType::Websocket,
    ];
}

/// Action a rule instructs the engine to take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Block,
}

/// A declarative request-blocking rule.
///
/// Derived wholesale from the site list; identifiers are sequential in
/// list order so recomputation over an unchanged list is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    /// URL-prefix filter, e.g. `||example.com`
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

/// Daemon health snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub store_healthy: bool,
    pub session_running: bool,
    pub active_rules: usize,
}
