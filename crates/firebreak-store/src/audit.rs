//! Audit event types

use chrono::{DateTime, Utc};
use firebreak_api::SessionEndReason;
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Session started
    SessionStarted {
        end_time: DateTime<Utc>,
        locked: bool,
        site_count: usize,
    },

    /// Session ended
    SessionEnded { reason: SessionEndReason },

    /// Stop attempted while locked
    StopRejected,

    /// The block list changed
    SitesChanged { site_count: usize },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: Utc::now(),
            event,
        }
    }
}
