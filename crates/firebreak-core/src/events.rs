//! Core events emitted by the controller and roster

use chrono::{DateTime, Utc};
use firebreak_api::SessionEndReason;

/// Events emitted by core operations, consumed by the daemon loop
/// (logging, client broadcast).
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// Session started (or restarted over a running one)
    SessionStarted {
        end_time: DateTime<Utc>,
        locked: bool,
    },

    /// Session ended
    SessionEnded { reason: SessionEndReason },

    /// The block list changed
    SitesChanged { sites: Vec<String> },
}
