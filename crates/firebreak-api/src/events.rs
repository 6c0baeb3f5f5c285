//! Event types for firebreakd -> client streaming

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SessionEndReason, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: firebreak_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Session has started
    SessionStarted {
        end_time: DateTime<Utc>,
        locked: bool,
    },

    /// Session has ended
    SessionEnded { reason: SessionEndReason },

    /// The block list changed
    SitesChanged { sites: Vec<String> },

    /// Service is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::SessionStarted {
            end_time: firebreak_util::now(),
            locked: false,
        });

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.api_version, API_VERSION);
        assert!(matches!(parsed.payload, EventPayload::SessionStarted { .. }));
    }

    #[test]
    fn session_ended_carries_reason() {
        let event = Event::new(EventPayload::SessionEnded {
            reason: SessionEndReason::Expired,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("expired"));
    }
}
