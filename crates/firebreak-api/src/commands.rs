//! Command types for the firebreakd protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use firebreak_util::ClientId;

use crate::API_VERSION;

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidDuration,
    SessionLocked,
    InvalidSite,
    DuplicateSite,
    StorageError,
    SchedulerError,
    RuleEngineError,
    InternalError,
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Start a focus session
    Start {
        duration_minutes: i64,
        #[serde(default)]
        strict: bool,
    },

    /// Stop the current session (rejected while locked)
    Stop,

    /// Add a hostname to the block list
    AddSite { host: String },

    /// Remove a hostname from the block list
    RemoveSite { host: String },

    /// List the current block list
    ListSites,

    /// Get session status (self-heals a missed expiry)
    Status,

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    Started {
        end_time: DateTime<Utc>,
        locked: bool,
    },
    Stopped,
    Status(crate::StatusView),
    Sites {
        sites: Vec<String>,
    },
    Subscribed {
        client_id: ClientId,
    },
    Health(crate::HealthStatus),
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StatusView;

    #[test]
    fn request_serialization() {
        let req = Request::new(
            1,
            Command::Start {
                duration_minutes: 30,
                strict: true,
            },
        );
        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 1);
        assert!(matches!(
            parsed.command,
            Command::Start {
                duration_minutes: 30,
                strict: true
            }
        ));
    }

    #[test]
    fn strict_defaults_to_false() {
        let json = r#"{"request_id":2,"api_version":1,"command":{"type":"start","duration_minutes":25}}"#;
        let parsed: Request = serde_json::from_str(json).unwrap();
        assert!(matches!(
            parsed.command,
            Command::Start {
                duration_minutes: 25,
                strict: false
            }
        ));
    }

    #[test]
    fn response_serialization() {
        let resp = Response::success(1, ResponsePayload::Status(StatusView::idle(0)));

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.request_id, 1);
        assert!(matches!(
            parsed.result,
            ResponseResult::Ok(ResponsePayload::Status(_))
        ));
    }

    #[test]
    fn error_response_serialization() {
        let resp = Response::error(
            7,
            ErrorInfo::new(ErrorCode::SessionLocked, "strict mode is active"),
        );

        let json = serde_json::to_string(&resp).unwrap();
        let parsed: Response = serde_json::from_str(&json).unwrap();

        match parsed.result {
            ResponseResult::Err(e) => assert_eq!(e.code, ErrorCode::SessionLocked),
            ResponseResult::Ok(_) => panic!("expected error"),
        }
    }
}
