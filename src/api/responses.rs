//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    presence::RenderAvatar,
    state::{Identity, TimerDurations, TimerState},
    sync::{ConnectionStatus, LoggedNotice},
};

/// API response structure for room action endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerState,
    pub connection: ConnectionStatus,
}

impl ApiResponse {
    pub fn ok(message: String, timer: TimerState, connection: ConnectionStatus) -> Self {
        Self {
            status: "ok".to_string(),
            message,
            timestamp: Utc::now(),
            timer,
            connection,
        }
    }
}

/// Body returned when an action is rejected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(message: String) -> Self {
        Self {
            status: "error".to_string(),
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Full room snapshot for GET /status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub identity: Identity,
    pub timer: TimerState,
    pub remaining_seconds: i64,
    pub shared_snapshot: Option<TimerState>,
    pub durations: TimerDurations,
    pub connection: ConnectionStatus,
    /// Whether the in-process transport is currently reachable
    pub hub_online: bool,
    pub online_count: usize,
    pub low_power: bool,
    pub status_message: Option<String>,
    pub avatars: Vec<RenderAvatar>,
    pub notices: Vec<LoggedNotice>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
