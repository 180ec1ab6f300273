//! Error types shared across the room core

use thiserror::Error;

use crate::state::Millis;

/// Failures raised by the timer engine transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    /// A focus or break duration was zero or negative
    #[error("timer durations must be greater than zero (focus={focus_ms}ms, break={break_ms}ms)")]
    InvalidDuration { focus_ms: Millis, break_ms: Millis },

    /// A tick arrived with a timestamp earlier than the last applied transition
    #[error("tick at {now} is earlier than last update at {last_updated_at}")]
    BackwardTick { now: Millis, last_updated_at: Millis },
}

/// Failures reported by a realtime transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is offline")]
    Offline,

    #[error("channel {0} is closed")]
    Closed(String),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures surfaced by room-level actions
#[derive(Debug, Error)]
pub enum RoomError {
    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T, E = RoomError> = std::result::Result<T, E>;
