//! State management module
//!
//! This module contains the timer engine, actor identity and the shared
//! application state used by the HTTP server.

pub mod app_state;
pub mod identity;
pub mod timer_state;

// Re-export main types
pub use app_state::{AppState, LocalRoom, StateError};
pub use identity::Identity;
pub use timer_state::{Millis, TimerDurations, TimerMode, TimerPhase, TimerState};
