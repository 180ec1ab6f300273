//! StudyHarbor - a shared study room with a synchronized focus timer
//!
//! This library provides the Pomodoro timer engine, avatar presence
//! reconciliation and the room orchestrator that keeps both in sync over a
//! pub/sub transport, plus the HTTP control surface used by the host binary.

pub mod api;
pub mod config;
pub mod error;
pub mod presence;
pub mod protocol;
pub mod state;
pub mod sync;
pub mod tasks;
pub mod transport;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use error::{RoomError, TimerError, TransportError};
pub use state::{AppState, Identity, TimerDurations, TimerMode, TimerPhase, TimerState};
pub use sync::{ConnectionStatus, Room, RoomSettings};
pub use utils::signals::shutdown_signal;
