//! Avatar presence
//!
//! The local avatar walks toward a target chosen by user input, remote avatars
//! ease toward the positions their owners last published, and the membership
//! reports from the transport are diffed into join/leave notices.

pub mod motion;
pub mod reconciler;
pub mod status;

pub use motion::{approach, clamp_normalized, lerp, Position};
pub use reconciler::{PresenceNotice, Reconciler, ReconcilerSettings, RemoteActor, RenderAvatar};
pub use status::sanitize_status;

use crate::state::Millis;

/// Local avatar speed in normalized units per second
pub const MOVE_SPEED: f64 = 0.13;

/// Fraction of the remaining distance a remote avatar covers each frame
pub const REMOTE_SMOOTHING: f64 = 0.18;

pub const PRESENCE_BROADCAST_INTERVAL_MS: Millis = 120;
pub const LOW_POWER_BROADCAST_INTERVAL_MS: Millis = 1000;

/// Longest frame step applied to local movement
pub const MAX_FRAME_SECONDS: f64 = 0.12;
pub const LOW_POWER_MAX_FRAME_SECONDS: f64 = 1.0;

pub const MAX_STATUS_LENGTH: usize = 120;

/// Where a freshly joined local avatar stands
pub const START_POSITION: Position = Position { x: 0.5, y: 0.68 };
