//! Room synchronization
//!
//! Glue between the timer engine, the presence reconciler and the transport.

pub mod connection;
pub mod room;
pub mod timer_sync;

pub use connection::ConnectionStatus;
pub use room::{LoggedNotice, Room, RoomSettings, MAX_NOTICES, PRESENCE_CHANNEL, TIMER_CHANNEL};
pub use timer_sync::{TimerSync, TIMER_BROADCAST_INTERVAL_MS};
