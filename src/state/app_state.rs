//! Main application state management

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::{
    error::RoomError,
    sync::Room,
    transport::{MemoryHub, SystemClock},
};

/// The room driven by the host process
pub type LocalRoom = Room<MemoryHub, SystemClock>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("room lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Shared state for the HTTP handlers and background drivers
pub struct AppState {
    /// The local room; drivers and handlers take turns through the mutex
    pub room: Arc<Mutex<LocalRoom>>,
    /// Transport the local room and any companions are attached to
    pub hub: MemoryHub,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    pub fn new(room: LocalRoom, hub: MemoryHub, port: u16, host: String) -> Self {
        Self {
            room: Arc::new(Mutex::new(room)),
            hub,
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    /// Read from the room without recording an action
    pub fn read_room<F, R>(&self, reader: F) -> Result<R, StateError>
    where
        F: FnOnce(&LocalRoom) -> R,
    {
        let room = self.room.lock().map_err(|_| StateError::LockPoisoned)?;
        Ok(reader(&room))
    }

    /// Apply a user action to the room and remember it as the last action
    pub fn update_room<F, R>(&self, action: &str, updater: F) -> Result<R, StateError>
    where
        F: FnOnce(&mut LocalRoom) -> Result<R, RoomError>,
    {
        let mut room = self.room.lock().map_err(|_| StateError::LockPoisoned)?;
        let result = updater(&mut room)?;
        drop(room);

        debug!("Room action: {}", action);
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }

        Ok(result)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
