//! Background tasks module
//!
//! Drivers that run a room alongside the HTTP server: a frame driver on the
//! render cadence, a countdown driver for the timer, and simulated companions.

pub mod companion;
pub mod countdown;
pub mod frame_driver;

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use crate::{
    sync::Room,
    transport::{Clock, Transport},
};

// Re-export main functions
pub use companion::Companion;
pub use countdown::countdown_driver;
pub use frame_driver::frame_driver;

/// A room shared between drivers and request handlers
pub type SharedRoom<T, C> = Arc<Mutex<Room<T, C>>>;

/// Handles of the tasks driving one room; aborted on drop
#[derive(Default)]
pub struct Drivers {
    handles: Vec<JoinHandle<()>>,
}

impl Drivers {
    /// Spawn the frame and countdown drivers for a room
    pub fn spawn<T, C>(room: SharedRoom<T, C>, label: impl Into<String>) -> Self
    where
        T: Transport + 'static,
        C: Clock + 'static,
    {
        let label = label.into();
        let frame = tokio::spawn(frame_driver(Arc::clone(&room), label.clone()));
        let countdown = tokio::spawn(countdown_driver(room, label));
        Self {
            handles: vec![frame, countdown],
        }
    }

    pub fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Abort every task
    pub fn stop(mut self) {
        self.abort_all();
    }

    fn abort_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Drivers {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{
        state::{Identity, TimerMode},
        sync::{ConnectionStatus, RoomSettings},
        transport::{MemoryHub, SystemClock},
    };

    fn shared_room(hub: &MemoryHub, id: &str) -> SharedRoom<MemoryHub, SystemClock> {
        let mut room = Room::new(hub.clone(), SystemClock, Identity::new(id, id, "#BFDBFE"), RoomSettings::default()).unwrap();
        room.open();
        Arc::new(Mutex::new(room))
    }

    #[tokio::test]
    async fn test_drivers_connect_and_run_timer() {
        let hub = MemoryHub::new();
        let room = shared_room(&hub, "guest-local1");
        room.lock().unwrap().toggle_running();

        let drivers = Drivers::spawn(Arc::clone(&room), "local");
        assert_eq!(drivers.len(), 2);
        tokio::time::sleep(Duration::from_millis(600)).await;

        {
            let room = room.lock().unwrap();
            assert_eq!(room.connection_status(), ConnectionStatus::Connected);
            assert!(room.timer_state().remaining_ms < 1_500_000);
        }
        drivers.stop();
    }

    #[tokio::test]
    async fn test_companion_shows_up_and_leaves() {
        let hub = MemoryHub::new();
        let room = shared_room(&hub, "guest-local2");
        let drivers = Drivers::spawn(Arc::clone(&room), "local");

        let companion = Companion::spawn(hub.clone(), SystemClock, RoomSettings::default()).unwrap();
        assert_eq!(companion.room().lock().unwrap().timer_state().mode, TimerMode::Shared);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(room.lock().unwrap().online_count(), 1);

        companion.leave();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(room.lock().unwrap().online_count(), 0);
        drivers.stop();
    }
}
