//! Simulated peers that keep the local room company

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use rand::Rng;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::{Drivers, SharedRoom};
use crate::{
    error::RoomError,
    state::{Identity, TimerMode},
    sync::{Room, RoomSettings},
    transport::{Clock, Transport},
};

/// Pause between two wander targets, in milliseconds
const WANDER_MIN_MS: u64 = 3_000;
const WANDER_MAX_MS: u64 = 9_000;

/// A simulated peer with its own room and drivers
pub struct Companion<T: Transport, C: Clock> {
    pub identity: Identity,
    room: SharedRoom<T, C>,
    drivers: Drivers,
}

impl<T, C> Companion<T, C>
where
    T: Transport + 'static,
    C: Clock + 'static,
{
    /// Join the room as a fresh guest and switch to the shared timer
    pub fn spawn(transport: T, clock: C, settings: RoomSettings) -> Result<Self, RoomError> {
        let identity = Identity::guest();
        let mut room = Room::new(transport, clock, identity.clone(), settings)?;
        room.open();
        if room.timer_state().mode != TimerMode::Shared {
            room.toggle_mode()?;
        }
        info!("Companion {} ({}) joined", identity.display_name, identity.guest_id);

        let room = Arc::new(Mutex::new(room));
        let mut drivers = Drivers::spawn(Arc::clone(&room), identity.display_name.clone());
        drivers.push(tokio::spawn(wander(Arc::clone(&room), identity.display_name.clone())));

        Ok(Self { identity, room, drivers })
    }

    pub fn room(&self) -> &SharedRoom<T, C> {
        &self.room
    }

    /// Stop the drivers and leave the room
    pub fn leave(self) {
        let Self { identity, room, drivers } = self;
        drivers.stop();
        match room.lock() {
            Ok(mut room) => room.close(),
            Err(e) => warn!("Companion {} room lock poisoned on leave: {}", identity.display_name, e),
        }
        info!("Companion {} left", identity.display_name);
    }
}

fn random_spot() -> (f64, f64) {
    let mut rng = rand::thread_rng();
    (rng.gen_range(0.1..0.9), rng.gen_range(0.45..0.9))
}

fn walk_to<T: Transport, C: Clock>(room: &Mutex<Room<T, C>>, x: f64, y: f64) -> bool {
    match room.lock() {
        Ok(mut room) if room.is_open() => {
            room.move_to(x, y);
            true
        }
        Ok(_) => false,
        Err(e) => {
            error!("Companion room lock poisoned: {}", e);
            false
        }
    }
}

/// Pick a new spot every few seconds
async fn wander<T, C>(room: SharedRoom<T, C>, label: String)
where
    T: Transport + 'static,
    C: Clock + 'static,
{
    loop {
        let pause = rand::thread_rng().gen_range(WANDER_MIN_MS..=WANDER_MAX_MS);
        sleep(Duration::from_millis(pause)).await;

        let (x, y) = random_spot();
        if !walk_to(&room, x, y) {
            break;
        }
    }
    info!("{} stopped wandering", label);
}
