//! Render-cadence driver: inbound events, avatar movement, presence publishing

use std::{sync::Mutex, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use super::SharedRoom;
use crate::{
    presence::PresenceNotice,
    sync::Room,
    transport::{Clock, Transport},
};

pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);
pub const LOW_POWER_FRAME_INTERVAL: Duration = Duration::from_millis(1000);

/// Outcome of one frame step; `None` when the room is gone
fn step<T: Transport, C: Clock>(room: &Mutex<Room<T, C>>) -> Option<(Vec<PresenceNotice>, bool)> {
    let mut room = match room.lock() {
        Ok(room) => room,
        Err(e) => {
            error!("Room lock poisoned in frame driver: {}", e);
            return None;
        }
    };
    if !room.is_open() {
        return None;
    }
    let notices = room.pump();
    room.frame();
    Some((notices, room.low_power()))
}

fn period(low_power: bool) -> Duration {
    if low_power { LOW_POWER_FRAME_INTERVAL } else { FRAME_INTERVAL }
}

/// Background task that pumps the room and advances avatars every frame
pub async fn frame_driver<T, C>(room: SharedRoom<T, C>, label: String)
where
    T: Transport + 'static,
    C: Clock + 'static,
{
    info!("Starting frame driver for {}", label);

    let mut low_power = false;
    let mut ticker = interval(period(low_power));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let Some((notices, now_low_power)) = step(&room) else {
            break;
        };
        for notice in &notices {
            info!("[{}] {}", label, notice.message());
        }

        if now_low_power != low_power {
            low_power = now_low_power;
            info!("[{}] Frame cadence now {:?}", label, period(low_power));
            ticker = interval(period(low_power));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }
    }

    info!("Frame driver for {} stopped", label);
}
