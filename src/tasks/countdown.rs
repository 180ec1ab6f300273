//! Countdown driver: reconnects, timer ticks and shared timer broadcasts

use std::{sync::Mutex, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use super::SharedRoom;
use crate::{
    error::TimerError,
    sync::Room,
    transport::{Clock, Transport},
};

pub const COUNTDOWN_INTERVAL: Duration = Duration::from_millis(250);
pub const LOW_POWER_COUNTDOWN_INTERVAL: Duration = Duration::from_millis(1000);

enum Step {
    Ticked { low_power: bool },
    Stopped,
}

fn step<T: Transport, C: Clock>(room: &Mutex<Room<T, C>>, label: &str) -> Step {
    let mut room = match room.lock() {
        Ok(room) => room,
        Err(e) => {
            error!("Room lock poisoned in countdown driver: {}", e);
            return Step::Stopped;
        }
    };
    if !room.is_open() {
        return Step::Stopped;
    }

    room.maintain();
    for notice in room.pump() {
        info!("[{}] {}", label, notice.message());
    }
    match room.tick_timer() {
        Ok(()) => {}
        Err(e @ TimerError::BackwardTick { .. }) => {
            error!("[{}] Clock went backwards, timer left as is: {}", label, e);
        }
        Err(e) => error!("[{}] Timer tick failed: {}", label, e),
    }
    Step::Ticked { low_power: room.low_power() }
}

fn period(low_power: bool) -> Duration {
    if low_power { LOW_POWER_COUNTDOWN_INTERVAL } else { COUNTDOWN_INTERVAL }
}

/// Background task that advances the room's timer and keeps the connection alive
pub async fn countdown_driver<T, C>(room: SharedRoom<T, C>, label: String)
where
    T: Transport + 'static,
    C: Clock + 'static,
{
    info!("Starting countdown driver for {}", label);

    let mut low_power = false;
    let mut ticker = interval(period(low_power));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        match step(&room, &label) {
            Step::Stopped => break,
            Step::Ticked { low_power: now_low_power } if now_low_power != low_power => {
                low_power = now_low_power;
                ticker = interval(period(low_power));
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            }
            Step::Ticked { .. } => {}
        }
    }

    info!("Countdown driver for {} stopped", label);
}
