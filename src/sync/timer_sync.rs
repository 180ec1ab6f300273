//! Shared timer bookkeeping
//!
//! Two slots are kept: `live` is what this client shows and
//! authors, `shared_snapshot` is the last shared timer seen on the wire. A
//! snapshot is always cached, but it only replaces `live` while in shared mode.

use tracing::{debug, trace, warn};

use crate::{
    error::TimerError,
    state::{Millis, TimerDurations, TimerMode, TimerState},
};

/// Minimum spacing between tick-driven timer broadcasts
pub const TIMER_BROADCAST_INTERVAL_MS: Millis = 1000;

#[derive(Debug, Clone)]
pub struct TimerSync {
    live: TimerState,
    shared_snapshot: Option<TimerState>,
    durations: TimerDurations,
    last_broadcast_at: Millis,
}

impl TimerSync {
    /// Start with a stopped solo timer
    pub fn new(durations: TimerDurations, now: Millis) -> Result<Self, TimerError> {
        Ok(Self {
            live: TimerState::new(TimerMode::Solo, &durations, now)?,
            shared_snapshot: None,
            durations,
            last_broadcast_at: 0,
        })
    }

    pub fn state(&self) -> &TimerState {
        &self.live
    }

    pub fn shared_snapshot(&self) -> Option<&TimerState> {
        self.shared_snapshot.as_ref()
    }

    pub fn durations(&self) -> &TimerDurations {
        &self.durations
    }

    /// Replace the configured durations, re-aligning an idle timer
    pub fn set_durations(&mut self, durations: TimerDurations, now: Millis) -> Result<(), TimerError> {
        let live = self.live.with_durations(&durations, now)?;
        self.durations = durations;
        self.live = live;
        Ok(())
    }

    /// Install a locally authored state; returns the snapshot to broadcast
    fn author(&mut self, next: TimerState, now: Millis) -> Option<TimerState> {
        let stamped = TimerState {
            last_updated_at: now,
            ..next
        };
        self.live = stamped;
        if !stamped.is_shared() {
            return None;
        }
        self.shared_snapshot = Some(stamped);
        self.last_broadcast_at = now;
        Some(stamped)
    }

    pub fn toggle_running(&mut self, now: Millis) -> Option<TimerState> {
        let next = self.live.toggle_running(now);
        self.author(next, now)
    }

    pub fn reset(&mut self, now: Millis) -> Result<Option<TimerState>, TimerError> {
        let next = self.live.reset(&self.durations, now)?;
        Ok(self.author(next, now))
    }

    pub fn skip_phase(&mut self, now: Millis) -> Result<Option<TimerState>, TimerError> {
        let next = self.live.skip_phase(&self.durations, now)?;
        Ok(self.author(next, now))
    }

    /// Optimistically switch modes; nothing is broadcast
    pub fn toggle_mode(&mut self, now: Millis) -> Result<TimerState, TimerError> {
        let next = self
            .live
            .toggle_mode(&self.durations, self.shared_snapshot.as_ref(), now)?;
        debug!("Timer mode {} -> {}", self.live.mode, next.mode);
        self.live = next;
        Ok(next)
    }

    /// Advance the live timer; returns a snapshot when one is due on the wire
    ///
    /// Only shared timers broadcast, at most once per interval, and only when
    /// the tick moved the countdown or the phase.
    pub fn tick(&mut self, now: Millis) -> Result<Option<TimerState>, TimerError> {
        let previous = self.live;
        let updated = previous.tick(now, &self.durations)?;
        self.live = updated;

        let changed = updated.remaining_ms != previous.remaining_ms || updated.phase != previous.phase;
        if updated.is_shared() && changed && now - self.last_broadcast_at >= TIMER_BROADCAST_INTERVAL_MS {
            self.last_broadcast_at = now;
            self.shared_snapshot = Some(updated);
            return Ok(Some(updated));
        }
        Ok(None)
    }

    /// Take in a snapshot from a peer, stamped with our receive time
    ///
    /// Returns whether the live timer was replaced. Snapshots with a negative
    /// `remaining_ms` are ignored and leave both slots untouched.
    pub fn receive_snapshot(&mut self, incoming: TimerState, now: Millis) -> bool {
        if incoming.remaining_ms < 0 {
            warn!("Ignoring timer snapshot with negative remaining time: {}ms", incoming.remaining_ms);
            return false;
        }
        let normalized = TimerState {
            mode: TimerMode::Shared,
            last_updated_at: now,
            ..incoming
        };
        self.shared_snapshot = Some(normalized);
        if self.live.is_shared() {
            trace!("Adopting shared timer snapshot: {:?}", normalized);
            self.live = normalized;
            true
        } else {
            false
        }
    }

    /// Our answer to a peer's sync request, if we are in shared mode
    pub fn answer_sync_request(&mut self, now: Millis) -> Option<TimerState> {
        if !self.live.is_shared() {
            return None;
        }
        let snapshot = TimerState {
            last_updated_at: now,
            ..self.live
        };
        self.shared_snapshot = Some(snapshot);
        self.last_broadcast_at = now;
        Some(snapshot)
    }
}
