//! Timer state structure and its pure transitions
//!
//! Every transition takes the current time explicitly and returns a new
//! `TimerState`; nothing here reads the clock or mutates in place.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// Milliseconds, either a duration or a timestamp since the Unix epoch
pub type Millis = i64;

/// Whether the timer is private to one actor or synchronized with the room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Solo,
    Shared,
}

/// The two alternating phases of the pomodoro cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Focus,
    Break,
}

impl TimerPhase {
    /// The phase that follows this one
    pub fn next(self) -> Self {
        match self {
            TimerPhase::Focus => TimerPhase::Break,
            TimerPhase::Break => TimerPhase::Focus,
        }
    }

    /// Recognizes exactly `"focus"` and `"break"`
    pub fn is_valid(value: &str) -> bool {
        value.parse::<TimerPhase>().is_ok()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerPhase::Focus => "focus",
            TimerPhase::Break => "break",
        }
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "focus" => Ok(TimerPhase::Focus),
            "break" => Ok(TimerPhase::Break),
            other => Err(format!("unknown timer phase: {}", other)),
        }
    }
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerMode::Solo => "solo",
            TimerMode::Shared => "shared",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solo" => Ok(TimerMode::Solo),
            "shared" => Ok(TimerMode::Shared),
            other => Err(format!("unknown timer mode: {}", other)),
        }
    }
}

/// Configured phase lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerDurations {
    pub focus_duration_ms: Millis,
    pub break_duration_ms: Millis,
}

impl TimerDurations {
    pub fn new(focus_duration_ms: Millis, break_duration_ms: Millis) -> Self {
        Self {
            focus_duration_ms,
            break_duration_ms,
        }
    }

    /// Build durations from whole minutes
    ///
    /// Minute counts too large to express in milliseconds are rejected as
    /// `InvalidDuration`, as are non-positive ones.
    pub fn from_minutes(focus_minutes: i64, break_minutes: i64) -> Result<Self, TimerError> {
        match (focus_minutes.checked_mul(60_000), break_minutes.checked_mul(60_000)) {
            (Some(focus_ms), Some(break_ms)) => {
                let durations = Self::new(focus_ms, break_ms);
                durations.validate()?;
                Ok(durations)
            }
            _ => Err(TimerError::InvalidDuration {
                focus_ms: focus_minutes.saturating_mul(60_000),
                break_ms: break_minutes.saturating_mul(60_000),
            }),
        }
    }

    /// Both durations must be strictly positive
    pub fn validate(&self) -> Result<(), TimerError> {
        if self.focus_duration_ms <= 0 || self.break_duration_ms <= 0 {
            return Err(TimerError::InvalidDuration {
                focus_ms: self.focus_duration_ms,
                break_ms: self.break_duration_ms,
            });
        }
        Ok(())
    }

    /// Full length of the given phase
    pub fn for_phase(&self, phase: TimerPhase) -> Millis {
        match phase {
            TimerPhase::Focus => self.focus_duration_ms,
            TimerPhase::Break => self.break_duration_ms,
        }
    }
}

impl Default for TimerDurations {
    fn default() -> Self {
        Self::new(25 * 60_000, 5 * 60_000)
    }
}

/// Snapshot of the pomodoro clock
///
/// This is also the wire format of a shared timer snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: TimerMode,
    pub phase: TimerPhase,
    pub remaining_ms: Millis,
    pub is_running: bool,
    pub last_updated_at: Millis,
}

impl TimerState {
    /// Create a stopped timer at the start of a focus phase
    pub fn new(mode: TimerMode, durations: &TimerDurations, now: Millis) -> Result<Self, TimerError> {
        durations.validate()?;
        Ok(Self {
            mode,
            phase: TimerPhase::Focus,
            remaining_ms: durations.focus_duration_ms,
            is_running: false,
            last_updated_at: now,
        })
    }

    /// Start or pause the countdown
    pub fn toggle_running(&self, now: Millis) -> Self {
        Self {
            is_running: !self.is_running,
            last_updated_at: now,
            ..*self
        }
    }

    /// Back to a stopped, full focus phase regardless of progress
    pub fn reset(&self, durations: &TimerDurations, now: Millis) -> Result<Self, TimerError> {
        durations.validate()?;
        Ok(Self {
            phase: TimerPhase::Focus,
            remaining_ms: durations.focus_duration_ms,
            is_running: false,
            last_updated_at: now,
            ..*self
        })
    }

    /// Jump to the other phase with its full duration, keeping the running flag
    pub fn skip_phase(&self, durations: &TimerDurations, now: Millis) -> Result<Self, TimerError> {
        durations.validate()?;
        let phase = self.phase.next();
        Ok(Self {
            phase,
            remaining_ms: durations.for_phase(phase),
            last_updated_at: now,
            ..*self
        })
    }

    /// Advance the countdown to `now`
    ///
    /// Stopped timers and zero-elapsed ticks return `self` unchanged. When the
    /// countdown reaches zero the phase flips and the next phase starts at its
    /// full duration; elapsed time past the boundary is dropped rather than
    /// carried over, so the clock re-anchors at each phase change.
    pub fn tick(&self, now: Millis, durations: &TimerDurations) -> Result<Self, TimerError> {
        durations.validate()?;
        if !self.is_running {
            return Ok(*self);
        }
        if now < self.last_updated_at {
            return Err(TimerError::BackwardTick {
                now,
                last_updated_at: self.last_updated_at,
            });
        }

        let elapsed = now - self.last_updated_at;
        if elapsed == 0 {
            return Ok(*self);
        }

        let remaining = self.remaining_ms.saturating_sub(elapsed).max(0);
        let (phase, remaining_ms) = if remaining == 0 {
            let next = self.phase.next();
            (next, durations.for_phase(next))
        } else {
            (self.phase, remaining)
        };

        Ok(Self {
            phase,
            remaining_ms,
            last_updated_at: now,
            ..*self
        })
    }

    /// Switch between solo and shared mode
    ///
    /// Leaving shared mode always starts a fresh solo timer. Joining shared mode
    /// adopts the last known shared snapshot when there is one.
    pub fn toggle_mode(
        &self,
        durations: &TimerDurations,
        shared_snapshot: Option<&TimerState>,
        now: Millis,
    ) -> Result<Self, TimerError> {
        durations.validate()?;
        match (self.mode, shared_snapshot) {
            (TimerMode::Shared, _) => Self::new(TimerMode::Solo, durations, now),
            (TimerMode::Solo, Some(snapshot)) => Ok(Self {
                mode: TimerMode::Shared,
                last_updated_at: now,
                ..*snapshot
            }),
            (TimerMode::Solo, None) => Self::new(TimerMode::Shared, durations, now),
        }
    }

    /// Re-align an idle timer after the configured durations changed
    ///
    /// Running timers keep their countdown.
    pub fn with_durations(&self, durations: &TimerDurations, now: Millis) -> Result<Self, TimerError> {
        durations.validate()?;
        let target = self.phase_duration(durations);
        if self.is_running || self.remaining_ms == target {
            return Ok(*self);
        }
        Ok(Self {
            remaining_ms: target,
            last_updated_at: now,
            ..*self
        })
    }

    /// Full configured length of the current phase
    pub fn phase_duration(&self, durations: &TimerDurations) -> Millis {
        durations.for_phase(self.phase)
    }

    /// Whole seconds left, rounded up, for display
    pub fn remaining_seconds(&self) -> i64 {
        self.remaining_ms.max(0).saturating_add(999) / 1000
    }

    pub fn is_shared(&self) -> bool {
        self.mode == TimerMode::Shared
    }
}
