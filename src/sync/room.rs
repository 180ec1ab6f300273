//! The room orchestrator
//!
//! A `Room` owns the timer slots and the presence reconciler for one local
//! actor and connects them to two transport channels: a presence channel for
//! avatars and a broadcast channel for the shared timer. Everything is driven
//! from outside: call `pump` to consume inbound events, `frame` on the render
//! cadence, `tick_timer` on the countdown cadence and `maintain` to retry
//! failed connections.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::{connection::ConnectionStatus, timer_sync::TimerSync};
use crate::{
    error::{RoomError, TimerError},
    presence::{PresenceNotice, Reconciler, ReconcilerSettings, RenderAvatar},
    protocol::{SyncRequest, TimerMessage},
    state::{Identity, Millis, TimerDurations, TimerState},
    transport::{Channel, ChannelConfig, ChannelEvent, ChannelStatus, Clock, Transport},
};

pub const PRESENCE_CHANNEL: &str = "studyharbor-room";
pub const TIMER_CHANNEL: &str = "studyharbor-room-timer";

/// How many join/leave notices the room remembers
pub const MAX_NOTICES: usize = 32;

pub const DEFAULT_RECONNECT_INTERVAL_MS: Millis = 5_000;

/// Per-room knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomSettings {
    pub durations: TimerDurations,
    pub low_power: bool,
    pub share_status: bool,
    pub reconnect_interval_ms: Millis,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            durations: TimerDurations::default(),
            low_power: false,
            share_status: false,
            reconnect_interval_ms: DEFAULT_RECONNECT_INTERVAL_MS,
        }
    }
}

/// A join/leave notice with the time it was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedNotice {
    pub at: Millis,
    pub message: String,
    #[serde(flatten)]
    pub notice: PresenceNotice,
}

struct Link<Ch> {
    channel: Option<Ch>,
    status: ConnectionStatus,
}

impl<Ch: Channel> Link<Ch> {
    fn idle() -> Self {
        Self {
            channel: None,
            status: ConnectionStatus::Idle,
        }
    }

    fn needs_connect(&self) -> bool {
        self.channel.is_none() || self.status == ConnectionStatus::Error
    }

    fn poll(&mut self) -> Option<ChannelEvent> {
        self.channel.as_mut().and_then(Channel::poll_event)
    }

    fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            debug!("Leaving channel {}", channel.name());
            channel.unsubscribe();
        }
        self.status = ConnectionStatus::Idle;
    }
}

pub struct Room<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    identity: Identity,
    reconnect_interval_ms: Millis,
    presence: Link<T::Channel>,
    timer_link: Link<T::Channel>,
    presence_ready: bool,
    open: bool,
    last_connect_attempt: Option<Millis>,
    reconciler: Reconciler,
    timer: TimerSync,
    notices: VecDeque<LoggedNotice>,
}

impl<T: Transport, C: Clock> Room<T, C> {
    /// Build a closed room; nothing touches the transport until `open`
    pub fn new(transport: T, clock: C, identity: Identity, settings: RoomSettings) -> Result<Self, TimerError> {
        let now = clock.now_ms();
        let timer = TimerSync::new(settings.durations, now)?;
        let reconciler = Reconciler::new(
            identity.clone(),
            ReconcilerSettings {
                low_power: settings.low_power,
                share_status: settings.share_status,
            },
        );

        Ok(Self {
            transport,
            clock,
            identity,
            reconnect_interval_ms: settings.reconnect_interval_ms,
            presence: Link::idle(),
            timer_link: Link::idle(),
            presence_ready: false,
            open: false,
            last_connect_attempt: None,
            reconciler,
            timer,
            notices: VecDeque::with_capacity(MAX_NOTICES),
        })
    }

    /// Subscribe to the room channels
    pub fn open(&mut self) {
        if self.open {
            return;
        }
        self.open = true;
        info!("{} ({}) entering the room", self.identity.display_name, self.identity.guest_id);
        self.connect();
    }

    /// Leave both channels and forget every peer. Safe to call repeatedly.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.presence_ready = false;
        self.presence.close();
        self.timer_link.close();
        self.reconciler.clear();
        info!("{} left the room", self.identity.display_name);
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn connect(&mut self) {
        self.last_connect_attempt = Some(self.clock.now_ms());

        if self.presence.needs_connect() {
            self.presence.close();
            self.presence_ready = false;
            self.presence.status = ConnectionStatus::Connecting;
            match self
                .transport
                .subscribe(PRESENCE_CHANNEL, ChannelConfig::keyed(self.identity.guest_id.clone()))
            {
                Ok(channel) => self.presence.channel = Some(channel),
                Err(e) => {
                    warn!("Failed to subscribe to {}: {}", PRESENCE_CHANNEL, e);
                    self.presence.status = ConnectionStatus::Error;
                }
            }
        }

        if self.timer_link.needs_connect() {
            self.timer_link.close();
            self.timer_link.status = ConnectionStatus::Connecting;
            match self.transport.subscribe(TIMER_CHANNEL, ChannelConfig::default()) {
                Ok(channel) => self.timer_link.channel = Some(channel),
                Err(e) => {
                    warn!("Failed to subscribe to {}: {}", TIMER_CHANNEL, e);
                    self.timer_link.status = ConnectionStatus::Error;
                }
            }
        }
    }

    /// Retry failed subscriptions once the reconnect interval has passed
    pub fn maintain(&mut self) {
        if !self.open {
            return;
        }
        let failing = self.presence.status == ConnectionStatus::Error
            || self.timer_link.status == ConnectionStatus::Error;
        if !failing {
            return;
        }
        let now = self.clock.now_ms();
        if let Some(last) = self.last_connect_attempt {
            if now - last < self.reconnect_interval_ms {
                return;
            }
        }
        info!("Reconnecting to room channels");
        self.connect();
    }

    /// Overall connectivity of both channels
    pub fn connection_status(&self) -> ConnectionStatus {
        self.presence.status.combine(self.timer_link.status)
    }

    /// Consume every queued inbound event; returns new join/leave notices
    pub fn pump(&mut self) -> Vec<PresenceNotice> {
        let mut notices = Vec::new();
        while let Some(event) = self.presence.poll() {
            self.handle_presence_event(event, &mut notices);
        }
        while let Some(event) = self.timer_link.poll() {
            self.handle_timer_event(event);
        }

        let now = self.clock.now_ms();
        for notice in &notices {
            if self.notices.len() == MAX_NOTICES {
                self.notices.pop_front();
            }
            self.notices.push_back(LoggedNotice {
                at: now,
                message: notice.message(),
                notice: notice.clone(),
            });
        }
        notices
    }

    fn handle_presence_event(&mut self, event: ChannelEvent, notices: &mut Vec<PresenceNotice>) {
        match event {
            ChannelEvent::Status(status) => {
                debug!("Presence channel status: {:?}", status);
                self.presence.status = ConnectionStatus::from_channel(status);
                self.presence_ready = false;
                if status == ChannelStatus::Subscribed {
                    self.track_presence();
                }
            }
            ChannelEvent::PresenceSync(members) => {
                notices.extend(self.reconciler.apply_presence_sync(&members));
            }
            ChannelEvent::Broadcast(broadcast) => {
                trace!("Ignoring {} on presence channel", broadcast.event);
            }
        }
    }

    fn handle_timer_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Status(status) => {
                debug!("Timer channel status: {:?}", status);
                self.timer_link.status = ConnectionStatus::from_channel(status);
                if status == ChannelStatus::Subscribed {
                    self.request_sync();
                }
            }
            ChannelEvent::PresenceSync(_) => {}
            ChannelEvent::Broadcast(broadcast) => match TimerMessage::from_broadcast(&broadcast) {
                Ok(Some(TimerMessage::Update(snapshot))) => {
                    let now = self.clock.now_ms();
                    if self.timer.receive_snapshot(snapshot, now) {
                        debug!("Adopted shared timer: {} {}ms", snapshot.phase, snapshot.remaining_ms);
                    }
                }
                Ok(Some(TimerMessage::RequestSync(request))) => {
                    let now = self.clock.now_ms();
                    if let Some(snapshot) = self.timer.answer_sync_request(now) {
                        debug!("Answering timer sync request from {}", request.requester_id);
                        self.send_timer(TimerMessage::Update(snapshot));
                    }
                }
                Ok(None) => trace!("Ignoring {} on timer channel", broadcast.event),
                Err(e) => warn!("Dropping malformed {} payload: {}", broadcast.event, e),
            },
        }
    }

    fn track_presence(&mut self) {
        let payload = self.reconciler.presence_payload(self.clock.now_ms());
        let Some(channel) = self.presence.channel.as_mut() else {
            return;
        };
        match payload.to_value().and_then(|value| channel.track(value)) {
            Ok(()) => self.presence_ready = true,
            Err(e) => {
                warn!("Presence track failed: {}", e);
                self.presence.status = ConnectionStatus::Error;
                self.presence_ready = false;
            }
        }
    }

    fn send_timer(&mut self, message: TimerMessage) {
        if !self.timer_link.status.is_connected() {
            debug!("Timer channel {}; keeping {} local", self.timer_link.status, message.event());
            return;
        }
        let Some(channel) = self.timer_link.channel.as_mut() else {
            return;
        };
        if let Err(e) = message.to_broadcast().and_then(|broadcast| channel.send(broadcast)) {
            warn!("Failed to send {}: {}", message.event(), e);
            self.timer_link.status = ConnectionStatus::Error;
        }
    }

    fn request_sync(&mut self) {
        self.send_timer(TimerMessage::RequestSync(SyncRequest {
            requester_id: self.identity.guest_id.clone(),
        }));
    }

    /// Advance avatars one frame and publish presence when due
    pub fn frame(&mut self) {
        let now = self.clock.now_ms();
        self.reconciler.advance(now);

        let ready = self.presence_ready && self.presence.status.is_connected();
        let Some(payload) = self.reconciler.take_broadcast(now, ready) else {
            return;
        };
        let Some(channel) = self.presence.channel.as_mut() else {
            return;
        };
        if let Err(e) = payload.to_value().and_then(|value| channel.track(value)) {
            warn!("Presence broadcast failed: {}", e);
            self.presence.status = ConnectionStatus::Error;
            self.presence_ready = false;
        }
    }

    /// Advance the countdown, broadcasting shared progress per policy
    ///
    /// A clock that went backwards is returned as `TimerError::BackwardTick`
    /// and leaves the timer untouched.
    pub fn tick_timer(&mut self) -> Result<(), TimerError> {
        let now = self.clock.now_ms();
        if let Some(snapshot) = self.timer.tick(now)? {
            self.send_timer(TimerMessage::Update(snapshot));
        }
        Ok(())
    }

    fn rejected(action: &str, e: TimerError) -> RoomError {
        warn!("Rejected {}: {}", action, e);
        RoomError::Timer(e)
    }

    /// Start or pause the timer
    pub fn toggle_running(&mut self) -> TimerState {
        let now = self.clock.now_ms();
        if let Some(snapshot) = self.timer.toggle_running(now) {
            self.send_timer(TimerMessage::Update(snapshot));
        }
        *self.timer.state()
    }

    pub fn reset_timer(&mut self) -> Result<TimerState, RoomError> {
        let now = self.clock.now_ms();
        let snapshot = self.timer.reset(now).map_err(|e| Self::rejected("reset", e))?;
        if let Some(snapshot) = snapshot {
            self.send_timer(TimerMessage::Update(snapshot));
        }
        Ok(*self.timer.state())
    }

    pub fn skip_phase(&mut self) -> Result<TimerState, RoomError> {
        let now = self.clock.now_ms();
        let snapshot = self.timer.skip_phase(now).map_err(|e| Self::rejected("skip", e))?;
        if let Some(snapshot) = snapshot {
            self.send_timer(TimerMessage::Update(snapshot));
        }
        Ok(*self.timer.state())
    }

    /// Switch solo/shared immediately, then ask peers for the live shared timer
    pub fn toggle_mode(&mut self) -> Result<TimerState, RoomError> {
        let now = self.clock.now_ms();
        let state = self.timer.toggle_mode(now).map_err(|e| Self::rejected("mode toggle", e))?;
        info!("Timer mode is now {}", state.mode);
        self.request_sync();
        Ok(state)
    }

    pub fn set_durations(&mut self, durations: TimerDurations) -> Result<TimerState, RoomError> {
        let now = self.clock.now_ms();
        self.timer
            .set_durations(durations, now)
            .map_err(|e| Self::rejected("duration change", e))?;
        Ok(*self.timer.state())
    }

    /// Point the local avatar at a new spot
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.reconciler.set_target(x, y);
    }

    pub fn set_status(&mut self, status: Option<&str>) {
        self.reconciler.set_status(status);
    }

    pub fn set_share_status(&mut self, share: bool) {
        self.reconciler.set_share_status(share);
    }

    pub fn set_hover(&mut self, id: &str, hovering: bool) {
        self.reconciler.set_hover(id, hovering);
    }

    pub fn set_low_power(&mut self, low_power: bool) {
        self.reconciler.set_low_power(low_power);
    }

    pub fn low_power(&self) -> bool {
        self.reconciler.settings().low_power
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn timer_state(&self) -> TimerState {
        *self.timer.state()
    }

    pub fn shared_snapshot(&self) -> Option<TimerState> {
        self.timer.shared_snapshot().copied()
    }

    pub fn durations(&self) -> TimerDurations {
        *self.timer.durations()
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn online_count(&self) -> usize {
        self.reconciler.online_count()
    }

    pub fn render_list(&self, width: f64, height: f64) -> Vec<RenderAvatar> {
        self.reconciler.render_list(width, height)
    }

    /// Recent join/leave notices, oldest first
    pub fn notices(&self) -> impl Iterator<Item = &LoggedNotice> {
        self.notices.iter()
    }
}

impl<T: Transport, C: Clock> Drop for Room<T, C> {
    fn drop(&mut self) {
        self.close();
    }
}
