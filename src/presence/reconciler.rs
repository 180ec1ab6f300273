//! Local and remote avatar position reconciliation

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{
    motion::{approach, lerp, Position},
    status::sanitize_status,
    LOW_POWER_BROADCAST_INTERVAL_MS, LOW_POWER_MAX_FRAME_SECONDS, MAX_FRAME_SECONDS, MOVE_SPEED,
    PRESENCE_BROADCAST_INTERVAL_MS, REMOTE_SMOOTHING, START_POSITION,
};
use crate::{
    protocol::PresencePayload,
    state::{Identity, Millis},
};

/// A peer as seen by this client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteActor {
    pub name: String,
    pub color: String,
    /// Rendered position, eased toward the target every frame
    pub x: f64,
    pub y: f64,
    /// Position from the last presence sync
    pub target_x: f64,
    pub target_y: f64,
    pub status: Option<String>,
}

/// Join or leave observed between two presence syncs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PresenceNotice {
    Joined { id: String, name: String, color: String },
    Left { id: String, name: String, color: String },
}

impl PresenceNotice {
    pub fn message(&self) -> String {
        match self {
            PresenceNotice::Joined { name, .. } => format!("{} joined", name),
            PresenceNotice::Left { name, .. } => format!("{} left", name),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            PresenceNotice::Joined { id, .. } | PresenceNotice::Left { id, .. } => id,
        }
    }
}

/// One avatar ready for presentation, in pixel space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderAvatar {
    pub id: String,
    pub name: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub is_self: bool,
    pub is_hovered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Behavior switches for the reconciler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Snap remotes to their targets and publish less often
    pub low_power: bool,
    /// Include the local status line in outbound presence
    pub share_status: bool,
}

/// Owns the local avatar and the map of remote avatars
#[derive(Debug)]
pub struct Reconciler {
    identity: Identity,
    settings: ReconcilerSettings,
    status: Option<String>,
    local: Position,
    target: Position,
    remotes: BTreeMap<String, RemoteActor>,
    previous_ids: HashSet<String>,
    hovered: Option<String>,
    last_frame_at: Option<Millis>,
    last_broadcast_at: Millis,
}

impl Reconciler {
    pub fn new(identity: Identity, settings: ReconcilerSettings) -> Self {
        Self {
            identity,
            settings,
            status: None,
            local: START_POSITION,
            target: START_POSITION,
            remotes: BTreeMap::new(),
            previous_ids: HashSet::new(),
            hovered: None,
            last_frame_at: None,
            last_broadcast_at: 0,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn settings(&self) -> ReconcilerSettings {
        self.settings
    }

    pub fn set_low_power(&mut self, low_power: bool) {
        self.settings.low_power = low_power;
        self.last_frame_at = None;
    }

    pub fn set_share_status(&mut self, share_status: bool) {
        self.settings.share_status = share_status;
    }

    /// Store the local status line, sanitized
    pub fn set_status(&mut self, status: Option<&str>) {
        self.status = sanitize_status(status);
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Where the local avatar is heading
    pub fn set_target(&mut self, x: f64, y: f64) {
        self.target = Position::clamped(x, y);
    }

    pub fn target(&self) -> Position {
        self.target
    }

    pub fn local_position(&self) -> Position {
        self.local
    }

    pub fn broadcast_interval_ms(&self) -> Millis {
        if self.settings.low_power {
            LOW_POWER_BROADCAST_INTERVAL_MS
        } else {
            PRESENCE_BROADCAST_INTERVAL_MS
        }
    }

    /// Advance one frame
    ///
    /// The local avatar walks toward its target at `MOVE_SPEED`; remote avatars
    /// ease toward theirs, or snap in low power mode.
    pub fn advance(&mut self, frame_time: Millis) {
        let previous = self.last_frame_at.unwrap_or(frame_time);
        self.last_frame_at = Some(frame_time);

        let max_delta = if self.settings.low_power {
            LOW_POWER_MAX_FRAME_SECONDS
        } else {
            MAX_FRAME_SECONDS
        };
        let delta_seconds = ((frame_time - previous) as f64 / 1000.0).min(max_delta);

        if delta_seconds > 0.0 {
            let step = MOVE_SPEED * delta_seconds;
            self.local.x = approach(self.local.x, self.target.x, step);
            self.local.y = approach(self.local.y, self.target.y, step);
        }

        for actor in self.remotes.values_mut() {
            if self.settings.low_power {
                actor.x = actor.target_x;
                actor.y = actor.target_y;
            } else {
                actor.x = lerp(actor.x, actor.target_x, REMOTE_SMOOTHING);
                actor.y = lerp(actor.y, actor.target_y, REMOTE_SMOOTHING);
            }
        }
    }

    /// The payload this actor publishes right now
    pub fn presence_payload(&self, now: Millis) -> PresencePayload {
        PresencePayload {
            id: self.identity.guest_id.clone(),
            name: self.identity.display_name.clone(),
            color: self.identity.color.clone(),
            x: self.local.x,
            y: self.local.y,
            updated_at: now,
            status: if self.settings.share_status {
                self.status.clone()
            } else {
                None
            },
        }
    }

    /// Presence to publish if the broadcast interval has passed
    pub fn take_broadcast(&mut self, now: Millis, channel_ready: bool) -> Option<PresencePayload> {
        if !channel_ready || now - self.last_broadcast_at <= self.broadcast_interval_ms() {
            return None;
        }
        self.last_broadcast_at = now;
        Some(self.presence_payload(now))
    }

    /// Rebuild the remote set from a full membership report
    ///
    /// Existing peers keep their eased position so motion continues smoothly;
    /// newcomers appear at their target. Returns joins then leaves relative
    /// to the previous report.
    pub fn apply_presence_sync(&mut self, members: &[Value]) -> Vec<PresenceNotice> {
        let mut next = BTreeMap::new();

        for member in members {
            let payload = match PresencePayload::from_member(member) {
                Ok(payload) => payload,
                Err(e) => {
                    debug!("Dropping malformed presence entry: {}", e);
                    continue;
                }
            };
            if payload.id.is_empty() || payload.id == self.identity.guest_id {
                continue;
            }

            let target = Position::clamped(payload.x, payload.y);
            let status = sanitize_status(payload.status.as_deref());
            let actor = match self.remotes.get(&payload.id) {
                Some(existing) => RemoteActor {
                    name: payload.name,
                    color: payload.color,
                    target_x: target.x,
                    target_y: target.y,
                    status,
                    ..existing.clone()
                },
                None => RemoteActor {
                    name: payload.name,
                    color: payload.color,
                    x: target.x,
                    y: target.y,
                    target_x: target.x,
                    target_y: target.y,
                    status,
                },
            };
            next.insert(payload.id, actor);
        }

        let current_ids: HashSet<String> = next.keys().cloned().collect();
        let mut notices = Vec::new();

        for (id, actor) in &next {
            if !self.previous_ids.contains(id) {
                notices.push(PresenceNotice::Joined {
                    id: id.clone(),
                    name: actor.name.clone(),
                    color: actor.color.clone(),
                });
            }
        }

        let mut departed: Vec<&String> = self.previous_ids.difference(&current_ids).collect();
        departed.sort();
        for id in departed {
            if let Some(actor) = self.remotes.get(id) {
                notices.push(PresenceNotice::Left {
                    id: id.clone(),
                    name: actor.name.clone(),
                    color: actor.color.clone(),
                });
            }
        }

        for notice in &notices {
            info!("{}", notice.message());
        }

        self.previous_ids = current_ids;
        self.remotes = next;
        notices
    }

    /// Pointer or focus entered/left an avatar; only one is hovered at a time
    pub fn set_hover(&mut self, id: &str, hovering: bool) {
        if hovering {
            self.hovered = Some(id.to_string());
        } else if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn remote(&self, id: &str) -> Option<&RemoteActor> {
        self.remotes.get(id)
    }

    /// Remote participants currently present
    pub fn online_count(&self) -> usize {
        self.remotes.len()
    }

    /// Self first, then remotes, scaled to a `width` x `height` viewport
    pub fn render_list(&self, width: f64, height: f64) -> Vec<RenderAvatar> {
        let hovered = self.hovered.as_deref();
        let mut list = Vec::with_capacity(self.remotes.len() + 1);

        list.push(RenderAvatar {
            id: self.identity.guest_id.clone(),
            name: self.identity.display_name.clone(),
            color: self.identity.color.clone(),
            x: self.local.x * width,
            y: self.local.y * height,
            is_self: true,
            is_hovered: hovered == Some(self.identity.guest_id.as_str()),
            status: if self.settings.share_status {
                self.status.clone()
            } else {
                None
            },
        });

        list.extend(self.remotes.iter().map(|(id, actor)| RenderAvatar {
            id: id.clone(),
            name: actor.name.clone(),
            color: actor.color.clone(),
            x: actor.x * width,
            y: actor.y * height,
            is_self: false,
            is_hovered: hovered == Some(id.as_str()),
            status: actor.status.clone(),
        }));

        list
    }

    /// Forget every peer, as when the presence subscription ends
    pub fn clear(&mut self) {
        self.remotes.clear();
        self.previous_ids.clear();
        self.last_frame_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reconciler() -> Reconciler {
        Reconciler::new(
            Identity::new("me", "Quiet Nook", "#BFDBFE"),
            ReconcilerSettings::default(),
        )
    }

    fn member(id: &str, name: &str, x: f64, y: f64) -> Value {
        json!({"id": id, "name": name, "color": "#FCA5A5", "x": x, "y": y, "updatedAt": 1})
    }

    #[test]
    fn test_join_and_leave() {
        let mut r = reconciler();
        let joined = r.apply_presence_sync(&[member("a", "Amber", 0.1, 0.1), member("b", "Fern", 0.2, 0.2)]);
        assert_eq!(joined.len(), 2);
        assert!(joined.iter().all(|n| matches!(n, PresenceNotice::Joined { .. })));

        let notices = r.apply_presence_sync(&[member("a", "Amber", 0.1, 0.1)]);
        assert_eq!(
            notices,
            vec![PresenceNotice::Left {
                id: "b".to_string(),
                name: "Fern".to_string(),
                color: "#FCA5A5".to_string(),
            }]
        );
        assert!(r.remote("b").is_none());
        assert!(r.remote("a").is_some());
        assert_eq!(r.online_count(), 1);
    }

    #[test]
    fn test_excludes_self_and_malformed() {
        let mut r = reconciler();
        let notices = r.apply_presence_sync(&[
            member("me", "Quiet Nook", 0.5, 0.5),
            json!({"name": "no id", "x": 0.1, "y": 0.1}),
            json!({"id": "bad", "x": "left", "y": 0.1}),
            json!({"id": "", "x": 0.1, "y": 0.1}),
            member("ok", "Sage", 0.3, 0.3),
        ]);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].id(), "ok");
        assert_eq!(r.online_count(), 1);
    }

    #[test]
    fn test_new_peer_starts_at_target_and_existing_keeps_position() {
        let mut r = reconciler();
        r.apply_presence_sync(&[member("a", "Amber", 0.2, 0.4)]);
        let a = r.remote("a").unwrap();
        assert_eq!((a.x, a.y), (0.2, 0.4));

        r.apply_presence_sync(&[member("a", "Amber Glow", 1.5, 0.4)]);
        let a = r.remote("a").unwrap();
        assert_eq!((a.x, a.y), (0.2, 0.4));
        assert_eq!(a.target_x, 1.0);
        assert_eq!(a.name, "Amber Glow");

        r.advance(0);
        let a = r.remote("a").unwrap();
        assert!((a.x - lerp(0.2, 1.0, REMOTE_SMOOTHING)).abs() < 1e-12);
        assert!(a.x < 1.0);
    }

    #[test]
    fn test_low_power_snaps_remotes() {
        let mut r = reconciler();
        r.set_low_power(true);
        r.apply_presence_sync(&[member("a", "Amber", 0.2, 0.2)]);
        r.apply_presence_sync(&[member("a", "Amber", 0.9, 0.7)]);
        r.advance(0);
        let a = r.remote("a").unwrap();
        assert_eq!((a.x, a.y), (0.9, 0.7));
    }

    #[test]
    fn test_local_moves_at_bounded_speed() {
        let mut r = reconciler();
        r.set_target(1.0, START_POSITION.y);
        r.advance(0);
        assert_eq!(r.local_position(), START_POSITION);

        r.advance(100);
        let expected = START_POSITION.x + MOVE_SPEED * 0.1;
        assert!((r.local_position().x - expected).abs() < 1e-12);

        // Long stalls are capped to one maximum frame step.
        r.advance(10_100);
        let expected = expected + MOVE_SPEED * MAX_FRAME_SECONDS;
        assert!((r.local_position().x - expected).abs() < 1e-12);

        for frame in 1..400 {
            r.advance(10_100 + frame * 100);
        }
        assert_eq!(r.local_position().x, 1.0);
    }

    #[test]
    fn test_broadcast_interval() {
        let mut r = reconciler();
        r.set_status(Some("<b>essay</b> time"));
        assert!(r.take_broadcast(1_000, false).is_none());

        let payload = r.take_broadcast(1_000, true).unwrap();
        assert_eq!(payload.id, "me");
        assert_eq!(payload.updated_at, 1_000);
        assert_eq!(payload.status, None);

        assert!(r.take_broadcast(1_000 + PRESENCE_BROADCAST_INTERVAL_MS, true).is_none());

        r.set_share_status(true);
        let payload = r.take_broadcast(1_001 + PRESENCE_BROADCAST_INTERVAL_MS, true).unwrap();
        assert_eq!(payload.status.as_deref(), Some("essay time"));
    }

    #[test]
    fn test_inbound_status_is_sanitized() {
        let mut r = reconciler();
        let mut entry = member("a", "Amber", 0.1, 0.1);
        entry["status"] = json!("  <img src=x>deep work  ");
        r.apply_presence_sync(&[entry]);
        assert_eq!(r.remote("a").unwrap().status.as_deref(), Some("deep work"));
    }

    #[test]
    fn test_hover_last_writer_wins() {
        let mut r = reconciler();
        r.set_hover("a", true);
        r.set_hover("b", true);
        assert_eq!(r.hovered(), Some("b"));
        r.set_hover("a", false);
        assert_eq!(r.hovered(), Some("b"));
        r.set_hover("b", false);
        assert_eq!(r.hovered(), None);
    }

    #[test]
    fn test_render_list_scales_and_marks_self() {
        let mut r = reconciler();
        r.apply_presence_sync(&[member("a", "Amber", 0.5, 0.25)]);
        r.set_hover("a", true);
        let list = r.render_list(200.0, 100.0);
        assert_eq!(list.len(), 2);
        assert!(list[0].is_self);
        assert_eq!(list[0].id, "me");
        assert_eq!((list[1].x, list[1].y), (100.0, 25.0));
        assert!(list[1].is_hovered);
    }

    #[test]
    fn test_clear_forgets_peers() {
        let mut r = reconciler();
        r.apply_presence_sync(&[member("a", "Amber", 0.5, 0.25)]);
        r.clear();
        assert_eq!(r.online_count(), 0);
        let notices = r.apply_presence_sync(&[member("a", "Amber", 0.5, 0.25)]);
        assert_eq!(notices.len(), 1);
    }
}
