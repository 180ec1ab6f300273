//! Wire payloads exchanged over the room channels
//!
//! Everything is JSON. Outbound payloads are typed; inbound payloads are
//! decoded one entry at a time so a malformed peer never poisons the rest.

use serde::{de, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::TransportError,
    state::{identity::AVATAR_COLORS, Millis, TimerState},
    transport::Broadcast,
};

/// Broadcast event carrying a full shared timer snapshot
pub const TIMER_UPDATE_EVENT: &str = "timer:update";

/// Broadcast event asking shared-mode peers to publish their timer
pub const TIMER_REQUEST_SYNC_EVENT: &str = "timer:request-sync";

/// Name shown for peers that did not publish one
pub const DEFAULT_PEER_NAME: &str = "Wanderer";

/// Presence published by each member of the room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub id: String,
    pub name: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub updated_at: Millis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PresencePayload {
    /// Decode one membership entry, tolerating missing cosmetic fields
    ///
    /// Entries without an id or with non-numeric coordinates are rejected.
    pub fn from_member(value: &Value) -> Result<Self, serde_json::Error> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Inbound {
            id: String,
            name: Option<String>,
            color: Option<String>,
            x: f64,
            y: f64,
            updated_at: Option<Millis>,
            status: Option<String>,
        }

        let inbound = Inbound::deserialize(value)?;
        Ok(Self {
            id: inbound.id,
            name: inbound.name.unwrap_or_else(|| DEFAULT_PEER_NAME.to_string()),
            color: inbound.color.unwrap_or_else(|| AVATAR_COLORS[0].to_string()),
            x: inbound.x,
            y: inbound.y,
            updated_at: inbound.updated_at.unwrap_or_default(),
            status: inbound.status,
        })
    }

    pub fn to_value(&self) -> Result<Value, TransportError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Body of a `timer:request-sync` broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub requester_id: String,
}

/// Typed view of the broadcasts understood on the timer channel
#[derive(Debug, Clone, PartialEq)]
pub enum TimerMessage {
    Update(TimerState),
    RequestSync(SyncRequest),
}

impl TimerMessage {
    pub fn event(&self) -> &'static str {
        match self {
            TimerMessage::Update(_) => TIMER_UPDATE_EVENT,
            TimerMessage::RequestSync(_) => TIMER_REQUEST_SYNC_EVENT,
        }
    }

    pub fn to_broadcast(&self) -> Result<Broadcast, TransportError> {
        let payload = match self {
            TimerMessage::Update(state) => serde_json::to_value(state)?,
            TimerMessage::RequestSync(request) => serde_json::to_value(request)?,
        };
        Ok(Broadcast::new(self.event(), payload))
    }

    /// Decode a broadcast; `Ok(None)` for events this channel does not handle
    ///
    /// Timer snapshots with a negative `remainingMs` are rejected. Values above
    /// the local phase length are accepted since peers may use other durations.
    pub fn from_broadcast(broadcast: &Broadcast) -> Result<Option<Self>, serde_json::Error> {
        match broadcast.event.as_str() {
            TIMER_UPDATE_EVENT => {
                let state = TimerState::deserialize(&broadcast.payload)?;
                if state.remaining_ms < 0 {
                    return Err(de::Error::custom(format!(
                        "remainingMs must not be negative, got {}",
                        state.remaining_ms
                    )));
                }
                Ok(Some(TimerMessage::Update(state)))
            }
            TIMER_REQUEST_SYNC_EVENT => Ok(Some(TimerMessage::RequestSync(
                SyncRequest::deserialize(&broadcast.payload)?,
            ))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{TimerMode, TimerPhase};
    use serde_json::json;

    #[test]
    fn test_member_defaults() {
        let payload = PresencePayload::from_member(&json!({"id": "guest-a", "x": 0.2, "y": 0.4})).unwrap();
        assert_eq!(payload.name, DEFAULT_PEER_NAME);
        assert_eq!(payload.color, AVATAR_COLORS[0]);
        assert_eq!(payload.updated_at, 0);
        assert_eq!(payload.status, None);
    }

    #[test]
    fn test_member_rejects_malformed_entries() {
        assert!(PresencePayload::from_member(&json!({"x": 0.2, "y": 0.4})).is_err());
        assert!(PresencePayload::from_member(&json!({"id": "a", "x": "left", "y": 0.4})).is_err());
        assert!(PresencePayload::from_member(&json!("not an object")).is_err());
    }

    #[test]
    fn test_presence_omits_absent_status() {
        let payload = PresencePayload {
            id: "guest-a".to_string(),
            name: "Soft Echo".to_string(),
            color: "#FDE68A".to_string(),
            x: 0.5,
            y: 0.68,
            updated_at: 10,
            status: None,
        };
        let value = payload.to_value().unwrap();
        assert!(value.get("status").is_none());
        assert_eq!(value["updatedAt"], 10);
    }

    #[test]
    fn test_timer_messages() {
        let request = TimerMessage::RequestSync(SyncRequest { requester_id: "guest-a".to_string() });
        let broadcast = request.to_broadcast().unwrap();
        assert_eq!(broadcast.event, TIMER_REQUEST_SYNC_EVENT);
        assert_eq!(broadcast.payload, json!({"requesterId": "guest-a"}));
        assert_eq!(TimerMessage::from_broadcast(&broadcast).unwrap(), Some(request));

        let update = Broadcast::new(
            TIMER_UPDATE_EVENT,
            json!({"mode": "shared", "phase": "break", "remainingMs": 5, "isRunning": false, "lastUpdatedAt": 1}),
        );
        match TimerMessage::from_broadcast(&update).unwrap() {
            Some(TimerMessage::Update(state)) => {
                assert_eq!(state.mode, TimerMode::Shared);
                assert_eq!(state.phase, TimerPhase::Break);
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let bogus = Broadcast::new(TIMER_UPDATE_EVENT, json!({"phase": "nap"}));
        assert!(TimerMessage::from_broadcast(&bogus).is_err());

        let unrelated = Broadcast::new("cursor:move", json!({}));
        assert_eq!(TimerMessage::from_broadcast(&unrelated).unwrap(), None);
    }

    #[test]
    fn test_negative_remaining_is_malformed() {
        let negative = Broadcast::new(
            TIMER_UPDATE_EVENT,
            json!({"mode": "shared", "phase": "focus", "remainingMs": -5, "isRunning": true, "lastUpdatedAt": 1}),
        );
        assert!(TimerMessage::from_broadcast(&negative).is_err());

        // Longer than our own phase length is fine: the peer may use other durations.
        let long = Broadcast::new(
            TIMER_UPDATE_EVENT,
            json!({"mode": "shared", "phase": "focus", "remainingMs": 7_200_000, "isRunning": true, "lastUpdatedAt": 1}),
        );
        assert!(matches!(
            TimerMessage::from_broadcast(&long).unwrap(),
            Some(TimerMessage::Update(state)) if state.remaining_ms == 7_200_000
        ));
    }
}
