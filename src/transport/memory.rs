//! In-process pub/sub hub
//!
//! Every subscriber gets its own unbounded queue. Presence changes fan out a
//! full membership sync to all subscribers of the channel; broadcasts reach
//! everyone except the sender. The hub can be switched offline to exercise
//! reconnect paths.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use serde_json::Value;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, trace, warn};

use super::{Broadcast, Channel, ChannelConfig, ChannelEvent, ChannelStatus, Transport};
use crate::error::TransportError;

type SubscriberId = u64;

struct Subscriber {
    id: SubscriberId,
    presence_key: String,
    tx: UnboundedSender<ChannelEvent>,
}

#[derive(Default)]
struct HubChannel {
    subscribers: Vec<Subscriber>,
    /// presence key -> (owning subscriber, payload)
    presence: BTreeMap<String, (SubscriberId, Value)>,
}

impl HubChannel {
    fn members(&self) -> Vec<Value> {
        self.presence.values().map(|(_, payload)| payload.clone()).collect()
    }

    fn sync_presence(&self) {
        let members = self.members();
        for subscriber in &self.subscribers {
            subscriber
                .tx
                .send(ChannelEvent::PresenceSync(members.clone()))
                .ok();
        }
    }
}

struct HubInner {
    online: bool,
    next_id: SubscriberId,
    channels: HashMap<String, HubChannel>,
}

/// Shared handle to the hub; clones talk to the same hub
#[derive(Clone)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubInner>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                online: true,
                next_id: 1,
                channels: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_online(&self) -> bool {
        self.lock().online
    }

    /// Take the hub down or bring it back
    ///
    /// Going offline drops all presence and reports `ChannelError` to every
    /// subscriber. Coming back reports `Subscribed` so members re-track.
    pub fn set_online(&self, online: bool) {
        let mut inner = self.lock();
        if inner.online == online {
            return;
        }
        inner.online = online;
        let status = if online {
            ChannelStatus::Subscribed
        } else {
            ChannelStatus::ChannelError
        };
        debug!("Memory hub going {}", if online { "online" } else { "offline" });

        for channel in inner.channels.values_mut() {
            if !online {
                channel.presence.clear();
            }
            for subscriber in &channel.subscribers {
                subscriber.tx.send(ChannelEvent::Status(status)).ok();
            }
        }
    }

    /// Number of live subscriptions on a channel
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock()
            .channels
            .get(channel)
            .map(|c| c.subscribers.len())
            .unwrap_or(0)
    }

    /// Current presence payloads on a channel
    pub fn members(&self, channel: &str) -> Vec<Value> {
        self.lock()
            .channels
            .get(channel)
            .map(HubChannel::members)
            .unwrap_or_default()
    }

    fn track(&self, channel: &str, id: SubscriberId, payload: Value) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if !inner.online {
            return Err(TransportError::Offline);
        }
        let hub_channel = inner
            .channels
            .get_mut(channel)
            .ok_or_else(|| TransportError::Closed(channel.to_string()))?;
        let key = hub_channel
            .subscribers
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.presence_key.clone())
            .ok_or_else(|| TransportError::Closed(channel.to_string()))?;

        hub_channel.presence.insert(key, (id, payload));
        hub_channel.sync_presence();
        Ok(())
    }

    fn send(&self, channel: &str, from: SubscriberId, broadcast: Broadcast) -> Result<(), TransportError> {
        let inner = self.lock();
        if !inner.online {
            return Err(TransportError::Offline);
        }
        let hub_channel = inner
            .channels
            .get(channel)
            .ok_or_else(|| TransportError::Closed(channel.to_string()))?;

        trace!("Broadcasting {} on {}", broadcast.event, channel);
        for subscriber in hub_channel.subscribers.iter().filter(|s| s.id != from) {
            subscriber
                .tx
                .send(ChannelEvent::Broadcast(broadcast.clone()))
                .ok();
        }
        Ok(())
    }

    fn leave(&self, channel: &str, id: SubscriberId) {
        let mut inner = self.lock();
        let Some(hub_channel) = inner.channels.get_mut(channel) else {
            return;
        };
        hub_channel.subscribers.retain(|s| s.id != id);
        let before = hub_channel.presence.len();
        hub_channel.presence.retain(|_, (owner, _)| *owner != id);
        if hub_channel.presence.len() != before {
            hub_channel.sync_presence();
        }
        if hub_channel.subscribers.is_empty() {
            inner.channels.remove(channel);
        }
        debug!("Subscriber {} left {}", id, channel);
    }
}

impl Default for MemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryHub {
    type Channel = MemoryChannel;

    fn subscribe(&self, name: &str, config: ChannelConfig) -> Result<MemoryChannel, TransportError> {
        let mut inner = self.lock();
        if !inner.online {
            warn!("Cannot subscribe to {}: hub offline", name);
            return Err(TransportError::Offline);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ChannelEvent::Status(ChannelStatus::Subscribed)).ok();

        let presence_key = config.presence_key.unwrap_or_else(|| format!("subscriber-{}", id));
        inner
            .channels
            .entry(name.to_string())
            .or_default()
            .subscribers
            .push(Subscriber { id, presence_key, tx });

        debug!("Subscriber {} joined {}", id, name);
        Ok(MemoryChannel {
            hub: self.clone(),
            name: name.to_string(),
            id,
            rx,
            closed: false,
        })
    }
}

/// A subscription on a `MemoryHub`; unsubscribes when dropped
pub struct MemoryChannel {
    hub: MemoryHub,
    name: String,
    id: SubscriberId,
    rx: UnboundedReceiver<ChannelEvent>,
    closed: bool,
}

impl Channel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn track(&mut self, payload: Value) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed(self.name.clone()));
        }
        self.hub.track(&self.name, self.id, payload)
    }

    fn send(&mut self, broadcast: Broadcast) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed(self.name.clone()));
        }
        self.hub.send(&self.name, self.id, broadcast)
    }

    fn poll_event(&mut self) -> Option<ChannelEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.hub.leave(&self.name, self.id);
        self.rx.close();
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drain(channel: &mut MemoryChannel) -> Vec<ChannelEvent> {
        std::iter::from_fn(|| channel.poll_event()).collect()
    }

    #[test]
    fn test_subscribe_reports_subscribed() {
        let hub = MemoryHub::new();
        let mut channel = hub.subscribe("room", ChannelConfig::default()).unwrap();
        assert_eq!(
            drain(&mut channel),
            vec![ChannelEvent::Status(ChannelStatus::Subscribed)]
        );
        assert_eq!(hub.subscriber_count("room"), 1);
    }

    #[test]
    fn test_presence_is_keyed() {
        let hub = MemoryHub::new();
        let mut a = hub.subscribe("room", ChannelConfig::keyed("a")).unwrap();
        let mut b = hub.subscribe("room", ChannelConfig::keyed("b")).unwrap();

        a.track(json!({"id": "a", "x": 0.1})).unwrap();
        a.track(json!({"id": "a", "x": 0.2})).unwrap();
        b.track(json!({"id": "b", "x": 0.3})).unwrap();

        assert_eq!(hub.members("room").len(), 2);
        let last = drain(&mut a).pop().unwrap();
        assert_eq!(
            last,
            ChannelEvent::PresenceSync(vec![json!({"id": "a", "x": 0.2}), json!({"id": "b", "x": 0.3})])
        );

        drop(b);
        assert_eq!(
            drain(&mut a),
            vec![ChannelEvent::PresenceSync(vec![json!({"id": "a", "x": 0.2})])]
        );
    }

    #[test]
    fn test_broadcast_skips_sender() {
        let hub = MemoryHub::new();
        let mut a = hub.subscribe("timer", ChannelConfig::default()).unwrap();
        let mut b = hub.subscribe("timer", ChannelConfig::default()).unwrap();
        drain(&mut a);
        drain(&mut b);

        a.send(Broadcast::new("ping", json!(1))).unwrap();
        assert!(drain(&mut a).is_empty());
        assert_eq!(
            drain(&mut b),
            vec![ChannelEvent::Broadcast(Broadcast::new("ping", json!(1)))]
        );
    }

    #[test]
    fn test_offline_hub() {
        let hub = MemoryHub::new();
        let mut a = hub.subscribe("room", ChannelConfig::keyed("a")).unwrap();
        a.track(json!({"id": "a"})).unwrap();
        drain(&mut a);

        hub.set_online(false);
        assert!(!hub.is_online());
        assert_eq!(drain(&mut a), vec![ChannelEvent::Status(ChannelStatus::ChannelError)]);
        assert!(hub.members("room").is_empty());
        assert!(matches!(a.send(Broadcast::new("x", json!(null))), Err(TransportError::Offline)));
        assert!(hub.subscribe("room", ChannelConfig::default()).is_err());

        hub.set_online(true);
        assert!(hub.is_online());
        assert_eq!(drain(&mut a), vec![ChannelEvent::Status(ChannelStatus::Subscribed)]);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let hub = MemoryHub::new();
        let mut a = hub.subscribe("room", ChannelConfig::default()).unwrap();
        a.unsubscribe();
        a.unsubscribe();
        assert_eq!(hub.subscriber_count("room"), 0);
        assert!(matches!(a.track(json!({})), Err(TransportError::Closed(_))));
    }
}
