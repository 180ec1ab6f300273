//! Realtime transport and clock seams
//!
//! The room core only needs a handful of operations from its environment: open
//! a named channel, publish presence, send fire-and-forget broadcasts, read
//! inbound events and tell the time. Hosted pub/sub services plug in behind
//! these traits; `MemoryHub` is the in-process implementation.

pub mod clock;
pub mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::{MemoryChannel, MemoryHub};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// Options applied when subscribing to a channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelConfig {
    /// When set, presence holds at most one entry for this key
    pub presence_key: Option<String>,
}

impl ChannelConfig {
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            presence_key: Some(key.into()),
        }
    }
}

/// Subscription lifecycle reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    Subscribed,
    ChannelError,
    TimedOut,
    Closed,
}

/// A named event with an arbitrary JSON payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broadcast {
    pub event: String,
    pub payload: Value,
}

impl Broadcast {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Inbound notifications queued on a channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Status(ChannelStatus),
    /// Full current membership, one raw payload per member
    PresenceSync(Vec<Value>),
    Broadcast(Broadcast),
}

/// A subscribed channel handle
pub trait Channel: Send {
    fn name(&self) -> &str;

    /// Publish this member's presence payload; the last call wins
    fn track(&mut self, payload: Value) -> Result<(), TransportError>;

    /// Fire-and-forget publish to every other subscriber
    fn send(&mut self, broadcast: Broadcast) -> Result<(), TransportError>;

    /// Next queued inbound event, if any
    fn poll_event(&mut self) -> Option<ChannelEvent>;

    /// Leave the channel. Calling it again does nothing.
    fn unsubscribe(&mut self);
}

/// Opens channels on a pub/sub service
pub trait Transport: Send + Sync {
    type Channel: Channel;

    fn subscribe(&self, name: &str, config: ChannelConfig) -> Result<Self::Channel, TransportError>;
}
