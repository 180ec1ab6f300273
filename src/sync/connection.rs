//! Coarse connectivity indicator

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transport::ChannelStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    /// Status implied by a transport subscription event
    pub fn from_channel(status: ChannelStatus) -> Self {
        match status {
            ChannelStatus::Subscribed => ConnectionStatus::Connected,
            ChannelStatus::ChannelError => ConnectionStatus::Error,
            ChannelStatus::TimedOut | ChannelStatus::Closed => ConnectionStatus::Connecting,
        }
    }

    /// Overall status of two channels: any error wins, then any pending
    pub fn combine(self, other: Self) -> Self {
        use ConnectionStatus::*;
        match (self, other) {
            (Error, _) | (_, Error) => Error,
            (Idle, Idle) => Idle,
            (Connected, Connected) => Connected,
            _ => Connecting,
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionStatus::Connected
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionStatus::Idle => "idle",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(label)
    }
}
