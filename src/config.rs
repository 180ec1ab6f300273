//! Configuration and CLI argument handling

use clap::Parser;

use crate::{
    error::TimerError,
    state::{Identity, TimerDurations},
    sync::RoomSettings,
};

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "study-harbor")]
#[command(about = "A shared study room with a synchronized focus timer")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Port to bind the control API to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Focus phase length in minutes
    #[arg(short, long, default_value = "25")]
    pub focus: i64,

    /// Break phase length in minutes
    #[arg(short, long, default_value = "5")]
    pub break_minutes: i64,

    /// Display name; a random one is picked when absent
    #[arg(short, long)]
    pub name: Option<String>,

    /// Avatar color as a hex string
    #[arg(long)]
    pub color: Option<String>,

    /// Number of simulated peers sharing the room
    #[arg(long, default_value = "0")]
    pub companions: usize,

    /// Slow down presence broadcasts and frame stepping
    #[arg(long)]
    pub low_power: bool,

    /// Publish the status message to other peers
    #[arg(long)]
    pub share_status: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Phase lengths from the minute flags; rejects zero, negative or overflowing values
    pub fn durations(&self) -> Result<TimerDurations, TimerError> {
        TimerDurations::from_minutes(self.focus, self.break_minutes)
    }

    pub fn room_settings(&self) -> Result<RoomSettings, TimerError> {
        Ok(RoomSettings {
            durations: self.durations()?,
            low_power: self.low_power,
            share_status: self.share_status,
            ..RoomSettings::default()
        })
    }

    /// The local identity, filling gaps with a random guest
    pub fn identity(&self) -> Identity {
        let guest = Identity::guest();
        Identity {
            display_name: self.name.clone().unwrap_or(guest.display_name),
            color: self.color.clone().unwrap_or(guest.color),
            guest_id: guest.guest_id,
        }
    }
}
