//! Units of outbound chat work.

use std::fmt;

/// Who receives a job's segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Everyone on the server.
    Broadcast,
    /// A single player, by name.
    Player(String),
}

impl Destination {
    /// Target selector as used by `tellraw`.
    pub fn selector(&self) -> &str {
        match self {
            Destination::Broadcast => "@a",
            Destination::Player(name) => name,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Broadcast => f.write_str("everyone"),
            Destination::Player(name) => write!(f, "player {}", name),
        }
    }
}

/// Inter-segment delay class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    #[default]
    Regular,
    /// Slower pacing for `-long` answers.
    Extended,
}

/// A pre-chunked response, delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryJob {
    pub destination: Destination,
    pub segments: Vec<String>,
    pub pacing: Pacing,
}

impl DeliveryJob {
    pub fn new(destination: Destination, segments: Vec<String>, pacing: Pacing) -> Self {
        Self {
            destination,
            segments,
            pacing,
        }
    }

    /// A public job for everyone on the server.
    pub fn broadcast(segments: Vec<String>, pacing: Pacing) -> Self {
        Self::new(Destination::Broadcast, segments, pacing)
    }
}
