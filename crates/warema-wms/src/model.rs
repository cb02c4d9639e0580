// Catalog model
//
// Plain value types for the room/channel topology discovered at startup
// and the shade state snapshot handed to callers. No behavior beyond
// accessors; all mutation goes through the shade controller.

use chrono::{DateTime, Utc};

/// A control channel within a room, addressing one shade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    name: String,
    id: u8,
}

impl Channel {
    pub fn new(name: impl Into<String>, id: u8) -> Self {
        Self { name: name.into(), id }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channel index, unique within its room. Ids are append-assigned
    /// starting at 0 during discovery and never reused or renumbered.
    pub fn id(&self) -> u8 {
        self.id
    }
}

/// A room as configured on the WebControl server, owning its channels
/// in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    name: String,
    id: u8,
    channels: Vec<Channel>,
}

impl Room {
    pub fn new(name: impl Into<String>, id: u8, channels: Vec<Channel>) -> Self {
        Self { name: name.into(), id, channels }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }
}

/// Snapshot of a shade's last observed state.
///
/// Only as fresh as `last_updated`: the library never expires or resets
/// state on its own, so a caller needing freshness must force an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadeState {
    /// Position on the user-facing scale: 0 = open, 100 = closed.
    pub position: u8,
    /// Whether the shade was moving at the last update.
    pub is_moving: bool,
    /// When the state was last successfully read from the device.
    pub last_updated: DateTime<Utc>,
}
