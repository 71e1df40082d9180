// Starboard domain models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A starred message as persisted. At most one row exists per
/// (guild, channel, message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarboardEntry {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    /// The mirror posted in the starboard channel, if one was posted.
    pub star_message_id: Option<u64>,
    pub star_count: u32,
}

/// Rows removed by a conditional delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub affected: u64,
    pub deleted: Vec<StarboardEntry>,
}

/// Cache key of a starred message: `channel_id:message_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StarboardKey {
    pub channel_id: u64,
    pub message_id: u64,
}

impl StarboardKey {
    pub fn new(channel_id: u64, message_id: u64) -> Self {
        Self {
            channel_id,
            message_id,
        }
    }
}

impl fmt::Display for StarboardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.channel_id, self.message_id)
    }
}

/// All reactions were removed from a message at once.
///
/// The gateway does not always tell us the guild; such events are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionsBulkCleared {
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub message_id: u64,
}

/// A single ⭐ reaction was added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarReaction {
    pub guild_id: u64,
    pub channel_id: u64,
    pub message_id: u64,
    pub added: bool,
}
