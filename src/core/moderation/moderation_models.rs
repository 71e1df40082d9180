// Moderation domain models - cases, type codes and the spam trigger event.
//
// These are pure domain types with no Discord dependencies.
// The Discord layer converts serenity types into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of moderation action a case records.
///
/// The integer codes are persisted, so never renumber an existing variant.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseType {
    Warning,
    Mute,
    Kick,
    Softban,
    Ban,
    Unban,
    Unmute,
    Timeout,
}

impl CaseType {
    pub fn code(self) -> i64 {
        match self {
            CaseType::Warning => 0,
            CaseType::Mute => 1,
            CaseType::Kick => 2,
            CaseType::Softban => 3,
            CaseType::Ban => 4,
            CaseType::Unban => 5,
            CaseType::Unmute => 6,
            CaseType::Timeout => 7,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(CaseType::Warning),
            1 => Some(CaseType::Mute),
            2 => Some(CaseType::Kick),
            3 => Some(CaseType::Softban),
            4 => Some(CaseType::Ban),
            5 => Some(CaseType::Unban),
            6 => Some(CaseType::Unmute),
            7 => Some(CaseType::Timeout),
            _ => None,
        }
    }
}

impl std::fmt::Display for CaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaseType::Warning => write!(f, "Warning"),
            CaseType::Mute => write!(f, "Mute"),
            CaseType::Kick => write!(f, "Kick"),
            CaseType::Softban => write!(f, "Softban"),
            CaseType::Ban => write!(f, "Ban"),
            CaseType::Unban => write!(f, "Unban"),
            CaseType::Unmute => write!(f, "Unmute"),
            CaseType::Timeout => write!(f, "Timeout"),
        }
    }
}

/// A case about to be written. The store assigns the case id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCase {
    pub guild_id: u64,
    pub user_id: u64,
    pub moderator_id: u64,
    pub case_type: CaseType,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// A guild member went over the mention threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpamThresholdExceeded {
    pub guild_id: u64,
    pub author_id: u64,
    pub channel_id: u64,
}

/// Result of adding a message's mentions to the author's running total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionCheck {
    Ok { total: u32 },
    Exceeded { total: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_type_codes_are_stable() {
        assert_eq!(CaseType::Ban.code(), 4);
        assert_eq!(CaseType::from_code(4), Some(CaseType::Ban));
        assert_eq!(CaseType::from_code(99), None);
    }
}
