// Per-guild configuration read by the moderation and starboard pipelines.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Languages the bot can answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    EnUs,
    EsEs,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::EnUs => "en-US",
            Language::EsEs => "es-ES",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en-US" => Some(Language::EnUs),
            "es-ES" => Some(Language::EsEs),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildSettings {
    pub guild_id: u64,
    /// Mentions a user may send inside one window before being banned.
    pub mention_threshold: u32,
    /// Length of the mention counting window in seconds.
    pub mention_window_secs: u64,
    pub language: Language,
    /// Channel that starred messages are mirrored to.
    pub starboard_channel_id: Option<u64>,
    /// Stars needed before a message is posted to the starboard.
    pub starboard_minimum: u32,
}

impl GuildSettings {
    pub fn defaults(guild_id: u64) -> Self {
        Self {
            guild_id,
            mention_threshold: 10,
            mention_window_secs: 5,
            language: Language::EnUs,
            starboard_channel_id: None,
            starboard_minimum: 1,
        }
    }

    pub fn mention_window(&self) -> Duration {
        Duration::from_secs(self.mention_window_secs)
    }
}
