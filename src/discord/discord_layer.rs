// Discord layer - commands, event handlers and the serenity-backed ports.

use crate::core::coordination::EventDispatcher;
use crate::core::moderation::MentionSpamTracker;
use crate::core::settings::SettingsService;
use std::sync::Arc;

#[path = "actions/serenity_actions.rs"]
pub mod actions;

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "moderation/spam_handler.rs"]
pub mod moderation;

#[path = "starboard/events.rs"]
pub mod starboard;

/// Shared state handed to every command and event handler.
pub struct Data {
    pub settings: Arc<SettingsService>,
    pub mention_tracker: Arc<MentionSpamTracker>,
    pub dispatcher: Arc<EventDispatcher>,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
