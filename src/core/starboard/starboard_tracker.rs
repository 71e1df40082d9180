// Star reaction tracking - keeps the index and the persisted entry in step
// with ⭐ reactions and posts the mirror once a message has enough stars.

use super::starboard_index::{StarboardIndex, StarboardIndexEntry};
use super::starboard_models::{StarReaction, StarboardEntry, StarboardKey};
use super::starboard_service::{StarboardError, StarboardStore};
use crate::core::coordination::{CoreContext, ErrorSink, FailureKind, RemoteActionClient};
use crate::core::settings::SettingsProvider;
use std::sync::Arc;

pub struct StarboardTracker {
    index: Arc<StarboardIndex>,
    store: Arc<dyn StarboardStore>,
    settings: Arc<dyn SettingsProvider>,
    remote: Arc<dyn RemoteActionClient>,
    sink: Arc<dyn ErrorSink>,
}

impl StarboardTracker {
    pub fn new(ctx: &CoreContext) -> Self {
        Self {
            index: Arc::clone(&ctx.starboard_index),
            store: Arc::clone(&ctx.starboard),
            settings: Arc::clone(&ctx.settings),
            remote: Arc::clone(&ctx.remote),
            sink: Arc::clone(&ctx.sink),
        }
    }

    pub async fn on_star_reaction(&self, reaction: StarReaction) {
        if let Err(e) = self.track(reaction).await {
            self.sink.report(
                FailureKind::StoreUnavailable,
                &e,
                &format!(
                    "tracking star on {} in guild {}",
                    StarboardKey::new(reaction.channel_id, reaction.message_id),
                    reaction.guild_id
                ),
            );
        }
    }

    async fn track(&self, reaction: StarReaction) -> Result<(), StarboardError> {
        let key = StarboardKey::new(reaction.channel_id, reaction.message_id);

        // Held through the upsert so a concurrent clear or star on the same
        // message can't interleave with the reload, the mirror post or the write.
        let _key_lock = self.index.lock_key(key).await;

        // Cache miss: load what the store knows before applying the change.
        if self.index.get(&key).is_none() {
            let stored = self
                .store
                .get_entry(reaction.guild_id, reaction.message_id)
                .await?;
            match stored {
                Some(entry) => {
                    self.index.hydrate(key, StarboardIndexEntry::from(&entry));
                }
                // Un-starring something we never tracked.
                None if !reaction.added => return Ok(()),
                None => {
                    self.index.hydrate(key, StarboardIndexEntry::default());
                }
            }
        }

        let delta = if reaction.added { 1 } else { -1 };
        let star_count = self.index.adjust(key, delta);
        let mut entry = StarboardEntry {
            guild_id: reaction.guild_id,
            channel_id: reaction.channel_id,
            message_id: reaction.message_id,
            star_message_id: self.index.get(&key).and_then(|e| e.star_message_id),
            star_count,
        };

        if entry.star_message_id.is_none() {
            if let Some(star_message_id) = self.post_mirror(&entry).await? {
                self.index.set_star_message(&key, star_message_id);
                entry.star_message_id = Some(star_message_id);
            }
        }

        self.store.upsert_entry(&entry).await?;
        Ok(())
    }

    /// Post the message to the starboard channel if the guild has one and the
    /// entry has reached the minimum. Returns the posted message id.
    async fn post_mirror(&self, entry: &StarboardEntry) -> Result<Option<u64>, StarboardError> {
        let settings = self.settings.guild_settings(entry.guild_id).await?;
        let channel = match settings.starboard_channel_id {
            Some(channel) => channel,
            None => return Ok(None),
        };
        if entry.star_count < settings.starboard_minimum {
            return Ok(None);
        }

        let content = format!(
            "⭐ **{}** <#{}>\nhttps://discord.com/channels/{}/{}/{}",
            entry.star_count, entry.channel_id, entry.guild_id, entry.channel_id, entry.message_id
        );
        match self.remote.send_message(channel, &content).await {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                self.sink.report(
                    FailureKind::RemoteActionFailure,
                    &e,
                    &format!("posting starboard mirror to channel {}", channel),
                );
                Ok(None)
            }
        }
    }
}
