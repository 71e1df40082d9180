// Serenity implementations of the core platform ports.

use crate::core::coordination::{BanOptions, ChannelDirectory, RemoteActionClient, RemoteActionError};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

// Discord JSON error codes that the HTTP status alone doesn't pin down.
const MISSING_PERMISSIONS: isize = 50013;
const UNKNOWN_MESSAGE: isize = 10008;
const UNKNOWN_CHANNEL: isize = 10003;
const UNKNOWN_USER: isize = 10013;

/// Map an HTTP status and Discord error code onto the core error kinds.
fn classify_response(status: u16, code: isize, message: String) -> RemoteActionError {
    if status == 403 || code == MISSING_PERMISSIONS {
        RemoteActionError::Permission(message)
    } else if status == 404 || matches!(code, UNKNOWN_MESSAGE | UNKNOWN_CHANNEL | UNKNOWN_USER) {
        RemoteActionError::NotFound(message)
    } else {
        RemoteActionError::Transient(message)
    }
}

fn classify(source: serenity::Error) -> RemoteActionError {
    match &source {
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) => {
            classify_response(
                response.status_code.as_u16(),
                response.error.code,
                source.to_string(),
            )
        }
        _ => RemoteActionError::Transient(source.to_string()),
    }
}

pub struct SerenityActionClient {
    http: Arc<serenity::Http>,
}

impl SerenityActionClient {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl RemoteActionClient for SerenityActionClient {
    async fn ban(
        &self,
        guild_id: u64,
        user_id: u64,
        options: BanOptions,
    ) -> Result<(), RemoteActionError> {
        serenity::GuildId::new(guild_id)
            .ban_with_reason(
                &*self.http,
                serenity::UserId::new(user_id),
                options.purge_days,
                &options.reason,
            )
            .await
            .map_err(classify)
    }

    async fn send_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> Result<u64, RemoteActionError> {
        let message = serenity::ChannelId::new(channel_id)
            .say(&*self.http, content)
            .await
            .map_err(classify)?;
        Ok(message.id.get())
    }

    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
        reason: &str,
    ) -> Result<(), RemoteActionError> {
        self.http
            .delete_message(
                serenity::ChannelId::new(channel_id),
                serenity::MessageId::new(message_id),
                Some(reason),
            )
            .await
            .map_err(classify)
    }
}

/// Find the guild whose thread list contains `channel_id`.
fn guild_owning_thread<I, T>(threads_by_guild: I, channel_id: u64) -> Option<u64>
where
    I: IntoIterator<Item = (u64, T)>,
    T: IntoIterator<Item = u64>,
{
    threads_by_guild.into_iter().find_map(|(guild_id, threads)| {
        threads
            .into_iter()
            .any(|thread_id| thread_id == channel_id)
            .then_some(guild_id)
    })
}

/// Channel lookups against the gateway cache. Never hits the network.
pub struct CacheChannelDirectory {
    cache: Arc<serenity::Cache>,
}

impl CacheChannelDirectory {
    pub fn new(cache: Arc<serenity::Cache>) -> Self {
        Self { cache }
    }

    /// Guild a cached channel or thread belongs to.
    pub fn guild_of_channel(&self, channel_id: u64) -> Option<u64> {
        if channel_id == 0 {
            return None;
        }
        let channel_id = serenity::ChannelId::new(channel_id);
        if let Some(channel) = self.cache.channel(channel_id) {
            return Some(channel.guild_id.get());
        }

        // Threads aren't in the channel map; search each cached guild's threads.
        let threads_by_guild = self.cache.guilds().into_iter().filter_map(|guild_id| {
            self.cache.guild(guild_id).map(|guild| {
                let threads: Vec<u64> = guild.threads.iter().map(|t| t.id.get()).collect();
                (guild_id.get(), threads)
            })
        });
        guild_owning_thread(threads_by_guild, channel_id.get())
    }
}

impl ChannelDirectory for CacheChannelDirectory {
    fn is_known_channel(&self, guild_id: u64, channel_id: u64) -> bool {
        if guild_id == 0 || channel_id == 0 {
            return false;
        }
        let channel_id = serenity::ChannelId::new(channel_id);
        self.cache
            .guild(serenity::GuildId::new(guild_id))
            .map(|guild| {
                guild.channels.contains_key(&channel_id)
                    || guild.threads.iter().any(|thread| thread.id == channel_id)
            })
            .unwrap_or(false)
    }
}
