// Discord-specific mention spam handling - counts mentions on each message and
// hands threshold breaches to the moderation pipeline.

use crate::core::coordination::GuildEvent;
use crate::core::moderation::{MentionCheck, SpamThresholdExceeded};
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

/// Mentions carried by a message (users + roles).
fn mention_count(msg: &serenity::Message) -> u32 {
    (msg.mentions.len() + msg.mention_roles.len()) as u32
}

/// Count a message's mentions against its author.
///
/// Returns `true` if the author went over the guild's threshold and a ban was
/// scheduled.
pub async fn handle_message_for_mention_spam(
    msg: &serenity::Message,
    data: &Data,
) -> Result<bool, Error> {
    // Skip bots
    if msg.author.bot {
        return Ok(false);
    }

    // Only check guild messages
    let guild_id = match msg.guild_id {
        Some(id) => id.get(),
        None => return Ok(false),
    };

    let mentions = mention_count(msg);
    if mentions == 0 {
        return Ok(false);
    }

    let user_id = msg.author.id.get();
    let settings = data.settings.get(guild_id).await?;

    let check = data.mention_tracker.record(
        guild_id,
        user_id,
        mentions,
        settings.mention_threshold,
        settings.mention_window(),
    );

    match check {
        MentionCheck::Ok { .. } => Ok(false),
        MentionCheck::Exceeded { total } => {
            tracing::info!(
                guild_id = guild_id,
                user_id = user_id,
                total = total,
                threshold = settings.mention_threshold,
                "Mention spam threshold exceeded"
            );

            // Fire and forget; the pipeline reports its own failures.
            data.dispatcher
                .dispatch(GuildEvent::SpamThresholdExceeded(SpamThresholdExceeded {
                    guild_id,
                    author_id: user_id,
                    channel_id: msg.channel_id.get(),
                }));
            Ok(true)
        }
    }
}
