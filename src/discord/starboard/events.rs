// Starboard gateway events - translates serenity reaction events into core
// starboard events.

use crate::core::coordination::GuildEvent;
use crate::core::starboard::{ReactionsBulkCleared, StarReaction};
use crate::discord::actions::CacheChannelDirectory;
use crate::discord::Data;
use poise::serenity_prelude as serenity;

const STAR: &str = "⭐";

fn is_star(emoji: &serenity::ReactionType) -> bool {
    matches!(emoji, serenity::ReactionType::Unicode(name) if name == STAR)
}

/// All reactions were removed from a message at once.
///
/// The gateway payload carries no guild id, so it is looked up from the
/// channel and thread cache. An uncached channel leaves the guild unknown and
/// the reconciler ignores the event.
pub fn handle_reaction_remove_all(
    ctx: &serenity::Context,
    data: &Data,
    channel_id: serenity::ChannelId,
    message_id: serenity::MessageId,
) {
    let guild_id =
        CacheChannelDirectory::new(ctx.cache.clone()).guild_of_channel(channel_id.get());

    data.dispatcher
        .dispatch(GuildEvent::ReactionsBulkCleared(ReactionsBulkCleared {
            guild_id,
            channel_id: channel_id.get(),
            message_id: message_id.get(),
        }));
}

/// A single reaction was added or removed. Only ⭐ from non-bot users counts.
pub fn handle_star_reaction(data: &Data, reaction: &serenity::Reaction, added: bool) {
    if !is_star(&reaction.emoji) {
        return;
    }

    let Some(guild_id) = reaction.guild_id else {
        return;
    };

    if reaction.member.as_ref().is_some_and(|m| m.user.bot) {
        return;
    }

    data.dispatcher
        .dispatch(GuildEvent::StarReaction(StarReaction {
            guild_id: guild_id.get(),
            channel_id: reaction.channel_id.get(),
            message_id: reaction.message_id.get(),
            added,
        }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unicode_star_counts() {
        assert!(is_star(&serenity::ReactionType::Unicode("⭐".to_string())));
        assert!(!is_star(&serenity::ReactionType::Unicode("🌟".to_string())));
        assert!(!is_star(&serenity::ReactionType::Unicode("👍".to_string())));
    }
}
