// Discord commands for per-guild sentinel settings.
//
// Thin translation only: Discord types in, primitives to SettingsService,
// a short reply out.

use crate::core::settings::{GuildSettings, Language};
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum LanguageChoice {
    #[name = "English (US)"]
    EnglishUs,
    #[name = "Español (España)"]
    SpanishEs,
}

impl From<LanguageChoice> for Language {
    fn from(choice: LanguageChoice) -> Self {
        match choice {
            LanguageChoice::EnglishUs => Language::EnUs,
            LanguageChoice::SpanishEs => Language::EsEs,
        }
    }
}

fn guild_id(ctx: &Context<'_>) -> Result<u64, Error> {
    Ok(ctx.guild_id().ok_or("Must be in a guild")?.get())
}

fn channel_label(channel_id: Option<u64>) -> String {
    channel_id
        .map(|id| format!("<#{}>", id))
        .unwrap_or_else(|| "Not set".to_string())
}

fn settings_embed(settings: &GuildSettings) -> serenity::CreateEmbed {
    serenity::CreateEmbed::default()
        .title("Sentinel Configuration")
        .color(serenity::Color::BLURPLE)
        .field(
            "Mention Threshold",
            format!(
                "{} mentions per {}s",
                settings.mention_threshold, settings.mention_window_secs
            ),
            false,
        )
        .field("Language", settings.language.code(), true)
        .field(
            "Starboard Channel",
            channel_label(settings.starboard_channel_id),
            true,
        )
        .field(
            "Starboard Minimum",
            format!("{} ⭐", settings.starboard_minimum),
            true,
        )
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Guild ID: {}",
            settings.guild_id
        )))
        .timestamp(serenity::Timestamp::now())
}

/// Manage mention spam and starboard settings.
#[poise::command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands(
        "status",
        "mention_threshold",
        "mention_window",
        "language",
        "starboard_channel",
        "starboard_minimum"
    )
)]
pub async fn sentinel(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the current configuration.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let settings = ctx.data().settings.get(guild_id).await?;

    ctx.send(poise::CreateReply::default().embed(settings_embed(&settings)))
        .await?;
    Ok(())
}

/// Set how many mentions a member may send per window before being banned.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn mention_threshold(
    ctx: Context<'_>,
    #[description = "Mentions allowed per window"]
    #[min = 1]
    threshold: u32,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let settings = ctx
        .data()
        .settings
        .set_mention_threshold(guild_id, threshold)
        .await?;
    ctx.say(format!(
        "✅ Mention threshold set to {} per {}s.",
        settings.mention_threshold, settings.mention_window_secs
    ))
    .await?;
    Ok(())
}

/// Set the length of the mention counting window.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn mention_window(
    ctx: Context<'_>,
    #[description = "Window length in seconds"]
    #[min = 1]
    seconds: u64,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let settings = ctx
        .data()
        .settings
        .set_mention_window(guild_id, seconds)
        .await?;
    ctx.say(format!(
        "✅ Mention window set to {}s.",
        settings.mention_window_secs
    ))
    .await?;
    Ok(())
}

/// Set the language used for moderation notices and case reasons.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn language(
    ctx: Context<'_>,
    #[description = "Language"] language: LanguageChoice,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let settings = ctx
        .data()
        .settings
        .set_language(guild_id, language.into())
        .await?;
    ctx.say(format!("✅ Language set to `{}`.", settings.language))
        .await?;
    Ok(())
}

/// Set the starboard channel. Leave empty to turn the starboard off.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn starboard_channel(
    ctx: Context<'_>,
    #[description = "Channel starred messages are posted to"] channel: Option<serenity::Channel>,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let channel_id = channel.map(|c| c.id().get());

    ctx.data()
        .settings
        .set_starboard_channel(guild_id, channel_id)
        .await?;

    match channel_id {
        Some(id) => ctx.say(format!("✅ Starboard channel set to <#{}>.", id)).await?,
        None => ctx.say("🛑 Starboard disabled.").await?,
    };
    Ok(())
}

/// Set how many ⭐ a message needs before it is posted to the starboard.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn starboard_minimum(
    ctx: Context<'_>,
    #[description = "Stars required"]
    #[min = 1]
    minimum: u32,
) -> Result<(), Error> {
    let guild_id = guild_id(&ctx)?;
    let settings = ctx
        .data()
        .settings
        .set_starboard_minimum(guild_id, minimum)
        .await?;
    ctx.say(format!(
        "✅ Starboard minimum set to {} ⭐.",
        settings.starboard_minimum
    ))
    .await?;
    Ok(())
}
