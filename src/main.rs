// This is the entry point of the guild sentinel bot.
//
// **Architecture Overview:**
// - `core/` = Coordination logic (platform-agnostic): guild locks, the
//   moderation pipeline, starboard reconciliation
// - `infra/` = Implementations of core traits (SQLite stores, tracing sink)
// - `discord/` = Discord-specific adapters (commands, events, serenity ports)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize stores (dependency injection)
// 3. Set up the Discord framework
// 4. Route gateway events to the dispatcher

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::coordination::{CoreContext, EventDispatcher, GuildLockRegistry};
use crate::core::moderation::MentionSpamTracker;
use crate::core::settings::{SettingsProvider, SettingsService};
use crate::core::starboard::StarboardIndex;
use crate::discord::actions::{CacheChannelDirectory, SerenityActionClient};
use crate::discord::moderation::handle_message_for_mention_spam;
use crate::discord::starboard::{handle_reaction_remove_all, handle_star_reaction};
use crate::discord::{Data, Error};
use crate::infra::diagnostics::TracingErrorSink;
use crate::infra::moderation::SqliteCaseStore;
use crate::infra::settings::SqliteSettingsStore;
use crate::infra::sqlite::open_pool;
use crate::infra::starboard::SqliteStarboardStore;
use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often expired mention buckets are dropped.
const MENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Event handler for non-command Discord events.
async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Message { new_message } => {
            if let Err(e) = handle_message_for_mention_spam(new_message, data).await {
                tracing::error!(
                    guild_id = new_message.guild_id.map(|g| g.get()),
                    "Error checking message for mention spam: {}",
                    e
                );
            }
        }
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            handle_star_reaction(data, add_reaction, true);
        }
        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            handle_star_reaction(data, removed_reaction, false);
        }
        serenity::FullEvent::ReactionRemoveAll {
            channel_id,
            removed_from_message_id,
        } => {
            handle_reaction_remove_all(ctx, data, *channel_id, *removed_from_message_id);
        }

        _ => {}
    }

    Ok(())
}

/// `GUILD_LOCK_TIMEOUT_SECS`, if set, bounds how long a pipeline waits for
/// its guild lock. Unset (or 0) waits indefinitely.
fn lock_timeout_from_env() -> anyhow::Result<Option<Duration>> {
    match std::env::var("GUILD_LOCK_TIMEOUT_SECS") {
        Ok(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("GUILD_LOCK_TIMEOUT_SECS is not a number: {raw}"))?;
            Ok((secs > 0).then(|| Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let token = std::env::var("DISCORD_TOKEN").context(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    )?;

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
    let db_path = format!("{}/sentinel.db", data_dir);
    let lock_timeout = lock_timeout_from_env()?;

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Stores are built here; the pieces that need the bot's HTTP client and
    // cache are wired in `setup` once the gateway is ready.

    let pool = open_pool(&db_path)
        .await
        .with_context(|| format!("Failed to open database at {}", db_path))?;

    let case_store = SqliteCaseStore::new(pool.clone());
    case_store.migrate().await?;
    let starboard_store = SqliteStarboardStore::new(pool.clone());
    starboard_store.migrate().await?;
    let settings_store = SqliteSettingsStore::new(pool);
    settings_store.migrate().await?;

    let settings_provider: Arc<dyn SettingsProvider> = Arc::new(settings_store);
    let case_store = Arc::new(case_store);
    let starboard_store = Arc::new(starboard_store);
    let mention_tracker = Arc::new(MentionSpamTracker::new());

    tracing::info!(
        db_path = %db_path,
        lock_timeout_secs = lock_timeout.map(|d| d.as_secs()),
        "Stores ready"
    );

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Mentions are only populated with content access
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![discord::commands::settings::sentinel()],
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                tracing::info!(user = %ready.user.name, "Bot is starting up");

                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let core_ctx = CoreContext {
                    remote: Arc::new(SerenityActionClient::new(ctx.http.clone())),
                    cases: case_store,
                    starboard: starboard_store,
                    settings: Arc::clone(&settings_provider),
                    channels: Arc::new(CacheChannelDirectory::new(ctx.cache.clone())),
                    spam_counter: mention_tracker.clone(),
                    locks: Arc::new(GuildLockRegistry::new()),
                    starboard_index: Arc::new(StarboardIndex::new()),
                    sink: Arc::new(TracingErrorSink::new()),
                    moderator_id: ready.user.id.get(),
                    lock_timeout,
                };

                // Expired mention buckets would otherwise linger until the
                // same user mentions someone again.
                let sweeper = Arc::clone(&mention_tracker);
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(MENTION_SWEEP_INTERVAL);
                    loop {
                        interval.tick().await;
                        let dropped = sweeper.sweep(Instant::now());
                        if dropped > 0 {
                            tracing::debug!(dropped = dropped, "Swept expired mention buckets");
                        }
                    }
                });

                tracing::info!("Commands registered, bot is ready");

                Ok(Data {
                    settings: Arc::new(SettingsService::new(settings_provider)),
                    mention_tracker,
                    dispatcher: Arc::new(EventDispatcher::new(&core_ctx)),
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .context("Error creating client")?;

    client.start().await.context("Error running bot")?;
    Ok(())
}
