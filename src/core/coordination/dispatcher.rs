// Event dispatch - maps each inbound guild event to the pipeline that
// handles it.
//
// Every event runs as its own tokio task. Handlers never return errors, and
// a panic inside one is caught from its join handle and reported, so nothing
// ever reaches the gateway event loop.

use super::error_sink::{ErrorSink, FailureKind};
use super::guild_locks::GuildLockRegistry;
use super::platform::{ChannelDirectory, RemoteActionClient};
use crate::core::moderation::{CaseStore, ModerationPipeline, SpamCounter, SpamThresholdExceeded};
use crate::core::settings::SettingsProvider;
use crate::core::starboard::{
    ReactionsBulkCleared, StarReaction, StarboardIndex, StarboardReconciler, StarboardStore,
    StarboardTracker,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Everything the pipelines talk to, built once at startup.
#[derive(Clone)]
pub struct CoreContext {
    pub remote: Arc<dyn RemoteActionClient>,
    pub cases: Arc<dyn CaseStore>,
    pub starboard: Arc<dyn StarboardStore>,
    pub settings: Arc<dyn SettingsProvider>,
    pub channels: Arc<dyn ChannelDirectory>,
    pub spam_counter: Arc<dyn SpamCounter>,
    pub locks: Arc<GuildLockRegistry>,
    pub starboard_index: Arc<StarboardIndex>,
    pub sink: Arc<dyn ErrorSink>,
    /// The bot's own user id, recorded as the moderator of automatic cases.
    pub moderator_id: u64,
    /// Bound on waiting for a guild lock. `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy)]
pub enum GuildEvent {
    SpamThresholdExceeded(SpamThresholdExceeded),
    ReactionsBulkCleared(ReactionsBulkCleared),
    StarReaction(StarReaction),
}

impl GuildEvent {
    fn name(&self) -> &'static str {
        match self {
            GuildEvent::SpamThresholdExceeded(_) => "spam threshold exceeded",
            GuildEvent::ReactionsBulkCleared(_) => "reactions bulk cleared",
            GuildEvent::StarReaction(_) => "star reaction",
        }
    }
}

pub struct EventDispatcher {
    moderation: Arc<ModerationPipeline>,
    reconciler: Arc<StarboardReconciler>,
    tracker: Arc<StarboardTracker>,
    sink: Arc<dyn ErrorSink>,
}

impl EventDispatcher {
    pub fn new(ctx: &CoreContext) -> Self {
        Self {
            moderation: Arc::new(ModerationPipeline::new(ctx)),
            reconciler: Arc::new(StarboardReconciler::new(ctx)),
            tracker: Arc::new(StarboardTracker::new(ctx)),
            sink: Arc::clone(&ctx.sink),
        }
    }

    /// Schedule the handler for `event`. The returned handle completes once
    /// the handler has finished (or its panic has been reported).
    pub fn dispatch(&self, event: GuildEvent) -> JoinHandle<()> {
        let name = event.name();
        let handler = match event {
            GuildEvent::SpamThresholdExceeded(event) => {
                let moderation = Arc::clone(&self.moderation);
                tokio::spawn(async move { moderation.on_spam_threshold_exceeded(event).await })
            }
            GuildEvent::ReactionsBulkCleared(event) => {
                let reconciler = Arc::clone(&self.reconciler);
                tokio::spawn(async move { reconciler.on_reactions_bulk_cleared(event).await })
            }
            GuildEvent::StarReaction(reaction) => {
                let tracker = Arc::clone(&self.tracker);
                tokio::spawn(async move { tracker.on_star_reaction(reaction).await })
            }
        };

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = handler.await {
                if e.is_panic() {
                    sink.report(FailureKind::HandlerPanicked, &e, name);
                }
            }
        })
    }
}
