// Starboard reconciliation - cleans up after a bulk reaction clear.
//
// When every reaction is removed from a message at once it can no longer be
// starred, so its cache entry, its persisted record and its mirror in the
// starboard channel all have to go. Only the first two are guaranteed: the
// remote delete is best effort and outside the persistence boundary.

use super::starboard_index::StarboardIndex;
use super::starboard_models::{
    DeleteOutcome, ReactionsBulkCleared, StarboardEntry, StarboardKey,
};
use crate::core::coordination::{
    ChannelDirectory, CoreContext, ErrorSink, FailureKind, RemoteActionClient, StoreError,
};
use crate::core::settings::{SettingsError, SettingsProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub const REACTIONS_CLEARED_REASON: &str = "Starboard Management: Reactions Cleared";

#[derive(Debug, Error)]
pub enum StarboardError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

#[async_trait]
pub trait StarboardStore: Send + Sync {
    /// Delete the entry for `message_id` in `guild_id`, returning what was
    /// removed. Deleting a missing entry is a no-op with `affected == 0`.
    async fn delete_by_message(
        &self,
        guild_id: u64,
        message_id: u64,
    ) -> Result<DeleteOutcome, StoreError>;

    async fn get_entry(
        &self,
        guild_id: u64,
        message_id: u64,
    ) -> Result<Option<StarboardEntry>, StoreError>;

    /// Insert or update the entry for (guild, channel, message).
    async fn upsert_entry(&self, entry: &StarboardEntry) -> Result<(), StoreError>;
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct StarboardReconciler {
    index: Arc<StarboardIndex>,
    store: Arc<dyn StarboardStore>,
    settings: Arc<dyn SettingsProvider>,
    channels: Arc<dyn ChannelDirectory>,
    remote: Arc<dyn RemoteActionClient>,
    sink: Arc<dyn ErrorSink>,
}

impl StarboardReconciler {
    pub fn new(ctx: &CoreContext) -> Self {
        Self {
            index: Arc::clone(&ctx.starboard_index),
            store: Arc::clone(&ctx.starboard),
            settings: Arc::clone(&ctx.settings),
            channels: Arc::clone(&ctx.channels),
            remote: Arc::clone(&ctx.remote),
            sink: Arc::clone(&ctx.sink),
        }
    }

    /// Entry point for the dispatcher. Never fails.
    pub async fn on_reactions_bulk_cleared(&self, event: ReactionsBulkCleared) {
        let guild_id = match event.guild_id {
            Some(id) => id,
            None => return,
        };

        // Stale or partial state: we don't know this channel, so we can't
        // have starred anything in it.
        if !self.channels.is_known_channel(guild_id, event.channel_id) {
            tracing::debug!(
                guild_id,
                channel_id = event.channel_id,
                "Ignoring reaction clear in unknown channel"
            );
            return;
        }

        // Must happen before the first await so a concurrent reaction update
        // for this key can't repopulate the cache from the row being deleted.
        let key = StarboardKey::new(event.channel_id, event.message_id);
        self.index.remove(&key);

        // A star tracked while we waited may have cached the entry again, so
        // drop it once more now that nobody else can touch this key.
        let _key_lock = self.index.lock_key(key).await;
        self.index.remove(&key);

        if let Err(e) = self.reconcile(guild_id, event.message_id).await {
            self.sink.report(
                FailureKind::StoreUnavailable,
                &e,
                &format!("reconciling starboard entry {} in guild {}", key, guild_id),
            );
        }
    }

    async fn reconcile(&self, guild_id: u64, message_id: u64) -> Result<(), StarboardError> {
        let outcome = self.store.delete_by_message(guild_id, message_id).await?;
        if outcome.affected == 0 {
            return Ok(());
        }

        let star_message_id = match outcome.deleted.first().and_then(|e| e.star_message_id) {
            Some(id) => id,
            None => return Ok(()),
        };

        let settings = self.settings.guild_settings(guild_id).await?;
        let starboard_channel = match settings.starboard_channel_id {
            Some(channel) => channel,
            None => {
                tracing::debug!(guild_id, "No starboard channel configured, nothing to clean up");
                return Ok(());
            }
        };

        if let Err(e) = self
            .remote
            .delete_message(starboard_channel, star_message_id, REACTIONS_CLEARED_REASON)
            .await
        {
            self.sink.report(
                FailureKind::RemoteActionFailure,
                &e,
                &format!(
                    "deleting starboard message {} in channel {}",
                    star_message_id, starboard_channel
                ),
            );
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::GuildSettings;
    use crate::core::starboard::{StarReaction, StarboardIndexEntry, StarboardTracker};
    use crate::core::test_support::Harness;

    const GUILD: u64 = 1;
    const CHANNEL: u64 = 11;
    const MESSAGE: u64 = 111;

    fn cleared() -> ReactionsBulkCleared {
        ReactionsBulkCleared {
            guild_id: Some(GUILD),
            channel_id: CHANNEL,
            message_id: MESSAGE,
        }
    }

    /// Known channel, starred message with mirror 123, starboard channel 555.
    fn starred_harness() -> Harness {
        let harness = Harness::new();
        harness.channels.add(GUILD, CHANNEL);
        harness.starboard.seed(StarboardEntry {
            guild_id: GUILD,
            channel_id: CHANNEL,
            message_id: MESSAGE,
            star_message_id: Some(123),
            star_count: 3,
        });
        let mut settings = GuildSettings::defaults(GUILD);
        settings.starboard_channel_id = Some(555);
        harness.settings.insert(settings);
        harness.ctx.starboard_index.insert(
            StarboardKey::new(CHANNEL, MESSAGE),
            StarboardIndexEntry {
                star_count: 3,
                star_message_id: Some(123),
            },
        );
        harness
    }

    #[tokio::test]
    async fn test_clear_removes_index_entry_record_and_mirror() {
        let harness = starred_harness();
        let reconciler = StarboardReconciler::new(&harness.ctx);

        reconciler.on_reactions_bulk_cleared(cleared()).await;

        // The index was already empty when the store saw the delete.
        assert_eq!(harness.starboard.index_sizes_at_delete(), vec![0]);
        assert_eq!(harness.starboard.deleted_counts(), vec![1]);
        assert_eq!(harness.remote.deletes(), vec![(555, 123)]);
        assert_eq!(
            harness.remote.delete_reasons(),
            vec![REACTIONS_CLEARED_REASON.to_string()]
        );
        assert!(harness.sink.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_star_during_clear_does_not_revive_deleted_entry() {
        let harness = starred_harness();
        harness.starboard.yield_calls();
        let reconciler = StarboardReconciler::new(&harness.ctx);
        let tracker = StarboardTracker::new(&harness.ctx);
        let star = StarReaction {
            guild_id: GUILD,
            channel_id: CHANNEL,
            message_id: MESSAGE,
            added: true,
        };

        // The clear parks inside the store delete while the star arrives.
        tokio::join!(
            reconciler.on_reactions_bulk_cleared(cleared()),
            tracker.on_star_reaction(star)
        );

        assert_eq!(harness.starboard.deleted_counts(), vec![1]);
        assert_eq!(harness.remote.deletes(), vec![(555, 123)]);

        // The star counted as the first one on a fresh entry with a new mirror.
        let sent = harness.remote.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 555);
        let entry = harness.starboard.entry(GUILD, MESSAGE).unwrap();
        assert_eq!(entry.star_count, 1);
        assert!(entry.star_message_id.is_some());
        assert_ne!(entry.star_message_id, Some(123));
        assert_eq!(
            harness
                .ctx
                .starboard_index
                .get(&StarboardKey::new(CHANNEL, MESSAGE)),
            Some(StarboardIndexEntry {
                star_count: 1,
                star_message_id: entry.star_message_id,
            })
        );

        // Later stars build on the new mirror, not the deleted one.
        tracker.on_star_reaction(star).await;
        let entry = harness.starboard.entry(GUILD, MESSAGE).unwrap();
        assert_eq!(entry.star_count, 2);
        assert_ne!(entry.star_message_id, Some(123));
        assert_eq!(harness.remote.sent().len(), 1);
        assert_eq!(harness.ctx.starboard_index.locked_keys(), 0);
    }

    #[tokio::test]
    async fn test_repeated_clear_is_idempotent() {
        let harness = starred_harness();
        let reconciler = StarboardReconciler::new(&harness.ctx);

        reconciler.on_reactions_bulk_cleared(cleared()).await;
        reconciler.on_reactions_bulk_cleared(cleared()).await;
        reconciler.on_reactions_bulk_cleared(cleared()).await;

        assert_eq!(harness.starboard.deleted_counts(), vec![1, 0, 0]);
        assert_eq!(harness.remote.deletes().len(), 1);
        assert!(harness.sink.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_unstarred_message_is_a_quiet_noop() {
        let harness = Harness::new();
        harness.channels.add(GUILD, CHANNEL);
        let reconciler = StarboardReconciler::new(&harness.ctx);

        reconciler.on_reactions_bulk_cleared(cleared()).await;

        assert_eq!(harness.starboard.deleted_counts(), vec![0]);
        assert!(harness.remote.deletes().is_empty());
        assert!(harness.sink.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_missing_guild_is_dropped() {
        let harness = starred_harness();
        let reconciler = StarboardReconciler::new(&harness.ctx);

        reconciler
            .on_reactions_bulk_cleared(ReactionsBulkCleared {
                guild_id: None,
                ..cleared()
            })
            .await;

        assert!(harness.starboard.deleted_counts().is_empty());
        assert!(harness.remote.deletes().is_empty());
        assert!(harness
            .ctx
            .starboard_index
            .contains(&StarboardKey::new(CHANNEL, MESSAGE)));
    }

    #[tokio::test]
    async fn test_unknown_channel_is_dropped() {
        let harness = starred_harness();
        let reconciler = StarboardReconciler::new(&harness.ctx);

        reconciler
            .on_reactions_bulk_cleared(ReactionsBulkCleared {
                channel_id: 999,
                ..cleared()
            })
            .await;

        assert!(harness.starboard.deleted_counts().is_empty());
        assert!(harness.remote.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_no_starboard_channel_stops_after_delete() {
        let harness = starred_harness();
        harness.settings.insert(GuildSettings::defaults(GUILD));
        let reconciler = StarboardReconciler::new(&harness.ctx);

        reconciler.on_reactions_bulk_cleared(cleared()).await;

        assert_eq!(harness.starboard.deleted_counts(), vec![1]);
        assert!(harness.remote.deletes().is_empty());
        assert!(harness.sink.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_entry_without_mirror_needs_no_remote_cleanup() {
        let harness = Harness::new();
        harness.channels.add(GUILD, CHANNEL);
        harness.starboard.seed(StarboardEntry {
            guild_id: GUILD,
            channel_id: CHANNEL,
            message_id: MESSAGE,
            star_message_id: None,
            star_count: 1,
        });
        let reconciler = StarboardReconciler::new(&harness.ctx);

        reconciler.on_reactions_bulk_cleared(cleared()).await;

        assert_eq!(harness.starboard.deleted_counts(), vec![1]);
        assert!(harness.remote.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remote_delete_is_reported() {
        let harness = starred_harness();
        harness.remote.fail_deletes();
        let reconciler = StarboardReconciler::new(&harness.ctx);

        reconciler.on_reactions_bulk_cleared(cleared()).await;

        assert_eq!(harness.starboard.deleted_counts(), vec![1]);
        assert_eq!(harness.sink.kinds(), vec![FailureKind::RemoteActionFailure]);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_reported_as_fatal() {
        let harness = starred_harness();
        harness.starboard.fail_deletes();
        let reconciler = StarboardReconciler::new(&harness.ctx);

        reconciler.on_reactions_bulk_cleared(cleared()).await;

        assert!(harness.remote.deletes().is_empty());
        assert_eq!(harness.sink.kinds(), vec![FailureKind::StoreUnavailable]);
        // The cache entry is gone even though the store never answered.
        assert!(harness
            .ctx
            .starboard_index
            .get(&StarboardKey::new(CHANNEL, MESSAGE))
            .is_none());
    }
}
