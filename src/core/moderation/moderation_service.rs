// Mention spam enforcement - the ban -> notify -> clear -> log pipeline.
//
// Every step runs against an external system that may fail. A failed step
// is reported and the pipeline moves on; the counter reset and the case
// record are attempted no matter what happened before them. The whole
// sequence runs under the guild's lock so two enforcements in one guild
// never interleave.
//
// NO Discord dependencies here - just ports and ordering.

use super::mention_tracker::SpamCounter;
use super::moderation_models::{CaseType, NewCase, SpamThresholdExceeded};
use super::translations::{TextKey, Translator};
use crate::core::coordination::{
    BanOptions, CoreContext, ErrorSink, FailureKind, GuildLockRegistry, RemoteActionClient,
    StoreError,
};
use crate::core::settings::SettingsProvider;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Durable audit log of moderation actions.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Persist a case and return the id the store assigned to it.
    async fn create_case(&self, case: NewCase) -> Result<u64, StoreError>;
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct ModerationPipeline {
    locks: Arc<GuildLockRegistry>,
    remote: Arc<dyn RemoteActionClient>,
    cases: Arc<dyn CaseStore>,
    counter: Arc<dyn SpamCounter>,
    settings: Arc<dyn SettingsProvider>,
    sink: Arc<dyn ErrorSink>,
    moderator_id: u64,
    lock_timeout: Option<Duration>,
}

impl ModerationPipeline {
    pub fn new(ctx: &CoreContext) -> Self {
        Self {
            locks: Arc::clone(&ctx.locks),
            remote: Arc::clone(&ctx.remote),
            cases: Arc::clone(&ctx.cases),
            counter: Arc::clone(&ctx.spam_counter),
            settings: Arc::clone(&ctx.settings),
            sink: Arc::clone(&ctx.sink),
            moderator_id: ctx.moderator_id,
            lock_timeout: ctx.lock_timeout,
        }
    }

    /// Entry point for the dispatcher. Never fails: settings that cannot be
    /// read are reported and the event is dropped.
    pub async fn on_spam_threshold_exceeded(&self, event: SpamThresholdExceeded) {
        let settings = match self.settings.guild_settings(event.guild_id).await {
            Ok(settings) => settings,
            Err(e) => {
                self.sink.report(
                    FailureKind::StoreUnavailable,
                    &e,
                    &format!("reading mention spam settings for guild {}", event.guild_id),
                );
                return;
            }
        };

        self.enforce(&event, settings.mention_threshold, &settings.language)
            .await;
    }

    /// Run the enforcement sequence for one trigger.
    pub async fn enforce(
        &self,
        event: &SpamThresholdExceeded,
        threshold: u32,
        translator: &dyn Translator,
    ) {
        let guild_id = event.guild_id;
        let user_id = event.author_id;

        // Held until the end of this function, whatever happens below.
        let _lock = match self.lock_timeout {
            Some(timeout) => match self.locks.acquire_timeout(guild_id, timeout).await {
                Ok(guard) => guard,
                Err(e) => {
                    self.sink.report(
                        FailureKind::LockTimeout,
                        &e,
                        &format!("mention spam enforcement of user {}", user_id),
                    );
                    return;
                }
            },
            None => self.locks.acquire(guild_id).await,
        };

        tracing::info!(guild_id, user_id, threshold, "Enforcing mention spam ban");

        let ban = BanOptions {
            purge_days: 0,
            reason: translator.translate(TextKey::MentionSpamBanReason),
        };
        if let Err(e) = self.remote.ban(guild_id, user_id, ban).await {
            self.sink.report(
                FailureKind::RemoteActionFailure,
                &e,
                &format!("banning user {} in guild {}", user_id, guild_id),
            );
        }

        let notice = translator.translate(TextKey::MentionSpamNotice { user_id });
        if let Err(e) = self.remote.send_message(event.channel_id, &notice).await {
            self.sink.report(
                FailureKind::NotificationFailure,
                &e,
                &format!("sending mention spam notice to channel {}", event.channel_id),
            );
        }

        self.counter.clear(guild_id, user_id);

        let case = NewCase {
            guild_id,
            user_id,
            moderator_id: self.moderator_id,
            case_type: CaseType::Ban,
            reason: translator.translate(TextKey::MentionSpamCaseReason { threshold }),
            created_at: Utc::now(),
        };
        match self.cases.create_case(case).await {
            Ok(case_id) => {
                tracing::info!(guild_id, user_id, case_id, "Mention spam case recorded");
            }
            Err(e) => {
                self.sink.report(
                    FailureKind::CaseCreationFailure,
                    &e,
                    &format!("recording mention spam ban of user {} in guild {}", user_id, guild_id),
                );
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
