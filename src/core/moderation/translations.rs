// Localized text used by the moderation pipeline.

use crate::core::settings::Language;

/// Text the pipeline needs, with the values interpolated into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKey {
    /// Audit log reason attached to the ban.
    MentionSpamBanReason,
    /// Notice posted in the channel where the spam happened.
    MentionSpamNotice { user_id: u64 },
    /// Reason stored on the moderation case.
    MentionSpamCaseReason { threshold: u32 },
}

pub trait Translator: Send + Sync {
    fn translate(&self, key: TextKey) -> String;
}

impl Translator for Language {
    fn translate(&self, key: TextKey) -> String {
        match (self, key) {
            (Language::EnUs, TextKey::MentionSpamBanReason) => {
                "[Auto-Moderation] Mention spam threshold exceeded.".to_string()
            }
            (Language::EnUs, TextKey::MentionSpamNotice { user_id }) => format!(
                "🔨 <@{}> ({}) has been banned for mention spam.",
                user_id, user_id
            ),
            (Language::EnUs, TextKey::MentionSpamCaseReason { threshold }) => format!(
                "[Auto-Moderation] Mention spam threshold exceeded. Threshold: {}.",
                threshold
            ),
            (Language::EsEs, TextKey::MentionSpamBanReason) => {
                "[Auto-Moderación] Se superó el límite de menciones.".to_string()
            }
            (Language::EsEs, TextKey::MentionSpamNotice { user_id }) => format!(
                "🔨 <@{}> ({}) ha sido baneado por spam de menciones.",
                user_id, user_id
            ),
            (Language::EsEs, TextKey::MentionSpamCaseReason { threshold }) => format!(
                "[Auto-Moderación] Se superó el límite de menciones. Límite: {}.",
                threshold
            ),
        }
    }
}
