// Ports onto the chat platform and the persisted stores.
//
// The core only ever sees primitive ids. The Discord layer implements these
// traits on top of serenity; tests implement them with in-memory mocks.

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum RemoteActionError {
    #[error("Missing permissions: {0}")]
    Permission(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    Transient(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    StorageError(String),
}

// ============================================================================
// REMOTE ACTIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct BanOptions {
    /// Days of message history to purge. The mention spam ban keeps history.
    pub purge_days: u8,
    /// Audit log reason.
    pub reason: String,
}

/// Mutations against the platform's API. Each call is atomic on its own;
/// nothing here spans more than one request.
#[async_trait]
pub trait RemoteActionClient: Send + Sync {
    async fn ban(
        &self,
        guild_id: u64,
        user_id: u64,
        options: BanOptions,
    ) -> Result<(), RemoteActionError>;

    /// Send a plain text message, returning the new message's id.
    async fn send_message(&self, channel_id: u64, content: &str)
        -> Result<u64, RemoteActionError>;

    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
        reason: &str,
    ) -> Result<(), RemoteActionError>;
}

/// Read-only view of the channels this process currently knows about.
pub trait ChannelDirectory: Send + Sync {
    fn is_known_channel(&self, guild_id: u64, channel_id: u64) -> bool;
}
