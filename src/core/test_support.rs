// In-memory implementations of every core port, shared by the core tests.
//
// Mocks that take part in the moderation sequence write to a shared journal
// so tests can assert on the order of side effects across components.

use crate::core::coordination::{
    BanOptions, ChannelDirectory, CoreContext, ErrorSink, FailureKind, GuildLockRegistry,
    RemoteActionClient, RemoteActionError, StoreError,
};
use crate::core::moderation::{CaseStore, NewCase, SpamCounter};
use crate::core::settings::{GuildSettings, SettingsError, SettingsProvider};
use crate::core::starboard::{DeleteOutcome, StarboardEntry, StarboardIndex, StarboardStore};
use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub type Journal = Arc<Mutex<Vec<String>>>;

fn push(journal: &Journal, entry: String) {
    journal.lock().unwrap().push(entry);
}

/// Poll the journal until `entry` shows up. Panics after about a second.
pub async fn wait_for(journal: &Journal, entry: &str) {
    for _ in 0..200 {
        if journal.lock().unwrap().iter().any(|e| e == entry) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for journal entry {}", entry);
}

// ============================================================================
// ERROR SINK
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(FailureKind, String)>>,
}

impl RecordingSink {
    pub fn kinds(&self) -> Vec<FailureKind> {
        self.reports.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }
}

impl ErrorSink for RecordingSink {
    fn report(&self, kind: FailureKind, error: &dyn std::error::Error, context: &str) {
        self.reports
            .lock()
            .unwrap()
            .push((kind, format!("{}: {}", context, error)));
    }
}

// ============================================================================
// REMOTE ACTIONS
// ============================================================================

pub struct MockRemote {
    journal: Journal,
    fail_ban: AtomicBool,
    fail_send: AtomicBool,
    fail_delete: AtomicBool,
    gates: DashMap<u64, Arc<Notify>>,
    bans: Mutex<Vec<BanOptions>>,
    sent: Mutex<Vec<(u64, String)>>,
    deletes: Mutex<Vec<(u64, u64, String)>>,
    next_message_id: AtomicU64,
}

impl MockRemote {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_ban: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            gates: DashMap::new(),
            bans: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            next_message_id: AtomicU64::new(5000),
        }
    }

    pub fn fail_bans(&self) {
        self.fail_ban.store(true, Ordering::SeqCst);
    }

    pub fn fail_sends(&self) {
        self.fail_send.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    /// Make every ban in `guild_id` wait for a `notify_one` on the returned gate.
    pub fn gate_bans(&self, guild_id: u64) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.insert(guild_id, Arc::clone(&gate));
        gate
    }

    pub fn bans(&self) -> Vec<BanOptions> {
        self.bans.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(u64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<(u64, u64)> {
        self.deletes
            .lock()
            .unwrap()
            .iter()
            .map(|(c, m, _)| (*c, *m))
            .collect()
    }

    pub fn delete_reasons(&self) -> Vec<String> {
        self.deletes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, r)| r.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteActionClient for MockRemote {
    async fn ban(
        &self,
        guild_id: u64,
        user_id: u64,
        options: BanOptions,
    ) -> Result<(), RemoteActionError> {
        push(&self.journal, format!("ban:{}:{}", guild_id, user_id));
        self.bans.lock().unwrap().push(options);

        let gate = self.gates.get(&guild_id).map(|g| Arc::clone(&g));
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_ban.load(Ordering::SeqCst) {
            return Err(RemoteActionError::Permission(
                "Missing Permissions".to_string(),
            ));
        }
        Ok(())
    }

    async fn send_message(
        &self,
        channel_id: u64,
        content: &str,
    ) -> Result<u64, RemoteActionError> {
        push(&self.journal, format!("send:{}", channel_id));
        self.sent
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));

        if self.fail_send.load(Ordering::SeqCst) {
            return Err(RemoteActionError::Transient("gateway timeout".to_string()));
        }
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn delete_message(
        &self,
        channel_id: u64,
        message_id: u64,
        reason: &str,
    ) -> Result<(), RemoteActionError> {
        push(&self.journal, format!("delete:{}:{}", channel_id, message_id));
        self.deletes
            .lock()
            .unwrap()
            .push((channel_id, message_id, reason.to_string()));

        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RemoteActionError::NotFound("Unknown Message".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// CASES AND COUNTERS
// ============================================================================

pub struct MockCaseStore {
    journal: Journal,
    fail: AtomicBool,
    attempts: AtomicUsize,
    created: Mutex<Vec<NewCase>>,
    next_ids: DashMap<u64, u64>,
}

impl MockCaseStore {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
            next_ids: DashMap::new(),
        }
    }

    pub fn fail_creates(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> Vec<NewCase> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl CaseStore for MockCaseStore {
    async fn create_case(&self, case: NewCase) -> Result<u64, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        push(
            &self.journal,
            format!("case:{}:{}", case.guild_id, case.user_id),
        );

        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::StorageError("database is locked".to_string()));
        }

        let case_id = {
            let mut next = self.next_ids.entry(case.guild_id).or_insert(0);
            *next += 1;
            *next
        };
        self.created.lock().unwrap().push(case);
        Ok(case_id)
    }
}

pub struct MockCounter {
    journal: Journal,
}

impl SpamCounter for MockCounter {
    fn clear(&self, guild_id: u64, user_id: u64) {
        push(&self.journal, format!("clear:{}:{}", guild_id, user_id));
    }
}

/// Counter whose reset panics, for checking cleanup on unwinding.
pub struct PanickingCounter;

impl SpamCounter for PanickingCounter {
    fn clear(&self, _guild_id: u64, _user_id: u64) {
        panic!("spam counter poisoned");
    }
}

// ============================================================================
// SETTINGS AND CHANNELS
// ============================================================================

pub struct InMemorySettings {
    settings: DashMap<u64, GuildSettings>,
    fail: AtomicBool,
    yield_reads: AtomicBool,
    saves: AtomicUsize,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self {
            settings: DashMap::new(),
            fail: AtomicBool::new(false),
            yield_reads: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, settings: GuildSettings) {
        self.settings.insert(settings.guild_id, settings);
    }

    pub fn fail_reads(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Make every read suspend once, like a real database round trip.
    pub fn yield_reads(&self) {
        self.yield_reads.store(true, Ordering::SeqCst);
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsProvider for InMemorySettings {
    async fn guild_settings(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        if self.yield_reads.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(SettingsError::StorageError("connection refused".to_string()));
        }
        Ok(self
            .settings
            .get(&guild_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| GuildSettings::defaults(guild_id)))
    }

    async fn save_settings(&self, settings: &GuildSettings) -> Result<(), SettingsError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.insert(settings.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticChannels {
    known: DashSet<(u64, u64)>,
}

impl StaticChannels {
    pub fn add(&self, guild_id: u64, channel_id: u64) {
        self.known.insert((guild_id, channel_id));
    }
}

impl ChannelDirectory for StaticChannels {
    fn is_known_channel(&self, guild_id: u64, channel_id: u64) -> bool {
        self.known.contains(&(guild_id, channel_id))
    }
}

// ============================================================================
// STARBOARD STORE
// ============================================================================

pub struct MockStarboardStore {
    entries: DashMap<(u64, u64), StarboardEntry>,
    index: Arc<StarboardIndex>,
    fail_delete: AtomicBool,
    yield_calls: AtomicBool,
    deleted_counts: Mutex<Vec<u64>>,
    index_sizes: Mutex<Vec<usize>>,
}

impl MockStarboardStore {
    /// `index` is observed on every delete to check it was invalidated first.
    pub fn new(index: Arc<StarboardIndex>) -> Self {
        Self {
            entries: DashMap::new(),
            index,
            fail_delete: AtomicBool::new(false),
            yield_calls: AtomicBool::new(false),
            deleted_counts: Mutex::new(Vec::new()),
            index_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, entry: StarboardEntry) {
        self.entries
            .insert((entry.guild_id, entry.message_id), entry);
    }

    pub fn entry(&self, guild_id: u64, message_id: u64) -> Option<StarboardEntry> {
        self.entries
            .get(&(guild_id, message_id))
            .map(|e| e.clone())
    }

    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    /// Make every store call suspend once before touching the rows.
    pub fn yield_calls(&self) {
        self.yield_calls.store(true, Ordering::SeqCst);
    }

    async fn maybe_yield(&self) {
        if self.yield_calls.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    /// Rows affected by each delete call, in call order.
    pub fn deleted_counts(&self) -> Vec<u64> {
        self.deleted_counts.lock().unwrap().clone()
    }

    /// Index size observed at the start of each delete call.
    pub fn index_sizes_at_delete(&self) -> Vec<usize> {
        self.index_sizes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StarboardStore for MockStarboardStore {
    async fn delete_by_message(
        &self,
        guild_id: u64,
        message_id: u64,
    ) -> Result<DeleteOutcome, StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::StorageError("unable to open database".to_string()));
        }
        self.index_sizes.lock().unwrap().push(self.index.len());
        self.maybe_yield().await;

        let deleted: Vec<StarboardEntry> = self
            .entries
            .remove(&(guild_id, message_id))
            .map(|(_, entry)| entry)
            .into_iter()
            .collect();
        let affected = deleted.len() as u64;
        self.deleted_counts.lock().unwrap().push(affected);

        Ok(DeleteOutcome { affected, deleted })
    }

    async fn get_entry(
        &self,
        guild_id: u64,
        message_id: u64,
    ) -> Result<Option<StarboardEntry>, StoreError> {
        self.maybe_yield().await;
        Ok(self.entry(guild_id, message_id))
    }

    async fn upsert_entry(&self, entry: &StarboardEntry) -> Result<(), StoreError> {
        self.maybe_yield().await;
        self.seed(entry.clone());
        Ok(())
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct Harness {
    pub log: Journal,
    pub remote: Arc<MockRemote>,
    pub cases: Arc<MockCaseStore>,
    pub starboard: Arc<MockStarboardStore>,
    pub settings: Arc<InMemorySettings>,
    pub channels: Arc<StaticChannels>,
    pub sink: Arc<RecordingSink>,
    pub ctx: CoreContext,
}

impl Harness {
    pub const BOT_ID: u64 = 999;

    pub fn new() -> Self {
        let log: Journal = Arc::new(Mutex::new(Vec::new()));
        let remote = Arc::new(MockRemote::new(Arc::clone(&log)));
        let cases = Arc::new(MockCaseStore::new(Arc::clone(&log)));
        let index = Arc::new(StarboardIndex::new());
        let starboard = Arc::new(MockStarboardStore::new(Arc::clone(&index)));
        let settings = Arc::new(InMemorySettings::new());
        let channels = Arc::new(StaticChannels::default());
        let sink = Arc::new(RecordingSink::default());

        let ctx = CoreContext {
            remote: remote.clone(),
            cases: cases.clone(),
            starboard: starboard.clone(),
            settings: settings.clone(),
            channels: channels.clone(),
            spam_counter: Arc::new(MockCounter {
                journal: Arc::clone(&log),
            }),
            locks: Arc::new(GuildLockRegistry::new()),
            starboard_index: index,
            sink: sink.clone(),
            moderator_id: Self::BOT_ID,
            lock_timeout: None,
        };

        Self {
            log,
            remote,
            cases,
            starboard,
            settings,
            channels,
            sink,
            ctx,
        }
    }

    pub fn journal(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}
