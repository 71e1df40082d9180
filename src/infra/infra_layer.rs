// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "sqlite.rs"]
pub mod sqlite;

#[path = "moderation/sqlite_case_store.rs"]
pub mod moderation;

#[path = "starboard/sqlite_starboard_store.rs"]
pub mod starboard;

#[path = "settings/sqlite_settings_store.rs"]
pub mod settings;

#[path = "diagnostics/tracing_sink.rs"]
pub mod diagnostics;
