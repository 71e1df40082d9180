// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "coordination/mod.rs"]
pub mod coordination;

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "settings/mod.rs"]
pub mod settings;

#[path = "starboard/mod.rs"]
pub mod starboard;

#[cfg(test)]
#[path = "test_support.rs"]
pub mod test_support;
