// Core moderation module - mention spam counting and enforcement.
// Following the same pattern as the starboard module.

pub mod mention_tracker;
pub mod moderation_models;
pub mod moderation_service;
pub mod translations;

pub use mention_tracker::*;
pub use moderation_models::*;
pub use moderation_service::*;
