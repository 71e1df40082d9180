// Core starboard module - index, reconciliation after reaction clears, and
// star tracking.

pub mod starboard_index;
pub mod starboard_models;
pub mod starboard_service;
pub mod starboard_tracker;

pub use starboard_index::*;
pub use starboard_models::*;
pub use starboard_service::*;
pub use starboard_tracker::*;
