// Core coordination module - guild locks, error reporting, platform ports
// and event dispatch shared by every pipeline.

pub mod dispatcher;
pub mod error_sink;
pub mod guild_locks;
pub mod platform;

pub use dispatcher::*;
pub use error_sink::*;
pub use guild_locks::*;
pub use platform::*;
