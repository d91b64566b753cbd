//! Scoped sessions with TTL, bounded count and size ceilings
//!
//! [`SessionManager`] owns the registry of live sessions, evicts the least
//! recently used one when full and runs a background reaper for expired
//! ones. [`SessionProtocol`] exposes it as a small JSON command surface.

mod manager;
mod protocol;
mod reaper;
mod scoped;
mod types;


pub use manager::SessionManager;
pub use protocol::{SessionCommand, SessionProtocol};
pub use scoped::Session;
pub use types::{SessionConfig, SessionInfo, SessionSnapshot, SessionStats};
