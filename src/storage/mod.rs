//! Session storage for leadflow.
//!
//! Persists one [`LeadSession`](crate::core::LeadSession) per session id,
//! with file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;
pub use traits::{validate_session_id, SessionStore};
