//! `vitrine-core` — foundation building blocks for the access-control layer.
//!
//! This crate contains identifiers, the clock abstraction and the key-value
//! storage port. It knows nothing about roles, sessions or audit semantics.

pub mod clock;
pub mod error;
pub mod id;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StorageError, StorageResult};
pub use id::{AuditEntryId, SessionId};
pub use storage::{InMemoryStore, JsonFileStore, KeyValueStore};
