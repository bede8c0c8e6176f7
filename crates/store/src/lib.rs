//! Student profile and document storage for CampusFed.
//!
//! Backends implement `campusfed_core::StudentStore`:
//! - `SqliteStore`: the persistent store (students, profiles, documents)
//! - `InMemoryStore`: ephemeral, for tests and demos

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;
