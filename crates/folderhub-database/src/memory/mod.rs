//! In-memory folder store.
//!
//! Implements every store trait over plain collections guarded by one async
//! mutex. A unit of work holds the lock for its whole lifetime and restores
//! a snapshot when dropped uncommitted, so the closure maintainer sees the
//! same atomicity it gets from PostgreSQL.

mod state;
mod store;
mod unit_of_work;

pub use store::MemoryStore;
