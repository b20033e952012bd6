//! # folderhub-database
//!
//! Folder hierarchy storage for FolderHub: an adjacency-list parent pointer
//! plus a transitive-closure table, flat folder ↔ album membership, and
//! folder shares.
//!
//! The store traits in [`store`] have two implementations: the PostgreSQL
//! repositories in [`repositories`] and the in-memory [`memory::MemoryStore`].
//! Hierarchy mutations are orchestrated once, in [`closure::ClosureMaintainer`],
//! against an explicit unit of work obtained from either backend.

pub mod closure;
pub mod connection;
pub mod memory;
pub mod membership;
pub mod migration;
pub mod repositories;
pub mod store;

pub use closure::ClosureMaintainer;
pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use membership::AlbumMembership;
pub use store::{
    AlbumMembershipStore, FolderBackend, FolderStore, FolderUnitOfWork, FolderUserStore,
};
