//! # folderhub-service
//!
//! Folder use cases for FolderHub. [`FolderService`] combines the hierarchy
//! store, the closure maintainer, album membership, and folder shares with
//! the access-control, user-directory, and notification collaborators.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod access;
pub mod context;
pub mod events;
pub mod folder;

pub use access::OwnershipAccessChecker;
pub use context::RequestContext;
pub use events::EventBus;
pub use folder::FolderService;
