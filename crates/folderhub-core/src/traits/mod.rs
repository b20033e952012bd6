//! Collaborator traits defined in `folderhub-core` and implemented elsewhere.
//!
//! The folder stores never check permissions or talk to other subsystems;
//! the service layer reaches them through these seams.

pub mod access;
pub mod directory;
pub mod notifier;

pub use access::{AccessChecker, Permission};
pub use directory::{UserDirectory, UserInfo};
pub use notifier::EventNotifier;
