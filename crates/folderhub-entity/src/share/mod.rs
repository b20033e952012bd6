//! Folder sharing entities.

pub mod audit;
pub mod model;
pub mod role;

pub use audit::FolderUserAudit;
pub use model::{CreateFolderUser, FolderUser};
pub use role::FolderUserRole;
