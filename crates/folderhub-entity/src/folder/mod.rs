//! Folder domain entities.

pub mod audit;
pub mod closure;
pub mod model;
pub mod order;
pub mod tree;

pub use audit::FolderAudit;
pub use closure::ClosureEdge;
pub use model::{CreateFolder, DEFAULT_FOLDER_NAME, Folder, ParentFilter, UpdateFolder};
pub use order::AssetOrder;
pub use tree::FolderNode;
