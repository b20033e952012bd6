//! # folderhub-core
//!
//! Core crate for FolderHub. Contains configuration schemas, the
//! collaborator traits consumed by the folder service (access control,
//! user directory, event notification), domain events, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other FolderHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
