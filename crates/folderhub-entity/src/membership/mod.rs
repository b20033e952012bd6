//! Folder ↔ album membership entities.

pub mod album;

pub use album::{FolderAlbum, FolderAlbumPair};
