//! PostgreSQL implementations of the folder store traits.

pub mod folder;
pub mod folder_album;
pub mod folder_user;

pub use folder::{FolderRepository, PgUnitOfWork};
pub use folder_album::FolderAlbumRepository;
pub use folder_user::FolderUserRepository;

use folderhub_core::error::{AppError, ErrorKind};

/// Map a write error, turning unique violations into `Conflict`.
pub(crate) fn map_write_error(
    e: sqlx::Error,
    message: &'static str,
    conflict: impl FnOnce() -> String,
) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::conflict(conflict())
        }
        _ => AppError::with_source(ErrorKind::Database, message, e),
    }
}
