//! Folder use cases.

pub mod dto;
pub mod service;

pub use dto::{
    AddAlbumsToFoldersRequest, AddAlbumsToFoldersResponse, AddUsersRequest, BulkIdsRequest,
    CreateFolderRequest, FolderDetails, FolderStatistics, FolderSummary, FolderUserInput,
    ListFoldersQuery, UpdateFolderRequest, UpdateFolderUserRequest, UserTarget,
};
pub use service::FolderService;
