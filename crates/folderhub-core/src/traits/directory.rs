//! User directory collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::AppResult;

/// Public profile of a user as seen by the folder subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User ID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

/// Resolves user ids for share-invite validation.
#[async_trait]
pub trait UserDirectory: Send + Sync + std::fmt::Debug + 'static {
    /// Look up a user. Returns `None` if the user does not exist.
    async fn find(&self, user_id: Uuid) -> AppResult<Option<UserInfo>>;
}
