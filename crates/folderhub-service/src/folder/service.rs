//! Folder use cases with access enforcement and notifications.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use folderhub_core::error::AppError;
use folderhub_core::events::{DomainEvent, FolderEvent};
use folderhub_core::traits::{AccessChecker, EventNotifier, Permission, UserDirectory};
use folderhub_database::store::{FolderStore, FolderUserStore};
use folderhub_database::{AlbumMembership, ClosureMaintainer};
use folderhub_entity::bulk::{BulkIdOutcome, BulkIdResult, successful_ids};
use folderhub_entity::folder::{
    CreateFolder, DEFAULT_FOLDER_NAME, Folder, FolderNode, ParentFilter,
};
use folderhub_entity::membership::FolderAlbumPair;
use folderhub_entity::share::{FolderUser, FolderUserRole};

use super::dto::{
    AddAlbumsToFoldersRequest, AddAlbumsToFoldersResponse, AddUsersRequest, BulkIdsRequest,
    CreateFolderRequest, FolderDetails, FolderStatistics, FolderSummary, ListFoldersQuery,
    UpdateFolderRequest, UpdateFolderUserRequest, UserTarget, validated,
};
use crate::context::RequestContext;

/// Folder use cases.
///
/// Stores never check permissions; every method here does so through the
/// [`AccessChecker`] before touching them.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Hierarchy reads and attribute writes.
    folders: Arc<dyn FolderStore>,
    /// Hierarchy mutations.
    maintainer: ClosureMaintainer,
    /// Folder ↔ album membership.
    albums: AlbumMembership,
    /// Folder shares.
    shares: Arc<dyn FolderUserStore>,
    /// Permission decisions.
    access: Arc<dyn AccessChecker>,
    /// User lookups for share invites.
    users: Arc<dyn UserDirectory>,
    /// Post-commit notifications.
    notifier: Arc<dyn EventNotifier>,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(
        folders: Arc<dyn FolderStore>,
        maintainer: ClosureMaintainer,
        albums: AlbumMembership,
        shares: Arc<dyn FolderUserStore>,
        access: Arc<dyn AccessChecker>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self {
        Self {
            folders,
            maintainer,
            albums,
            shares,
            access,
            users,
            notifier,
        }
    }

    /// Counts of owned, shared, and unshared folders.
    pub async fn statistics(&self, ctx: &RequestContext) -> Result<FolderStatistics, AppError> {
        let owned = self.folders.find_owned(ctx.user_id, ParentFilter::Any).await?;
        let shared = self.folders.find_shared(ctx.user_id).await?;
        let not_shared = self.folders.find_not_shared(ctx.user_id).await?;

        Ok(FolderStatistics {
            owned: owned.len() as u64,
            shared: shared.len() as u64,
            not_shared: not_shared.len() as u64,
        })
    }

    /// Lists folders with album and subfolder counts.
    pub async fn list(
        &self,
        ctx: &RequestContext,
        query: &ListFoldersQuery,
    ) -> Result<Vec<FolderSummary>, AppError> {
        let folders = if let Some(album_id) = query.album_id {
            self.folders.find_by_album(ctx.user_id, album_id).await?
        } else {
            match query.shared {
                Some(true) => self.folders.find_shared(ctx.user_id).await?,
                Some(false) => self.folders.find_not_shared(ctx.user_id).await?,
                None => {
                    self.folders
                        .find_owned(ctx.user_id, query.parent_filter())
                        .await?
                }
            }
        };

        self.summarize(folders).await
    }

    /// Gets a folder with its albums, shares, and ancestor breadcrumb.
    pub async fn get(&self, ctx: &RequestContext, id: Uuid) -> Result<FolderDetails, AppError> {
        self.access
            .require(ctx.user_id, Permission::FolderRead, &[id])
            .await?;
        let folder = self.find_or_fail(id).await?;

        Ok(FolderDetails {
            albums: self.albums.list(id).await?,
            shares: self.shares.list_for_folder(id).await?,
            ancestors: self.folders.find_ancestors(id).await?,
            folder,
        })
    }

    /// Creates a folder, optionally nested, with initial albums and shares.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        req: CreateFolderRequest,
    ) -> Result<Folder, AppError> {
        validated(&req)?;

        let mut invited = HashSet::new();
        for user in &req.users {
            if user.user_id == ctx.user_id {
                return Err(AppError::invalid_operation("Cannot share folder with owner"));
            }
            if !invited.insert(user.user_id) {
                return Err(AppError::invalid_operation("User already added"));
            }
            self.require_user(user.user_id).await?;
        }

        if let Some(parent_id) = req.parent_id {
            self.access
                .require(ctx.user_id, Permission::FolderRead, &[parent_id])
                .await?;
            self.folders
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| AppError::not_found("Parent folder not found"))?;
        }

        let album_ids = self
            .permitted_in_order(ctx, Permission::AlbumRead, &req.album_ids)
            .await?;

        let name = req
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FOLDER_NAME);
        let data = CreateFolder {
            owner_id: ctx.user_id,
            name: name.to_string(),
            description: req.description,
            parent_id: req.parent_id,
            asset_order: Default::default(),
        };
        let users: Vec<(Uuid, FolderUserRole)> =
            req.users.iter().map(|u| (u.user_id, u.role)).collect();

        let folder = self
            .maintainer
            .create_folder_with_members(&data, &album_ids, &users)
            .await?;

        info!(
            user_id = %ctx.user_id,
            folder_id = %folder.id,
            albums = album_ids.len(),
            shared_with = users.len(),
            "Folder created"
        );

        for (user_id, _) in users {
            self.emit(
                ctx,
                FolderEvent::Invited {
                    folder_id: folder.id,
                    user_id,
                },
            )
            .await;
        }

        Ok(folder)
    }

    /// Updates a folder's attributes and/or moves it under a new parent.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        req: UpdateFolderRequest,
    ) -> Result<Folder, AppError> {
        validated(&req)?;
        self.access
            .require(ctx.user_id, Permission::FolderUpdate, &[id])
            .await?;
        let folder = self.find_or_fail(id).await?;

        if let Some(asset_id) = req.thumbnail_asset_id {
            let wanted: HashSet<Uuid> = [asset_id].into_iter().collect();
            let allowed = self
                .access
                .check(ctx.user_id, Permission::AssetRead, &wanted)
                .await?;
            if allowed.is_empty() {
                return Err(AppError::validation("Invalid folder thumbnail"));
            }
        }

        let changes = req.changes();
        let new_parent_id = req.parent_id.filter(|parent| *parent != folder.parent_id);
        let updated = match new_parent_id {
            Some(new_parent_id) => {
                if let Some(parent_id) = new_parent_id {
                    self.access
                        .require(ctx.user_id, Permission::FolderRead, &[parent_id])
                        .await?;
                    self.folders
                        .find_by_id(parent_id)
                        .await?
                        .ok_or_else(|| AppError::not_found("Parent folder not found"))?;
                }
                self.maintainer
                    .move_and_update(id, new_parent_id, &changes)
                    .await?
            }
            None if changes.is_empty() => folder,
            None => self.folders.update(id, &changes).await?,
        };

        info!(user_id = %ctx.user_id, folder_id = %id, "Folder updated");
        Ok(updated)
    }

    /// Deletes a folder and all of its subfolders.
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), AppError> {
        self.access
            .require(ctx.user_id, Permission::FolderDelete, &[id])
            .await?;

        if !self.maintainer.delete_folder(id).await? {
            return Err(AppError::not_found("Folder not found"));
        }

        info!(user_id = %ctx.user_id, folder_id = %id, "Folder deleted");
        Ok(())
    }

    /// Direct subfolders readable by the caller, with counts.
    pub async fn subfolders(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Vec<FolderSummary>, AppError> {
        self.access
            .require(ctx.user_id, Permission::FolderRead, &[id])
            .await?;
        let children = self.folders.find_children(ctx.user_id, id).await?;
        self.summarize(children).await
    }

    /// Breadcrumb from the root down to the folder's parent.
    pub async fn ancestors(&self, ctx: &RequestContext, id: Uuid) -> Result<Vec<Folder>, AppError> {
        self.access
            .require(ctx.user_id, Permission::FolderRead, &[id])
            .await?;
        self.folders.find_ancestors(id).await
    }

    /// Every folder below the given one, ordered by name.
    pub async fn descendants(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Vec<Folder>, AppError> {
        self.access
            .require(ctx.user_id, Permission::FolderRead, &[id])
            .await?;
        self.folders.find_descendants(id).await
    }

    /// The subtree rooted at a folder.
    pub async fn tree(&self, ctx: &RequestContext, id: Uuid) -> Result<FolderNode, AppError> {
        self.access
            .require(ctx.user_id, Permission::FolderRead, &[id])
            .await?;
        let root = self.find_or_fail(id).await?;
        let descendants = self.folders.find_descendants(id).await?;
        Ok(FolderNode::build(&root, &descendants))
    }

    /// Files albums into a folder, reporting each id.
    pub async fn add_albums(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        req: BulkIdsRequest,
    ) -> Result<Vec<BulkIdResult>, AppError> {
        validated(&req)?;
        let folder = self.find_or_fail(id).await?;
        self.access
            .require(ctx.user_id, Permission::FolderUpdate, &[id])
            .await?;

        let wanted: HashSet<Uuid> = req.ids.iter().copied().collect();
        let permitted = self
            .access
            .check(ctx.user_id, Permission::AlbumRead, &wanted)
            .await?;

        let results = self.albums.add_items(id, &req.ids, &permitted).await?;

        let added = successful_ids(&results);
        if !added.is_empty() {
            self.folders.touch(id).await?;
            info!(user_id = %ctx.user_id, folder_id = %id, added = added.len(), "Albums added to folder");
            self.notify_members(ctx, &folder).await?;
        }

        Ok(results)
    }

    /// Files albums into several folders at once.
    ///
    /// Succeeds when at least one album was added to at least one folder;
    /// otherwise reports `NoPermission` or `Duplicate`.
    pub async fn add_albums_to_folders(
        &self,
        ctx: &RequestContext,
        req: AddAlbumsToFoldersRequest,
    ) -> Result<AddAlbumsToFoldersResponse, AppError> {
        validated(&req)?;
        let nothing = |reason| AddAlbumsToFoldersResponse {
            success: false,
            error: Some(reason),
        };

        let folder_ids = self
            .permitted_in_order(ctx, Permission::FolderUpdate, &req.folder_ids)
            .await?;
        if folder_ids.is_empty() {
            return Ok(nothing(BulkIdOutcome::NoPermission));
        }

        let album_ids = self
            .permitted_in_order(ctx, Permission::AlbumRead, &req.album_ids)
            .await?;
        if album_ids.is_empty() {
            return Ok(nothing(BulkIdOutcome::NoPermission));
        }

        let pairs: Vec<FolderAlbumPair> = folder_ids
            .iter()
            .flat_map(|&folder_id| {
                album_ids
                    .iter()
                    .map(move |&album_id| FolderAlbumPair::new(folder_id, album_id))
            })
            .collect();
        let outcomes = self.albums.bulk_add_across_folders(&pairs).await?;

        let changed: HashSet<Uuid> = outcomes
            .iter()
            .filter(|(_, outcome)| *outcome == BulkIdOutcome::Success)
            .map(|(pair, _)| pair.folder_id)
            .collect();
        if changed.is_empty() {
            return Ok(nothing(BulkIdOutcome::Duplicate));
        }

        for folder_id in folder_ids.iter().filter(|id| changed.contains(id)) {
            self.folders.touch(*folder_id).await?;
            if let Some(folder) = self.folders.find_by_id(*folder_id).await? {
                self.notify_members(ctx, &folder).await?;
            }
        }

        Ok(AddAlbumsToFoldersResponse {
            success: true,
            error: None,
        })
    }

    /// Removes albums from a folder, reporting each id.
    pub async fn remove_albums(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        req: BulkIdsRequest,
    ) -> Result<Vec<BulkIdResult>, AppError> {
        validated(&req)?;
        self.access
            .require(ctx.user_id, Permission::FolderUpdate, &[id])
            .await?;
        self.find_or_fail(id).await?;

        self.albums.remove_items(id, &req.ids).await
    }

    /// Unlinks albums deleted elsewhere from every folder.
    pub async fn forget_albums(&self, album_ids: &[Uuid]) -> Result<u64, AppError> {
        self.albums.remove_from_all(album_ids).await
    }

    /// Shares a folder with more users.
    pub async fn add_users(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        req: AddUsersRequest,
    ) -> Result<FolderDetails, AppError> {
        validated(&req)?;
        self.access
            .require(ctx.user_id, Permission::FolderShare, &[id])
            .await?;
        let folder = self.find_or_fail(id).await?;

        let mut shared: HashSet<Uuid> = self
            .shares
            .list_for_folder(id)
            .await?
            .into_iter()
            .map(|share| share.user_id)
            .collect();
        for user in &req.users {
            if user.user_id == folder.owner_id {
                return Err(AppError::invalid_operation("Cannot be shared with owner"));
            }
            if !shared.insert(user.user_id) {
                return Err(AppError::invalid_operation("User already added"));
            }
            self.require_user(user.user_id).await?;
        }

        let users: Vec<(Uuid, FolderUserRole)> =
            req.users.iter().map(|u| (u.user_id, u.role)).collect();
        let shares = self.maintainer.add_users(id, &users).await?;

        for share in &shares {
            info!(
                folder_id = %id,
                user_id = %share.user_id,
                role = %share.role,
                "Folder shared"
            );
            self.emit(
                ctx,
                FolderEvent::Invited {
                    folder_id: id,
                    user_id: share.user_id,
                },
            )
            .await;
        }

        self.get(ctx, id).await
    }

    /// Removes a user's share. Users may always remove themselves; removing
    /// someone else requires `FolderShare`.
    pub async fn remove_user(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        target: UserTarget,
    ) -> Result<(), AppError> {
        let user_id = target.resolve(ctx.user_id);
        let folder = self.find_or_fail(id).await?;

        if folder.owner_id == user_id {
            return Err(AppError::invalid_operation("Cannot remove folder owner"));
        }
        if self.shares.find(id, user_id).await?.is_none() {
            return Err(AppError::invalid_operation("Folder not shared with user"));
        }
        if ctx.user_id != user_id {
            self.access
                .require(ctx.user_id, Permission::FolderShare, &[id])
                .await?;
        }

        self.shares.delete(id, user_id).await?;
        info!(folder_id = %id, user_id = %user_id, actor_id = %ctx.user_id, "Folder share removed");
        Ok(())
    }

    /// Changes a shared user's role.
    pub async fn update_user(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        user_id: Uuid,
        req: UpdateFolderUserRequest,
    ) -> Result<FolderUser, AppError> {
        self.access
            .require(ctx.user_id, Permission::FolderShare, &[id])
            .await?;

        let share = self.shares.update_role(id, user_id, req.role).await?;
        info!(folder_id = %id, user_id = %user_id, role = %req.role, "Folder share updated");
        Ok(share)
    }

    async fn find_or_fail(&self, id: Uuid) -> Result<Folder, AppError> {
        self.folders
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Folder not found"))
    }

    async fn require_user(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users
            .find(user_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))
    }

    /// The permitted subset of `ids`, deduplicated, in request order.
    async fn permitted_in_order(
        &self,
        ctx: &RequestContext,
        permission: Permission,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, AppError> {
        let wanted: HashSet<Uuid> = ids.iter().copied().collect();
        let mut allowed = self.access.check(ctx.user_id, permission, &wanted).await?;
        Ok(ids.iter().copied().filter(|id| allowed.remove(id)).collect())
    }

    async fn summarize(&self, folders: Vec<Folder>) -> Result<Vec<FolderSummary>, AppError> {
        let ids: Vec<Uuid> = folders.iter().map(|f| f.id).collect();
        let album_counts = self.albums.member_counts(&ids).await?;
        let subfolder_counts = self.folders.child_counts(&ids).await?;
        let count = |counts: &HashMap<Uuid, u64>, id: Uuid| counts.get(&id).copied().unwrap_or(0);

        Ok(folders
            .into_iter()
            .map(|folder| FolderSummary {
                album_count: count(&album_counts, folder.id),
                subfolder_count: count(&subfolder_counts, folder.id),
                folder,
            })
            .collect())
    }

    /// Tell the owner and every shared user, except the actor, that the
    /// folder changed.
    async fn notify_members(&self, ctx: &RequestContext, folder: &Folder) -> Result<(), AppError> {
        let mut recipients: Vec<Uuid> = self
            .shares
            .list_for_folder(folder.id)
            .await?
            .into_iter()
            .map(|share| share.user_id)
            .collect();
        recipients.push(folder.owner_id);

        for recipient_id in recipients.into_iter().filter(|id| *id != ctx.user_id) {
            self.emit(
                ctx,
                FolderEvent::Updated {
                    folder_id: folder.id,
                    recipient_id,
                },
            )
            .await;
        }
        Ok(())
    }

    async fn emit(&self, ctx: &RequestContext, event: FolderEvent) {
        let folder_id = event.folder_id();
        if let Err(e) = self
            .notifier
            .emit(DomainEvent::folder(ctx.user_id, event))
            .await
        {
            warn!(folder_id = %folder_id, error = %e, "Failed to deliver folder event");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use folderhub_core::config::StoreConfig;
    use folderhub_core::error::ErrorKind;
    use folderhub_core::events::EventPayload;
    use folderhub_core::result::AppResult;
    use folderhub_core::traits::UserInfo;
    use folderhub_database::MemoryStore;

    use super::*;
    use crate::access::OwnershipAccessChecker;
    use crate::folder::dto::FolderUserInput;

    #[derive(Debug, Default)]
    struct Directory {
        users: HashSet<Uuid>,
    }

    #[async_trait]
    impl UserDirectory for Directory {
        async fn find(&self, user_id: Uuid) -> AppResult<Option<UserInfo>> {
            Ok(self.users.contains(&user_id).then(|| UserInfo {
                id: user_id,
                name: "someone".to_string(),
                email: "someone@example.com".to_string(),
            }))
        }
    }

    #[derive(Debug, Default)]
    struct Recorder {
        events: Mutex<Vec<FolderEvent>>,
        fail: bool,
    }

    impl Recorder {
        fn events(&self) -> Vec<FolderEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventNotifier for Recorder {
        async fn emit(&self, event: DomainEvent) -> AppResult<()> {
            if self.fail {
                return Err(AppError::external_service("notifier offline"));
            }
            let EventPayload::Folder(event) = event.payload;
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    /// Ownership rules, except for the listed albums and assets.
    #[derive(Debug)]
    struct Restricted {
        inner: OwnershipAccessChecker,
        denied: HashSet<Uuid>,
    }

    #[async_trait]
    impl AccessChecker for Restricted {
        async fn check(
            &self,
            actor_id: Uuid,
            permission: Permission,
            ids: &HashSet<Uuid>,
        ) -> AppResult<HashSet<Uuid>> {
            let allowed = self.inner.check(actor_id, permission, ids).await?;
            Ok(allowed.difference(&self.denied).copied().collect())
        }
    }

    struct Harness {
        service: FolderService,
        notifier: Arc<Recorder>,
        owner: RequestContext,
        alice: RequestContext,
        bob: RequestContext,
        denied: Uuid,
    }

    fn harness_with(fail_notifications: bool) -> Harness {
        let store = MemoryStore::new();
        let config = StoreConfig::default();
        let owner = RequestContext::new(Uuid::new_v4());
        let alice = RequestContext::new(Uuid::new_v4());
        let bob = RequestContext::new(Uuid::new_v4());
        let denied = Uuid::new_v4();

        let directory = Directory {
            users: [owner.user_id, alice.user_id, bob.user_id].into_iter().collect(),
        };
        let notifier = Arc::new(Recorder {
            fail: fail_notifications,
            ..Default::default()
        });
        let access = Restricted {
            inner: OwnershipAccessChecker::new(Arc::new(store.clone()), Arc::new(store.clone())),
            denied: [denied].into_iter().collect(),
        };

        let service = FolderService::new(
            Arc::new(store.clone()),
            ClosureMaintainer::new(Arc::new(store.clone()), &config),
            AlbumMembership::new(Arc::new(store.clone()), &config),
            Arc::new(store),
            Arc::new(access),
            Arc::new(directory),
            notifier.clone(),
        );

        Harness {
            service,
            notifier,
            owner,
            alice,
            bob,
            denied,
        }
    }

    fn harness() -> Harness {
        harness_with(false)
    }

    fn named(name: &str, parent_id: Option<Uuid>) -> CreateFolderRequest {
        CreateFolderRequest {
            name: Some(name.to_string()),
            parent_id,
            ..Default::default()
        }
    }

    fn share(user: &RequestContext, role: FolderUserRole) -> FolderUserInput {
        FolderUserInput {
            user_id: user.user_id,
            role,
        }
    }

    #[tokio::test]
    async fn test_create_nested_and_breadcrumb() {
        let h = harness();
        let s = &h.service;
        let root = s.create(&h.owner, named("2024", None)).await.unwrap();
        let trip = s.create(&h.owner, named("Japan", Some(root.id))).await.unwrap();
        let day = s.create(&h.owner, named("Day 1", Some(trip.id))).await.unwrap();

        let crumbs: Vec<Uuid> = s
            .ancestors(&h.owner, day.id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(crumbs, vec![root.id, trip.id]);

        let tree = s.tree(&h.owner, root.id).await.unwrap();
        assert_eq!(tree.size(), 3);
        assert_eq!(tree.children[0].children[0].id, day.id);

        let stats = s.statistics(&h.owner).await.unwrap();
        assert_eq!(stats.owned, 3);
        assert_eq!(stats.not_shared, 3);
    }

    #[tokio::test]
    async fn test_create_defaults_blank_name() {
        let h = harness();
        let folder = h
            .service
            .create(&h.owner, named("   ", None))
            .await
            .unwrap();
        assert_eq!(folder.name, DEFAULT_FOLDER_NAME);
    }

    #[tokio::test]
    async fn test_create_validates_users_and_parent() {
        let h = harness();
        let s = &h.service;

        let mut req = named("x", None);
        req.users = vec![share(&h.owner, FolderUserRole::Editor)];
        let err = s.create(&h.owner, req).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);

        let mut req = named("x", None);
        req.users = vec![FolderUserInput {
            user_id: Uuid::new_v4(),
            role: FolderUserRole::Viewer,
        }];
        let err = s.create(&h.owner, req).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        // Someone else's folder is not a readable parent.
        let foreign = s.create(&h.bob, named("bob's", None)).await.unwrap();
        let err = s
            .create(&h.owner, named("x", Some(foreign.id)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        assert_eq!(s.statistics(&h.owner).await.unwrap().owned, 0);
    }

    #[tokio::test]
    async fn test_create_shares_and_skips_unreadable_albums() {
        let h = harness();
        let s = &h.service;
        let album = Uuid::new_v4();

        let mut req = named("party", None);
        req.album_ids = vec![album, h.denied];
        req.users = vec![share(&h.alice, FolderUserRole::Viewer)];
        let folder = s.create(&h.owner, req).await.unwrap();

        let details = s.get(&h.alice, folder.id).await.unwrap();
        let albums: Vec<Uuid> = details.albums.iter().map(|a| a.album_id).collect();
        assert_eq!(albums, vec![album]);
        assert_eq!(details.shares.len(), 1);

        assert_eq!(
            h.notifier.events(),
            vec![FolderEvent::Invited {
                folder_id: folder.id,
                user_id: h.alice.user_id,
            }]
        );

        let listed = s
            .list(
                &h.alice,
                &ListFoldersQuery {
                    shared: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].album_count, 1);
    }

    #[tokio::test]
    async fn test_update_moves_and_renames() {
        let h = harness();
        let s = &h.service;
        let a = s.create(&h.owner, named("a", None)).await.unwrap();
        let b = s.create(&h.owner, named("b", None)).await.unwrap();
        let child = s.create(&h.owner, named("child", Some(a.id))).await.unwrap();

        let updated = s
            .update(
                &h.owner,
                child.id,
                UpdateFolderRequest {
                    name: Some("moved".to_string()),
                    parent_id: Some(Some(b.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.parent_id, Some(b.id));
        assert_eq!(updated.name, "moved");

        let under_b = s.subfolders(&h.owner, b.id).await.unwrap();
        assert_eq!(under_b[0].folder.id, child.id);
        assert!(s.subfolders(&h.owner, a.id).await.unwrap().is_empty());

        let to_root = s
            .update(
                &h.owner,
                child.id,
                UpdateFolderRequest {
                    parent_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(to_root.is_root());
    }

    #[tokio::test]
    async fn test_update_move_with_conflicting_rename_keeps_parent() {
        let h = harness();
        let s = &h.service;
        let a = s.create(&h.owner, named("a", None)).await.unwrap();
        let b = s.create(&h.owner, named("b", None)).await.unwrap();
        s.create(&h.owner, named("taken", Some(b.id))).await.unwrap();
        let child = s.create(&h.owner, named("child", Some(a.id))).await.unwrap();

        let err = s
            .update(
                &h.owner,
                child.id,
                UpdateFolderRequest {
                    name: Some("taken".to_string()),
                    parent_id: Some(Some(b.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let details = s.get(&h.owner, child.id).await.unwrap();
        assert_eq!(details.folder.parent_id, Some(a.id));
        assert_eq!(details.folder.name, "child");
        assert_eq!(s.ancestors(&h.owner, child.id).await.unwrap()[0].id, a.id);
    }

    #[tokio::test]
    async fn test_update_trims_and_rejects_blank_names() {
        let h = harness();
        let s = &h.service;
        let folder = s.create(&h.owner, named("a", None)).await.unwrap();

        let err = s
            .update(
                &h.owner,
                folder.id,
                UpdateFolderRequest {
                    name: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let renamed = s
            .update(
                &h.owner,
                folder.id,
                UpdateFolderRequest {
                    name: Some(" Trips ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Trips");
    }

    #[tokio::test]
    async fn test_update_rejects_cycles_and_bad_thumbnails() {
        let h = harness();
        let s = &h.service;
        let a = s.create(&h.owner, named("a", None)).await.unwrap();
        let b = s.create(&h.owner, named("b", Some(a.id))).await.unwrap();

        let err = s
            .update(
                &h.owner,
                a.id,
                UpdateFolderRequest {
                    parent_id: Some(Some(b.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);

        let err = s
            .update(
                &h.owner,
                a.id,
                UpdateFolderRequest {
                    thumbnail_asset_id: Some(h.denied),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = s
            .update(&h.bob, a.id, UpdateFolderRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_add_albums_notifies_everyone_but_actor() {
        let h = harness();
        let s = &h.service;
        let mut req = named("shared", None);
        req.users = vec![
            share(&h.alice, FolderUserRole::Editor),
            share(&h.bob, FolderUserRole::Viewer),
        ];
        let folder = s.create(&h.owner, req).await.unwrap();
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());

        let first = s
            .add_albums(&h.alice, folder.id, BulkIdsRequest { ids: vec![x, h.denied] })
            .await
            .unwrap();
        assert_eq!(first[0].outcome, BulkIdOutcome::Success);
        assert_eq!(first[1].outcome, BulkIdOutcome::NoPermission);

        let updated: Vec<Uuid> = h
            .notifier
            .events()
            .into_iter()
            .filter(|e| matches!(e, FolderEvent::Updated { .. }))
            .map(|e| e.recipient_id())
            .collect();
        assert_eq!(updated.len(), 2);
        assert!(updated.contains(&h.owner.user_id));
        assert!(updated.contains(&h.bob.user_id));

        let second = s
            .add_albums(&h.alice, folder.id, BulkIdsRequest { ids: vec![x, y] })
            .await
            .unwrap();
        assert_eq!(second[0].outcome, BulkIdOutcome::Duplicate);
        assert_eq!(second[1].outcome, BulkIdOutcome::Success);

        // Viewers cannot file albums.
        let err = s
            .add_albums(&h.bob, folder.id, BulkIdsRequest { ids: vec![y] })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let removed = s
            .remove_albums(&h.owner, folder.id, BulkIdsRequest { ids: vec![x, h.denied] })
            .await
            .unwrap();
        assert_eq!(removed[0].outcome, BulkIdOutcome::Success);
        assert_eq!(removed[1].outcome, BulkIdOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_add_albums_to_folders_aggregates() {
        let h = harness();
        let s = &h.service;
        let a = s.create(&h.owner, named("a", None)).await.unwrap();
        let b = s.create(&h.owner, named("b", None)).await.unwrap();
        let album = Uuid::new_v4();

        let req = AddAlbumsToFoldersRequest {
            folder_ids: vec![a.id, b.id],
            album_ids: vec![album],
        };
        let first = s.add_albums_to_folders(&h.owner, req.clone()).await.unwrap();
        assert!(first.success);

        let again = s.add_albums_to_folders(&h.owner, req.clone()).await.unwrap();
        assert_eq!(again.error, Some(BulkIdOutcome::Duplicate));

        let foreign = s.add_albums_to_folders(&h.bob, req).await.unwrap();
        assert_eq!(foreign.error, Some(BulkIdOutcome::NoPermission));

        let by_album = s
            .list(
                &h.owner,
                &ListFoldersQuery {
                    album_id: Some(album),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_album.len(), 2);

        assert_eq!(s.forget_albums(&[album]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failing_notifier_never_fails_mutation() {
        let h = harness_with(true);
        let s = &h.service;
        let folder = s.create(&h.owner, named("f", None)).await.unwrap();

        let details = s
            .add_users(
                &h.owner,
                folder.id,
                AddUsersRequest {
                    users: vec![share(&h.alice, FolderUserRole::Viewer)],
                },
            )
            .await
            .unwrap();
        assert_eq!(details.shares[0].user_id, h.alice.user_id);
        assert!(h.notifier.events().is_empty());
    }

    #[tokio::test]
    async fn test_add_users_rejects_owner_and_duplicates() {
        let h = harness();
        let s = &h.service;
        let mut req = named("f", None);
        req.users = vec![share(&h.alice, FolderUserRole::Viewer)];
        let folder = s.create(&h.owner, req).await.unwrap();

        for user in [&h.owner, &h.alice] {
            let err = s
                .add_users(
                    &h.owner,
                    folder.id,
                    AddUsersRequest {
                        users: vec![share(user, FolderUserRole::Editor)],
                    },
                )
                .await
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidOperation);
        }

        let err = s
            .add_users(
                &h.alice,
                folder.id,
                AddUsersRequest {
                    users: vec![share(&h.bob, FolderUserRole::Viewer)],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
    }

    #[tokio::test]
    async fn test_remove_and_update_users() {
        let h = harness();
        let s = &h.service;
        let mut req = named("f", None);
        req.users = vec![
            share(&h.alice, FolderUserRole::Viewer),
            share(&h.bob, FolderUserRole::Viewer),
        ];
        let folder = s.create(&h.owner, req).await.unwrap();

        let err = s
            .remove_user(&h.alice, folder.id, UserTarget::User(h.owner.user_id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);

        let err = s
            .remove_user(&h.alice, folder.id, UserTarget::User(h.bob.user_id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        s.remove_user(&h.alice, folder.id, UserTarget::Me).await.unwrap();
        let err = s
            .remove_user(&h.owner, folder.id, UserTarget::User(h.alice.user_id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidOperation);

        let promoted = s
            .update_user(
                &h.owner,
                folder.id,
                h.bob.user_id,
                UpdateFolderUserRequest {
                    role: FolderUserRole::Editor,
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, FolderUserRole::Editor);
        s.update(&h.bob, folder.id, UpdateFolderRequest::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_removes_subtree() {
        let h = harness();
        let s = &h.service;
        let root = s.create(&h.owner, named("root", None)).await.unwrap();
        let child = s.create(&h.owner, named("child", Some(root.id))).await.unwrap();

        let err = s.delete(&h.bob, root.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        s.delete(&h.owner, root.id).await.unwrap();
        let err = s.get(&h.owner, child.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);
        assert_eq!(s.statistics(&h.owner).await.unwrap().owned, 0);
    }

    #[tokio::test]
    async fn test_list_counts_subfolders_by_level() {
        let h = harness();
        let s = &h.service;
        let root = s.create(&h.owner, named("root", None)).await.unwrap();
        s.create(&h.owner, named("c1", Some(root.id))).await.unwrap();
        s.create(&h.owner, named("c2", Some(root.id))).await.unwrap();

        let roots = s
            .list(
                &h.owner,
                &ListFoldersQuery {
                    parent_id: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].subfolder_count, 2);
        assert_eq!(roots[0].album_count, 0);

        let children = s
            .list(
                &h.owner,
                &ListFoldersQuery {
                    parent_id: Some(Some(root.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(children.len(), 2);

        let descendants = s.descendants(&h.owner, root.id).await.unwrap();
        let names: Vec<&str> = descendants.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["c1", "c2"]);
    }
}
