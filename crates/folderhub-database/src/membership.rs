//! Flat folder ↔ album membership with per-id outcomes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use folderhub_core::config::StoreConfig;
use folderhub_core::result::AppResult;
use folderhub_entity::bulk::{BulkIdOutcome, BulkIdResult};
use folderhub_entity::membership::{FolderAlbum, FolderAlbumPair};

use crate::store::AlbumMembershipStore;

/// Membership operations over an [`AlbumMembershipStore`].
///
/// Permission decisions are made by the caller; this type only reports
/// which ids the caller said it may not touch.
#[derive(Debug, Clone)]
pub struct AlbumMembership {
    store: Arc<dyn AlbumMembershipStore>,
    batch_size: usize,
}

impl AlbumMembership {
    /// Create a membership component over a store.
    pub fn new(store: Arc<dyn AlbumMembershipStore>, config: &StoreConfig) -> Self {
        Self {
            store,
            batch_size: config.effective_batch_size(),
        }
    }

    /// Add albums to a folder.
    ///
    /// Each id is reported in request order: `NoPermission` when absent
    /// from `permitted`, else `Duplicate` when already linked or repeated in
    /// the request, else `Success`.
    pub async fn add_items(
        &self,
        folder_id: Uuid,
        album_ids: &[Uuid],
        permitted: &HashSet<Uuid>,
    ) -> AppResult<Vec<BulkIdResult>> {
        let existing = self.store.member_ids(folder_id, album_ids).await?;

        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(album_ids.len());
        let mut to_insert = Vec::new();

        for &album_id in album_ids {
            let outcome = if !permitted.contains(&album_id) {
                BulkIdOutcome::NoPermission
            } else if existing.contains(&album_id) || !seen.insert(album_id) {
                BulkIdOutcome::Duplicate
            } else {
                to_insert.push(FolderAlbumPair::new(folder_id, album_id));
                BulkIdOutcome::Success
            };
            results.push(BulkIdResult::new(album_id, outcome));
        }

        let inserted = self.insert_chunked(&to_insert).await?;
        info!(
            folder_id = %folder_id,
            requested = album_ids.len(),
            inserted,
            "Albums added to folder"
        );

        Ok(results)
    }

    /// Remove albums from a folder. Ids that were not linked report `NotFound`.
    pub async fn remove_items(
        &self,
        folder_id: Uuid,
        album_ids: &[Uuid],
    ) -> AppResult<Vec<BulkIdResult>> {
        let existing = self.store.member_ids(folder_id, album_ids).await?;

        let mut removed = HashSet::new();
        let results = album_ids
            .iter()
            .map(|&album_id| {
                let outcome = if existing.contains(&album_id) && removed.insert(album_id) {
                    BulkIdOutcome::Success
                } else {
                    BulkIdOutcome::NotFound
                };
                BulkIdResult::new(album_id, outcome)
            })
            .collect();

        let to_remove: Vec<Uuid> = removed.into_iter().collect();
        let deleted = self.store.delete_members(folder_id, &to_remove).await?;
        info!(
            folder_id = %folder_id,
            requested = album_ids.len(),
            deleted,
            "Albums removed from folder"
        );

        Ok(results)
    }

    /// The subset of `candidates` currently in the folder.
    pub async fn member_ids(&self, folder_id: Uuid, candidates: &[Uuid]) -> AppResult<HashSet<Uuid>> {
        self.store.member_ids(folder_id, candidates).await
    }

    /// Add many `(folder, album)` pairs in one conflict-safe pass.
    ///
    /// Pairs already linked (or repeated in the request) report `Duplicate`.
    pub async fn bulk_add_across_folders(
        &self,
        pairs: &[FolderAlbumPair],
    ) -> AppResult<Vec<(FolderAlbumPair, BulkIdOutcome)>> {
        let mut candidates: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for pair in pairs {
            candidates.entry(pair.folder_id).or_default().push(pair.album_id);
        }

        let mut existing: HashSet<FolderAlbumPair> = HashSet::new();
        for (folder_id, album_ids) in &candidates {
            for album_id in self.store.member_ids(*folder_id, album_ids).await? {
                existing.insert(FolderAlbumPair::new(*folder_id, album_id));
            }
        }

        let mut seen = HashSet::new();
        let mut to_insert = Vec::new();
        let results: Vec<_> = pairs
            .iter()
            .map(|&pair| {
                if existing.contains(&pair) || !seen.insert(pair) {
                    (pair, BulkIdOutcome::Duplicate)
                } else {
                    to_insert.push(pair);
                    (pair, BulkIdOutcome::Success)
                }
            })
            .collect();

        let inserted = self.insert_chunked(&to_insert).await?;
        info!(
            folders = candidates.len(),
            requested = pairs.len(),
            inserted,
            "Albums added across folders"
        );

        Ok(results)
    }

    /// Unlink albums from every folder, e.g. after the albums were deleted.
    pub async fn remove_from_all(&self, album_ids: &[Uuid]) -> AppResult<u64> {
        let deleted = self.store.delete_from_all(album_ids).await?;
        debug!(albums = album_ids.len(), deleted, "Albums unlinked from all folders");
        Ok(deleted)
    }

    /// Number of albums per folder, zero for folders without albums.
    pub async fn member_counts(&self, folder_ids: &[Uuid]) -> AppResult<HashMap<Uuid, u64>> {
        self.store.member_counts(folder_ids).await
    }

    /// Every album link of a folder, newest first.
    pub async fn list(&self, folder_id: Uuid) -> AppResult<Vec<FolderAlbum>> {
        self.store.list_members(folder_id).await
    }

    async fn insert_chunked(&self, pairs: &[FolderAlbumPair]) -> AppResult<u64> {
        let mut inserted = 0;
        for chunk in pairs.chunks(self.batch_size) {
            inserted += self.store.insert_pairs(chunk).await?;
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use folderhub_entity::folder::CreateFolder;

    use super::*;
    use crate::closure::ClosureMaintainer;
    use crate::memory::MemoryStore;

    async fn setup(batch_size: usize) -> (AlbumMembership, Uuid, Uuid) {
        let store = MemoryStore::new();
        let config = StoreConfig { batch_size };
        let maintainer = ClosureMaintainer::new(Arc::new(store.clone()), &config);
        let owner = Uuid::new_v4();
        let a = maintainer
            .create_folder(&CreateFolder::root(owner, "a"))
            .await
            .unwrap()
            .id;
        let b = maintainer
            .create_folder(&CreateFolder::root(owner, "b"))
            .await
            .unwrap()
            .id;
        (AlbumMembership::new(Arc::new(store), &config), a, b)
    }

    fn outcomes(results: &[BulkIdResult]) -> Vec<BulkIdOutcome> {
        results.iter().map(|r| r.outcome).collect()
    }

    #[tokio::test]
    async fn test_second_add_reports_duplicate() {
        let (membership, folder, _) = setup(30_000).await;
        let (x, y, z) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let permitted: HashSet<Uuid> = [x, y, z].into_iter().collect();

        let first = membership.add_items(folder, &[x, y], &permitted).await.unwrap();
        assert_eq!(outcomes(&first), vec![BulkIdOutcome::Success; 2]);

        let second = membership.add_items(folder, &[x, z], &permitted).await.unwrap();
        assert_eq!(second[0], BulkIdResult::new(x, BulkIdOutcome::Duplicate));
        assert_eq!(second[1], BulkIdResult::new(z, BulkIdOutcome::Success));

        let members = membership.member_ids(folder, &[x, y, z]).await.unwrap();
        assert_eq!(members, permitted);
    }

    #[tokio::test]
    async fn test_add_reports_permission_and_in_request_repeats() {
        let (membership, folder, _) = setup(1).await;
        let (x, forbidden) = (Uuid::new_v4(), Uuid::new_v4());
        let permitted: HashSet<Uuid> = [x].into_iter().collect();

        let results = membership
            .add_items(folder, &[x, forbidden, x], &permitted)
            .await
            .unwrap();
        assert_eq!(
            outcomes(&results),
            vec![
                BulkIdOutcome::Success,
                BulkIdOutcome::NoPermission,
                BulkIdOutcome::Duplicate
            ]
        );
        assert_eq!(membership.member_counts(&[folder]).await.unwrap()[&folder], 1);
    }

    #[tokio::test]
    async fn test_remove_reports_not_found_for_non_members() {
        let (membership, folder, _) = setup(30_000).await;
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let permitted: HashSet<Uuid> = [x].into_iter().collect();
        membership.add_items(folder, &[x], &permitted).await.unwrap();

        let results = membership.remove_items(folder, &[x, y]).await.unwrap();
        assert_eq!(
            outcomes(&results),
            vec![BulkIdOutcome::Success, BulkIdOutcome::NotFound]
        );
        assert!(membership.list(folder).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_add_across_folders() {
        let (membership, a, b) = setup(2).await;
        let x = Uuid::new_v4();
        let permitted: HashSet<Uuid> = [x].into_iter().collect();
        membership.add_items(a, &[x], &permitted).await.unwrap();

        let pairs = [
            FolderAlbumPair::new(a, x),
            FolderAlbumPair::new(b, x),
            FolderAlbumPair::new(b, x),
        ];
        let results = membership.bulk_add_across_folders(&pairs).await.unwrap();
        let outcomes: Vec<_> = results.iter().map(|(_, o)| *o).collect();
        assert_eq!(
            outcomes,
            vec![
                BulkIdOutcome::Duplicate,
                BulkIdOutcome::Success,
                BulkIdOutcome::Duplicate
            ]
        );

        let counts = membership.member_counts(&[a, b]).await.unwrap();
        assert_eq!(counts[&a], 1);
        assert_eq!(counts[&b], 1);

        assert_eq!(membership.remove_from_all(&[x]).await.unwrap(), 2);
        assert_eq!(membership.member_counts(&[a, b]).await.unwrap()[&b], 0);
    }
}
