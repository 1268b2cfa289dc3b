//! Permission-gated hand-off of finished captures to the media library

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::capture::Artifact;
use crate::config::Settings;
use crate::library::models::Asset;
use crate::library::store::{FsTempStore, LibraryStore};
use crate::library::{AccessLevel, MediaStore, PermissionStatus, TempStore};

/// A capture that made it into the library
#[derive(Debug, Clone, Serialize)]
pub struct SavedAsset {
    /// Library record
    pub asset: Asset,

    /// Permission the save went through with
    pub permission: PermissionStatus,

    /// Whether the temporary capture file was removed
    pub temp_removed: bool,
}

/// Why a capture did not reach the library. The capture file is left in place.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Media library access {status} for {level}; capture kept at {}", .location.display())]
    AccessDenied {
        status: PermissionStatus,
        level: AccessLevel,
        location: PathBuf,
    },

    #[error("Failed to save {} to the media library: {source:#}", .location.display())]
    PersistFailure {
        location: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl PersistError {
    /// Where the unsaved capture still lives
    pub fn location(&self) -> &Path {
        match self {
            Self::AccessDenied { location, .. } => location,
            Self::PersistFailure { location, .. } => location,
        }
    }

    fn failure(artifact: &Artifact, source: anyhow::Error) -> Self {
        Self::PersistFailure {
            location: artifact.location.clone(),
            source,
        }
    }
}

/// Saves captures into a media store after checking permission
pub struct MediaPersistence {
    store: Arc<dyn MediaStore>,
    temp: Arc<dyn TempStore>,
    access_level: AccessLevel,
}

impl MediaPersistence {
    pub fn new(
        store: Arc<dyn MediaStore>,
        temp: Arc<dyn TempStore>,
        access_level: AccessLevel,
    ) -> Self {
        Self {
            store,
            temp,
            access_level,
        }
    }

    /// Persistence backed by the configured on-disk library
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(LibraryStore::new(settings)),
            Arc::new(FsTempStore),
            settings.library.access_level,
        )
    }

    /// Save the artifact and remove its temporary file on success.
    ///
    /// A failed cleanup is logged and reported on the returned [`SavedAsset`];
    /// the save itself still counts as successful.
    pub async fn save(&self, artifact: Artifact) -> Result<SavedAsset, PersistError> {
        let permission = self.resolve_permission(&artifact).await?;

        let asset = match self.store.save(&artifact).await {
            Ok(asset) => asset,
            Err(e) => {
                error!(
                    "Could not save {} to the media library: {:#}",
                    artifact.location.display(),
                    e
                );
                return Err(PersistError::failure(&artifact, e));
            }
        };

        info!(
            "{} has been saved to the media library ({})",
            artifact.kind.as_str(),
            asset.id
        );

        let temp_removed = match self.temp.delete(&artifact.location).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Could not remove temporary capture file {}: {}",
                    artifact.location.display(),
                    e
                );
                false
            }
        };

        Ok(SavedAsset {
            asset,
            permission,
            temp_removed,
        })
    }

    /// Check permission, asking at most once if it is undetermined
    async fn resolve_permission(&self, artifact: &Artifact) -> Result<PermissionStatus, PersistError> {
        let level = self.access_level;
        let mut status = self
            .store
            .authorization_status(level)
            .await
            .map_err(|e| PersistError::failure(artifact, e))?;
        let mut requested = false;

        loop {
            match status {
                granted if granted.allows_save() => return Ok(granted),
                PermissionStatus::NotDetermined if !requested => {
                    requested = true;
                    info!("Requesting {} access to the media library", level);
                    status = self
                        .store
                        .request_authorization(level)
                        .await
                        .map_err(|e| PersistError::failure(artifact, e))?;
                }
                _ => {
                    warn!("Media library access {} for {}", status, level);
                    return Err(PersistError::AccessDenied {
                        status,
                        level,
                        location: artifact.location.clone(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ArtifactKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeStore {
        status: Mutex<PermissionStatus>,
        resolves_to: PermissionStatus,
        fail_status: bool,
        fail_save: bool,
        requests: AtomicUsize,
        saves: AtomicUsize,
    }

    impl FakeStore {
        fn new(status: PermissionStatus, resolves_to: PermissionStatus) -> Self {
            Self {
                status: Mutex::new(status),
                resolves_to,
                fail_status: false,
                fail_save: false,
                requests: AtomicUsize::new(0),
                saves: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MediaStore for FakeStore {
        async fn authorization_status(&self, _level: AccessLevel) -> anyhow::Result<PermissionStatus> {
            if self.fail_status {
                anyhow::bail!("library database is locked");
            }
            Ok(*self.status.lock().unwrap())
        }

        async fn request_authorization(&self, _level: AccessLevel) -> anyhow::Result<PermissionStatus> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            *self.status.lock().unwrap() = self.resolves_to;
            Ok(self.resolves_to)
        }

        async fn save(&self, artifact: &Artifact) -> anyhow::Result<Asset> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_save {
                anyhow::bail!("disk full");
            }
            Ok(Asset::new(
                artifact.kind,
                artifact.location.display().to_string(),
                "saved.mov".to_string(),
                1024,
            ))
        }
    }

    #[derive(Default)]
    struct FakeTemp {
        deletes: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TempStore for FakeTemp {
        async fn delete(&self, _path: &Path) -> std::io::Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only temp dir",
                ));
            }
            Ok(())
        }
    }

    fn video() -> Artifact {
        Artifact::new(PathBuf::from("/tmp/scenecast/take.mov"), ArtifactKind::Video)
    }

    fn persistence(store: &Arc<FakeStore>, temp: &Arc<FakeTemp>) -> MediaPersistence {
        MediaPersistence::new(store.clone(), temp.clone(), AccessLevel::AddOnly)
    }

    #[tokio::test]
    async fn undetermined_then_authorized_saves_after_one_request() {
        let store = Arc::new(FakeStore::new(
            PermissionStatus::NotDetermined,
            PermissionStatus::Authorized,
        ));
        let temp = Arc::new(FakeTemp::default());

        let saved = tokio_test::assert_ok!(persistence(&store, &temp).save(video()).await);

        assert_eq!(saved.permission, PermissionStatus::Authorized);
        assert!(saved.temp_removed);
        assert_eq!(store.requests.load(Ordering::SeqCst), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
        assert_eq!(temp.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn undetermined_after_request_is_denied_without_asking_again() {
        let store = Arc::new(FakeStore::new(
            PermissionStatus::NotDetermined,
            PermissionStatus::NotDetermined,
        ));
        let temp = Arc::new(FakeTemp::default());

        let err = tokio_test::assert_err!(persistence(&store, &temp).save(video()).await);

        assert!(matches!(
            err,
            PersistError::AccessDenied {
                status: PermissionStatus::NotDetermined,
                ..
            }
        ));
        assert_eq!(store.requests.load(Ordering::SeqCst), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn denied_never_reaches_the_store() {
        for status in [PermissionStatus::Denied, PermissionStatus::Restricted] {
            let store = Arc::new(FakeStore::new(status, PermissionStatus::Authorized));
            let temp = Arc::new(FakeTemp::default());

            let err = persistence(&store, &temp).save(video()).await.unwrap_err();

            assert!(matches!(err, PersistError::AccessDenied { .. }));
            assert_eq!(err.location(), Path::new("/tmp/scenecast/take.mov"));
            assert_eq!(store.requests.load(Ordering::SeqCst), 0);
            assert_eq!(store.saves.load(Ordering::SeqCst), 0);
            assert_eq!(temp.deletes.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn limited_access_still_saves() {
        let store = Arc::new(FakeStore::new(
            PermissionStatus::Limited,
            PermissionStatus::Authorized,
        ));
        let temp = Arc::new(FakeTemp::default());

        let saved = persistence(&store, &temp).save(video()).await.unwrap();

        assert_eq!(saved.permission, PermissionStatus::Limited);
        assert_eq!(store.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_save_keeps_the_capture() {
        let mut store = FakeStore::new(PermissionStatus::Authorized, PermissionStatus::Authorized);
        store.fail_save = true;
        let store = Arc::new(store);
        let temp = Arc::new(FakeTemp::default());

        let err = persistence(&store, &temp).save(video()).await.unwrap_err();

        assert!(matches!(err, PersistError::PersistFailure { .. }));
        assert!(err.to_string().contains("disk full"));
        assert_eq!(temp.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cleanup_failure_does_not_fail_the_save() {
        let store = Arc::new(FakeStore::new(
            PermissionStatus::Authorized,
            PermissionStatus::Authorized,
        ));
        let temp = Arc::new(FakeTemp {
            fail: true,
            ..Default::default()
        });

        let saved = persistence(&store, &temp).save(video()).await.unwrap();

        assert!(!saved.temp_removed);
        assert_eq!(temp.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn permission_lookup_error_is_a_persist_failure() {
        let mut store = FakeStore::new(PermissionStatus::Authorized, PermissionStatus::Authorized);
        store.fail_status = true;
        let store = Arc::new(store);
        let temp = Arc::new(FakeTemp::default());

        let err = persistence(&store, &temp).save(video()).await.unwrap_err();

        assert!(matches!(err, PersistError::PersistFailure { .. }));
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }
}
