//! On-disk media library: a directory of stored captures indexed in SQLite

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::capture::Artifact;
use crate::config::Settings;
use crate::library::database::LibraryDatabase;
use crate::library::models::Asset;
use crate::library::{AccessLevel, AuthorizationPolicy, MediaStore, PermissionStatus, TempStore};

/// Media store backed by the scenecast library directory
#[derive(Debug, Clone)]
pub struct LibraryStore {
    db_path: PathBuf,
    library_dir: PathBuf,
    policy: AuthorizationPolicy,
}

impl LibraryStore {
    pub fn new(settings: &Settings) -> Self {
        Self::with_paths(
            settings.database_path(),
            settings.library_dir(),
            settings.library.on_request,
        )
    }

    pub fn with_paths(db_path: PathBuf, library_dir: PathBuf, policy: AuthorizationPolicy) -> Self {
        Self {
            db_path,
            library_dir,
            policy,
        }
    }

    /// Where stored captures live
    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    /// Run a database operation on the blocking pool
    async fn with_db<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&LibraryDatabase) -> crate::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.db_path.clone();
        let value = tokio::task::spawn_blocking(move || -> crate::Result<T> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let db = LibraryDatabase::open_path(&path)?;
            op(&db)
        })
        .await
        .context("Library database task panicked")??;
        Ok(value)
    }
}

#[async_trait]
impl MediaStore for LibraryStore {
    async fn authorization_status(&self, level: AccessLevel) -> Result<PermissionStatus> {
        self.with_db(move |db| db.effective_permission(level)).await
    }

    async fn request_authorization(&self, level: AccessLevel) -> Result<PermissionStatus> {
        let status = match self.policy {
            AuthorizationPolicy::Grant => PermissionStatus::Authorized,
            AuthorizationPolicy::Limit => PermissionStatus::Limited,
            AuthorizationPolicy::Deny => PermissionStatus::Denied,
            AuthorizationPolicy::Prompt => tokio::task::spawn_blocking(move || prompt(level))
                .await
                .context("Permission prompt task panicked")??,
        };

        if status == PermissionStatus::NotDetermined {
            debug!("Media library permission left undetermined");
            return Ok(status);
        }

        self.with_db(move |db| db.set_permission(level, status)).await?;
        info!("Media library {} access is now {}", level, status);
        Ok(status)
    }

    async fn save(&self, artifact: &Artifact) -> Result<Asset> {
        tokio::fs::create_dir_all(&self.library_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.library_dir.display()))?;

        let extension = artifact
            .location
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| default_extension(artifact).to_string());

        let mut asset = Asset::new(
            artifact.kind,
            artifact.location.display().to_string(),
            String::new(),
            0,
        );
        asset.file_name = format!("{}.{}", asset.id, extension);
        let target = self.library_dir.join(&asset.file_name);

        asset.byte_size = tokio::fs::copy(&artifact.location, &target)
            .await
            .with_context(|| {
                format!(
                    "Failed to copy {} into {}",
                    artifact.location.display(),
                    self.library_dir.display()
                )
            })?;

        let record = asset.clone();
        if let Err(e) = self.with_db(move |db| db.insert_asset(&record)).await {
            if let Err(cleanup) = tokio::fs::remove_file(&target).await {
                warn!("Could not remove orphaned {}: {}", target.display(), cleanup);
            }
            return Err(e);
        }

        debug!("Stored {} as {}", artifact.location.display(), target.display());
        Ok(asset)
    }
}

fn default_extension(artifact: &Artifact) -> &'static str {
    match artifact.kind {
        crate::capture::ArtifactKind::Video => "mov",
        crate::capture::ArtifactKind::Image => "ppm",
    }
}

/// Ask on the terminal. Without a terminal the answer stays undetermined.
fn prompt(level: AccessLevel) -> Result<PermissionStatus> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        warn!("No terminal to ask for media library access");
        return Ok(PermissionStatus::NotDetermined);
    }

    let mut stderr = std::io::stderr();
    write!(
        stderr,
        "\nAllow scenecast {} access to your media library? [a]llow / [l]imited / [d]eny: ",
        level
    )?;
    stderr.flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;

    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> PermissionStatus {
    match answer.trim().to_ascii_lowercase().as_str() {
        "a" | "allow" | "y" | "yes" => PermissionStatus::Authorized,
        "l" | "limited" => PermissionStatus::Limited,
        "d" | "deny" | "n" | "no" => PermissionStatus::Denied,
        _ => PermissionStatus::NotDetermined,
    }
}

/// Temporary capture storage on the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsTempStore;

#[async_trait]
impl TempStore for FsTempStore {
    async fn delete(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}
