//! SQLite index of the media library

use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::capture::ArtifactKind;
use crate::config::Settings;
use crate::library::models::Asset;
use crate::library::{AccessLevel, PermissionStatus};
use crate::{Result, ScenecastError};

/// Database wrapper for the media library
pub struct LibraryDatabase {
    conn: Connection,
}

const CURRENT_SCHEMA_VERSION: i64 = 1;

const ASSET_COLUMNS: &str = "id, kind, original_name, file_name, byte_size, created_at";

impl LibraryDatabase {
    /// Open or create the database
    pub fn open(settings: &Settings) -> Result<Self> {
        let db_path = settings.database_path();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::open_path(&db_path)
    }

    /// Open database at a specific path (useful for testing)
    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        let db = Self { conn };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize database schema
    fn initialize(&self) -> Result<()> {
        let current_version = self.schema_version()?;
        if current_version > CURRENT_SCHEMA_VERSION {
            return Err(ScenecastError::Schema {
                found: current_version,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }

        if current_version < 1 {
            self.migrate_to_v1()?;
            self.set_schema_version(1)?;
        }

        Ok(())
    }

    /// Current schema version tracked in PRAGMA user_version.
    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?)
    }

    fn set_schema_version(&self, version: i64) -> Result<()> {
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {};", version))?;
        Ok(())
    }

    fn migrate_to_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS assets (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                original_name TEXT NOT NULL,
                file_name TEXT NOT NULL,
                byte_size INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_assets_created_at
                ON assets(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_assets_kind
                ON assets(kind);

            CREATE TABLE IF NOT EXISTS permissions (
                access_level TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    /// Insert a new asset
    pub fn insert_asset(&self, asset: &Asset) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO assets (id, kind, original_name, file_name, byte_size, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                asset.id,
                asset.kind.as_str(),
                asset.original_name,
                asset.file_name,
                asset.byte_size as i64,
                asset.created_at.timestamp(),
            ],
        )?;

        Ok(())
    }

    /// Get an asset by ID
    pub fn get_asset(&self, id: &str) -> Result<Option<Asset>> {
        let sql = format!("SELECT {} FROM assets WHERE id = ?1", ASSET_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::row_to_asset)
            .optional()?)
    }

    /// Find an asset by ID prefix
    pub fn find_asset_by_prefix(&self, prefix: &str) -> Result<Option<Asset>> {
        let pattern = format!("{}%", prefix);
        let sql = format!(
            "SELECT {} FROM assets WHERE id LIKE ?1 ORDER BY created_at DESC LIMIT 1",
            ASSET_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![pattern], Self::row_to_asset)
            .optional()?)
    }

    /// List assets ordered by creation date, optionally of one kind
    pub fn list_assets(&self, limit: usize, kind: Option<ArtifactKind>) -> Result<Vec<Asset>> {
        let assets = match kind {
            Some(kind) => {
                let sql = format!(
                    "SELECT {} FROM assets WHERE kind = ?1 ORDER BY created_at DESC LIMIT ?2",
                    ASSET_COLUMNS
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params![kind.as_str(), limit as i64], Self::row_to_asset)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM assets ORDER BY created_at DESC LIMIT ?1",
                    ASSET_COLUMNS
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map(params![limit as i64], Self::row_to_asset)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        Ok(assets)
    }

    /// Delete an asset record
    pub fn delete_asset(&self, id: &str) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM assets WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(ScenecastError::NotFound(format!("asset {}", id)));
        }
        Ok(())
    }

    /// Stored permission for exactly this access level
    pub fn permission(&self, level: AccessLevel) -> Result<PermissionStatus> {
        let status: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM permissions WHERE access_level = ?1",
                params![level.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(status
            .and_then(|s| s.parse().ok())
            .unwrap_or(PermissionStatus::NotDetermined))
    }

    /// Permission that applies to a save at `level`.
    ///
    /// A read-write grant also covers add-only saves.
    pub fn effective_permission(&self, level: AccessLevel) -> Result<PermissionStatus> {
        let direct = self.permission(level)?;
        if level == AccessLevel::AddOnly && !direct.allows_save() {
            let broader = self.permission(AccessLevel::ReadWrite)?;
            if broader.allows_save() {
                return Ok(broader);
            }
        }
        Ok(direct)
    }

    /// Record the resolved permission for a level
    pub fn set_permission(&self, level: AccessLevel, status: PermissionStatus) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO permissions (access_level, status, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(access_level) DO UPDATE SET status = ?2, updated_at = ?3
            "#,
            params![level.as_str(), status.as_str(), Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// Forget the stored permission so the next save asks again
    pub fn reset_permission(&self, level: AccessLevel) -> Result<()> {
        self.conn.execute(
            "DELETE FROM permissions WHERE access_level = ?1",
            params![level.as_str()],
        )?;
        Ok(())
    }

    fn row_to_asset(row: &rusqlite::Row) -> rusqlite::Result<Asset> {
        let kind_str: String = row.get(1)?;
        let byte_size: i64 = row.get(4)?;
        let created_timestamp: i64 = row.get(5)?;

        let kind = kind_str.parse().map_err(|e: String| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?;

        Ok(Asset {
            id: row.get(0)?,
            kind,
            original_name: row.get(2)?,
            file_name: row.get(3)?,
            byte_size: byte_size.max(0) as u64,
            created_at: Utc
                .timestamp_opt(created_timestamp, 0)
                .single()
                .unwrap_or_else(Utc::now),
        })
    }

    /// Get library statistics
    pub fn get_stats(&self) -> Result<LibraryStats> {
        let (videos, images, total_bytes): (i64, i64, Option<i64>) = self.conn.query_row(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN kind = 'video' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN kind = 'image' THEN 1 ELSE 0 END), 0),
                SUM(byte_size)
            FROM assets
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(LibraryStats {
            videos: videos as usize,
            images: images as usize,
            total_bytes: total_bytes.unwrap_or(0) as u64,
        })
    }
}

/// Library statistics
#[derive(Debug, Clone)]
pub struct LibraryStats {
    pub videos: usize,
    pub images: usize,
    pub total_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn asset(kind: ArtifactKind) -> Asset {
        Asset::new(kind, "/tmp/take.mov".to_string(), "stored.mov".to_string(), 42)
    }

    #[test]
    fn test_create_database() {
        let db = LibraryDatabase::open_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.videos, 0);
        assert_eq!(stats.total_bytes, 0);
    }

    #[test]
    fn test_insert_and_get_asset() {
        let db = LibraryDatabase::open_memory().unwrap();

        let video = asset(ArtifactKind::Video);
        db.insert_asset(&video).unwrap();

        let retrieved = db.get_asset(&video.id).unwrap().unwrap();
        assert_eq!(retrieved.kind, ArtifactKind::Video);
        assert_eq!(retrieved.byte_size, 42);
        assert_eq!(retrieved.file_name, "stored.mov");
    }

    #[test]
    fn test_list_filters_by_kind() {
        let db = LibraryDatabase::open_memory().unwrap();
        db.insert_asset(&asset(ArtifactKind::Video)).unwrap();
        db.insert_asset(&asset(ArtifactKind::Image)).unwrap();
        db.insert_asset(&asset(ArtifactKind::Image)).unwrap();

        assert_eq!(db.list_assets(10, None).unwrap().len(), 3);
        assert_eq!(db.list_assets(10, Some(ArtifactKind::Image)).unwrap().len(), 2);
        assert_eq!(db.list_assets(1, None).unwrap().len(), 1);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.videos, 1);
        assert_eq!(stats.images, 2);
        assert_eq!(stats.total_bytes, 126);
    }

    #[test]
    fn test_permission_defaults_to_not_determined() {
        let db = LibraryDatabase::open_memory().unwrap();
        assert_eq!(
            db.permission(AccessLevel::AddOnly).unwrap(),
            PermissionStatus::NotDetermined
        );
    }

    #[test]
    fn test_read_write_grant_covers_add_only() {
        let db = LibraryDatabase::open_memory().unwrap();
        db.set_permission(AccessLevel::ReadWrite, PermissionStatus::Authorized)
            .unwrap();

        assert_eq!(
            db.effective_permission(AccessLevel::AddOnly).unwrap(),
            PermissionStatus::Authorized
        );
        assert_eq!(
            db.permission(AccessLevel::AddOnly).unwrap(),
            PermissionStatus::NotDetermined
        );
    }

    #[test]
    fn test_reset_permission_forgets_answer() {
        let db = LibraryDatabase::open_memory().unwrap();
        db.set_permission(AccessLevel::AddOnly, PermissionStatus::Denied)
            .unwrap();
        db.set_permission(AccessLevel::AddOnly, PermissionStatus::Limited)
            .unwrap();
        assert_eq!(
            db.permission(AccessLevel::AddOnly).unwrap(),
            PermissionStatus::Limited
        );

        db.reset_permission(AccessLevel::AddOnly).unwrap();
        assert_eq!(
            db.permission(AccessLevel::AddOnly).unwrap(),
            PermissionStatus::NotDetermined
        );
    }

    #[test]
    fn test_delete_missing_asset_is_not_found() {
        let db = LibraryDatabase::open_memory().unwrap();
        assert!(matches!(
            db.delete_asset("missing"),
            Err(ScenecastError::NotFound(_))
        ));
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("future.db");

        let conn = Connection::open(&db_path).unwrap();
        conn.execute_batch("PRAGMA user_version = 7;").unwrap();
        drop(conn);

        assert!(matches!(
            LibraryDatabase::open_path(&db_path),
            Err(ScenecastError::Schema { found: 7, .. })
        ));
    }
}
