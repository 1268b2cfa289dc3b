//! Media library module for scenecast
//!
//! Finished captures are handed to [`MediaPersistence`], which checks the
//! library permission, saves into a [`MediaStore`] and removes the temporary
//! file through a [`TempStore`]. The shipped store is a SQLite-indexed
//! directory ([`LibraryStore`]).

mod database;
mod models;
mod persistence;
mod store;

pub use database::{LibraryDatabase, LibraryStats};
pub use models::Asset;
pub use persistence::{MediaPersistence, PersistError, SavedAsset};
pub use store::{FsTempStore, LibraryStore};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::capture::Artifact;

/// Access granted to the media library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionStatus {
    /// The user has not been asked yet
    NotDetermined,
    /// Access is blocked by policy and cannot be granted by the user
    Restricted,
    /// The user refused access
    Denied,
    /// Full access for the requested level
    Authorized,
    /// Access to a user-selected subset of the library
    Limited,
}

impl PermissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotDetermined => "not-determined",
            Self::Restricted => "restricted",
            Self::Denied => "denied",
            Self::Authorized => "authorized",
            Self::Limited => "limited",
        }
    }

    /// Whether a save may proceed
    pub fn allows_save(&self) -> bool {
        matches!(self, Self::Authorized | Self::Limited)
    }
}

impl std::str::FromStr for PermissionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "not-determined" => Ok(Self::NotDetermined),
            "restricted" => Ok(Self::Restricted),
            "denied" => Ok(Self::Denied),
            "authorized" => Ok(Self::Authorized),
            "limited" => Ok(Self::Limited),
            other => Err(format!("unknown permission status: {}", other)),
        }
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability class a save requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum AccessLevel {
    /// May add new items only
    #[default]
    AddOnly,
    /// May read and modify the library
    ReadWrite,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddOnly => "add-only",
            Self::ReadWrite => "read-write",
        }
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "add-only" => Ok(Self::AddOnly),
            "read-write" => Ok(Self::ReadWrite),
            other => Err(format!("unknown access level: {}", other)),
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an undetermined permission is resolved when a save asks for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationPolicy {
    /// Ask on the terminal
    #[default]
    Prompt,
    /// Grant full access without asking
    Grant,
    /// Grant limited access without asking
    Limit,
    /// Refuse without asking
    Deny,
}

impl std::str::FromStr for AuthorizationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "prompt" => Ok(Self::Prompt),
            "grant" => Ok(Self::Grant),
            "limit" => Ok(Self::Limit),
            "deny" => Ok(Self::Deny),
            other => Err(format!("unknown authorization policy: {}", other)),
        }
    }
}

/// Persistent media store with its own access control
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Current permission for `level`, without prompting
    async fn authorization_status(&self, level: AccessLevel) -> Result<PermissionStatus>;

    /// Ask for permission and return the resolved status
    async fn request_authorization(&self, level: AccessLevel) -> Result<PermissionStatus>;

    /// Store a copy of the artifact
    async fn save(&self, artifact: &Artifact) -> Result<Asset>;
}

/// Storage for in-progress captures
#[async_trait]
pub trait TempStore: Send + Sync {
    async fn delete(&self, path: &Path) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_authorized_and_limited_allow_saving() {
        assert!(PermissionStatus::Authorized.allows_save());
        assert!(PermissionStatus::Limited.allows_save());
        assert!(!PermissionStatus::NotDetermined.allows_save());
        assert!(!PermissionStatus::Restricted.allows_save());
        assert!(!PermissionStatus::Denied.allows_save());
    }

    #[test]
    fn permission_status_names_parse_back() {
        for status in [
            PermissionStatus::NotDetermined,
            PermissionStatus::Restricted,
            PermissionStatus::Denied,
            PermissionStatus::Authorized,
            PermissionStatus::Limited,
        ] {
            assert_eq!(status.as_str().parse::<PermissionStatus>(), Ok(status));
        }
    }

    #[test]
    fn policy_parses_config_names() {
        assert_eq!("limit".parse::<AuthorizationPolicy>(), Ok(AuthorizationPolicy::Limit));
        assert!("always".parse::<AuthorizationPolicy>().is_err());
    }
}
