//! scenecast - Record a rendered scene to video and hand it to a media library
//!
//! The recording lifecycle lives in [`session`], the frame source in
//! [`capture`], and the permission-gated library hand-off in [`library`].

pub mod capture;
pub mod cli;
pub mod config;
pub mod library;
pub mod session;

use thiserror::Error;

/// Main error type for scenecast
#[derive(Error, Debug)]
pub enum ScenecastError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Library schema version {found} is newer than supported version {supported}")]
    Schema { found: i64, supported: i64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ScenecastError>;

/// Application name
pub const APP_NAME: &str = "scenecast";
