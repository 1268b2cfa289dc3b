//! Capture module for scenecast
//!
//! Defines the recorder boundary the session drives:
//! - [`Recorder`] starts a capture and takes still snapshots
//! - [`CaptureHandle`] finishes a running capture into an [`Artifact`]
//!
//! Frames are reported to the session through a [`TickSink`].

mod synthetic;

pub use synthetic::SyntheticRecorder;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::session::TickSink;

/// Video container written by the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Mov,
    Mp4,
}

impl Container {
    /// File extension for this container
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mov => "mov",
            Self::Mp4 => "mp4",
        }
    }
}

/// Video codec requested from the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[default]
    Hevc,
    H264,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hevc => "hevc",
            Self::H264 => "h264",
        }
    }
}

/// Settings handed to the recorder when a capture starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoSettings {
    pub container: Container,
    pub codec: Codec,
    pub frame_rate: u32,
}

/// Kind of a finished capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Video,
    Image,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "video" => Ok(Self::Video),
            "image" => Ok(Self::Image),
            other => Err(format!("unknown artifact kind: {}", other)),
        }
    }
}

/// A finished capture sitting in temporary storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Location of the temporary file
    pub location: PathBuf,

    /// Video or still image
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn new(location: PathBuf, kind: ArtifactKind) -> Self {
        Self { location, kind }
    }
}

/// Frame-capturing recorder
///
/// Implementations own the frame source and the encoder. The session only
/// sees start, finish and the stream of elapsed-time ticks.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Begin capturing. Each rendered frame reports its elapsed time to `ticks`.
    async fn start_capture(
        &self,
        settings: &VideoSettings,
        ticks: TickSink,
    ) -> Result<Box<dyn CaptureHandle>>;

    /// Capture a single still frame
    async fn snapshot(&self) -> Result<Artifact>;

    /// Recorder name for logging
    fn backend_name(&self) -> &'static str;
}

/// A capture in progress
#[async_trait]
pub trait CaptureHandle: Send {
    /// Stop capturing and finalize the output. Cannot be aborted once called.
    async fn finish_capture(&mut self) -> Result<Artifact>;
}

/// Create the recorder configured in settings
pub fn create_recorder(settings: &Settings) -> Arc<dyn Recorder> {
    tracing::info!("Using synthetic frame clock recorder");
    Arc::new(SyntheticRecorder::new(
        settings.recording.temp_dir.clone(),
        settings.recording.frame_rate,
    ))
}
