//! Recording session state machine

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::capture::{Artifact, CaptureHandle, Recorder, VideoSettings};
use crate::library::{MediaPersistence, PersistError, SavedAsset};
use crate::session::actor::{CommandSender, SessionCommand, TickSink};
use crate::session::{format_time, should_stop, AutostopConfig, DisplayTime, RecordingState, Tick};

/// Receives the elapsed-time readout while recording
///
/// Updates are fire-and-forget: failures are logged and never affect the
/// recording.
pub trait DisplaySink: Send {
    fn set_display_text(&mut self, time: DisplayTime) -> anyhow::Result<()>;

    /// Called when an episode ends
    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Previous recording is still being saved")]
    PersistInFlight,

    #[error("Recorder unavailable: {0:#}")]
    RecorderUnavailable(#[source] anyhow::Error),

    #[error("Recording session has shut down")]
    SessionClosed,
}

/// Lifecycle notifications published by the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started {
        episode: u64,
    },
    StopRequested {
        episode: u64,
    },
    Stopped {
        episode: u64,
        artifact: Artifact,
        frames: u64,
        elapsed_secs: f64,
    },
    FinishFailed {
        episode: u64,
        message: String,
    },
    Saved {
        asset: SavedAsset,
    },
    SaveFailed {
        location: PathBuf,
        message: String,
    },
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: RecordingState,
    pub episode: u64,
    pub frame_index: u64,
    pub save_in_flight: bool,
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not part of a running episode, or carried no elapsed time
    Dropped,
    /// Counted as a frame
    Counted { frame_index: u64 },
    /// Counted, and the episode was finalized on this frame
    Finalized { frame_index: u64 },
}

/// Collaborators a session is built from
pub struct SessionParts {
    pub recorder: Arc<dyn Recorder>,
    pub display: Box<dyn DisplaySink>,
    pub persistence: Arc<MediaPersistence>,
    pub autostop: AutostopConfig,
    pub video: VideoSettings,
}

/// Recording session
///
/// Methods take `&mut self` and assume they are called from a single task;
/// see [`spawn_session`](crate::session::spawn_session).
pub struct RecordingSession {
    state: RecordingState,
    episode: u64,
    frame_index: u64,
    last_elapsed: f64,
    user_requested_stop: bool,
    save_in_flight: bool,
    capture: Option<Box<dyn CaptureHandle>>,
    recorder: Arc<dyn Recorder>,
    display: Box<dyn DisplaySink>,
    persistence: Arc<MediaPersistence>,
    autostop: AutostopConfig,
    video: VideoSettings,
    mailbox: CommandSender,
    events: broadcast::Sender<SessionEvent>,
}

impl RecordingSession {
    /// Create an idle session. Ticks and save completions are delivered to `mailbox`.
    pub fn new(
        parts: SessionParts,
        mailbox: CommandSender,
        events: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            state: RecordingState::Idle,
            episode: 0,
            frame_index: 0,
            last_elapsed: 0.0,
            user_requested_stop: false,
            save_in_flight: false,
            capture: None,
            recorder: parts.recorder,
            display: parts.display,
            persistence: parts.persistence,
            autostop: parts.autostop,
            video: parts.video,
            mailbox,
            events,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }

    pub fn is_save_in_flight(&self) -> bool {
        self.save_in_flight
    }

    /// Idle with nothing left to deliver
    pub fn is_quiescent(&self) -> bool {
        self.state == RecordingState::Idle && !self.save_in_flight
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            episode: self.episode,
            frame_index: self.frame_index,
            save_in_flight: self.save_in_flight,
        }
    }

    /// Start a new episode
    pub async fn start(&mut self) -> Result<(), RecordingError> {
        if self.state != RecordingState::Idle {
            return Err(RecordingError::AlreadyRecording);
        }
        if self.save_in_flight {
            return Err(RecordingError::PersistInFlight);
        }

        // Bump first so a recorder that fails to start can never leak ticks
        // into the next episode.
        self.episode += 1;
        let ticks = TickSink::new(self.mailbox.clone(), self.episode);

        let capture = match self.recorder.start_capture(&self.video, ticks).await {
            Ok(capture) => capture,
            Err(e) => {
                error!(
                    "Can't start recording with {} recorder: {:#}",
                    self.recorder.backend_name(),
                    e
                );
                return Err(RecordingError::RecorderUnavailable(e));
            }
        };

        self.capture = Some(capture);
        self.frame_index = 0;
        self.last_elapsed = 0.0;
        self.user_requested_stop = false;
        self.transition(RecordingState::Recording);

        info!("Recording started (episode {})", self.episode);
        if self.autostop.is_enabled() {
            info!("Autostop in {} seconds", self.autostop.limit_secs);
        }
        self.publish(SessionEvent::Started {
            episode: self.episode,
        });

        Ok(())
    }

    /// Ask the running episode to stop. The transition happens on the next tick.
    pub fn request_stop(&mut self) {
        if self.state != RecordingState::Recording {
            debug!("Stop requested while {}, ignoring", self.state.as_str());
            return;
        }
        if self.user_requested_stop {
            return;
        }

        self.user_requested_stop = true;
        info!("Stop requested (episode {})", self.episode);
        self.publish(SessionEvent::StopRequested {
            episode: self.episode,
        });
    }

    /// Process one frame reported by the recorder
    pub async fn on_tick(&mut self, episode: u64, tick: Tick) -> TickOutcome {
        if self.state != RecordingState::Recording || episode != self.episode {
            debug!(
                "Dropping tick for episode {} while {} (episode {})",
                episode,
                self.state.as_str(),
                self.episode
            );
            return TickOutcome::Dropped;
        }
        if !tick.is_meaningful() {
            return TickOutcome::Dropped;
        }

        self.frame_index += 1;
        self.last_elapsed = tick.elapsed_seconds;
        let observed_fps = self.frame_index as f64 / tick.elapsed_seconds;

        match format_time(self.frame_index, observed_fps) {
            Ok(time) => {
                if let Err(e) = self.display.set_display_text(time) {
                    debug!("Display update failed: {:#}", e);
                }
            }
            Err(e) => debug!("Skipping display update: {}", e),
        }

        let stop = should_stop(
            self.frame_index,
            observed_fps,
            &self.autostop,
            self.user_requested_stop,
        );

        if stop && self.state == RecordingState::Recording {
            let frame_index = self.frame_index;
            self.transition(RecordingState::Stopping);
            info!(
                "Stopping recording at frame {} (elapsed {:.3}s)",
                frame_index, tick.elapsed_seconds
            );
            self.finalize().await;
            return TickOutcome::Finalized { frame_index };
        }

        TickOutcome::Counted {
            frame_index: self.frame_index,
        }
    }

    /// Record the outcome of a background save
    pub fn on_save_finished(&mut self, result: Result<SavedAsset, PersistError>) {
        self.save_in_flight = false;

        match result {
            Ok(asset) => {
                info!("Recording saved to library: {}", asset.asset.id);
                self.publish(SessionEvent::Saved { asset });
            }
            Err(e) => {
                error!("Could not save recording to library: {}", e);
                self.publish(SessionEvent::SaveFailed {
                    location: e.location().to_path_buf(),
                    message: e.to_string(),
                });
            }
        }
    }

    /// Finish the capture and hand the artifact off. Runs once per episode.
    async fn finalize(&mut self) {
        let frames = self.frame_index;
        let elapsed_secs = self.last_elapsed;

        let result = match self.capture.take() {
            Some(mut capture) => capture.finish_capture().await,
            None => Err(anyhow::anyhow!("No capture in progress")),
        };

        if let Err(e) = self.display.finish() {
            debug!("Display finish failed: {:#}", e);
        }

        self.user_requested_stop = false;
        self.transition(RecordingState::Idle);

        match result {
            Ok(artifact) => {
                info!(
                    "Recording stopped: {} frames in {:.2}s",
                    frames, elapsed_secs
                );
                self.publish(SessionEvent::Stopped {
                    episode: self.episode,
                    artifact: artifact.clone(),
                    frames,
                    elapsed_secs,
                });
                self.hand_off(artifact);
            }
            Err(e) => {
                error!("Recorder failed to finish: {:#}", e);
                self.publish(SessionEvent::FinishFailed {
                    episode: self.episode,
                    message: format!("{:#}", e),
                });
            }
        }
    }

    /// Save the artifact in the background; completion comes back through the mailbox
    fn hand_off(&mut self, artifact: Artifact) {
        self.save_in_flight = true;

        let persistence = self.persistence.clone();
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let result = persistence.save(artifact).await;
            if mailbox
                .send(SessionCommand::SaveFinished { result })
                .is_err()
            {
                warn!("Session closed before the save result was delivered");
            }
        });
    }

    fn transition(&mut self, next: RecordingState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Session {} -> {}", self.state.as_str(), next.as_str());
        self.state = next;

        if next == RecordingState::Idle {
            self.frame_index = 0;
        }
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
