//! Mailbox actor that owns a recording session
//!
//! Every entry into the state machine goes through one unbounded channel
//! drained by one task. Ticks must never block the frame clock, which is why
//! the channel is unbounded.

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::library::{PersistError, SavedAsset};
use crate::session::machine::{
    RecordingError, RecordingSession, SessionEvent, SessionParts, SessionStatus,
};
use crate::session::Tick;

const EVENT_CAPACITY: usize = 64;

/// Messages processed by the session task, in delivery order
#[derive(Debug)]
pub enum SessionCommand {
    /// Begin a new recording episode
    Start {
        reply: oneshot::Sender<Result<(), RecordingError>>,
    },

    /// Ask the running episode to stop on its next tick
    RequestStop,

    /// One rendered frame of the given episode
    Tick { episode: u64, tick: Tick },

    /// Completion of a background save
    SaveFinished {
        result: Result<SavedAsset, PersistError>,
    },

    /// Snapshot of the session state
    Status { reply: oneshot::Sender<SessionStatus> },

    /// Stop accepting new episodes and exit once idle
    Shutdown,
}

pub type CommandSender = mpsc::UnboundedSender<SessionCommand>;
pub type CommandReceiver = mpsc::UnboundedReceiver<SessionCommand>;

/// Where a recorder reports frames for one episode
#[derive(Debug, Clone)]
pub struct TickSink {
    tx: CommandSender,
    episode: u64,
}

impl TickSink {
    pub fn new(tx: CommandSender, episode: u64) -> Self {
        Self { tx, episode }
    }

    /// Report one frame. Returns false once the session is gone.
    pub fn emit(&self, tick: Tick) -> bool {
        self.tx
            .send(SessionCommand::Tick {
                episode: self.episode,
                tick,
            })
            .is_ok()
    }

    pub fn episode(&self) -> u64 {
        self.episode
    }
}

/// Handle to a running session task
pub struct SessionHandle {
    tx: CommandSender,
    events: broadcast::Sender<SessionEvent>,
    task: JoinHandle<()>,
}

/// Spawn the session task and return a handle to it
pub fn spawn_session(parts: SessionParts) -> SessionHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    let session = RecordingSession::new(parts, tx.clone(), events.clone());
    let task = tokio::spawn(run(session, rx));

    SessionHandle { tx, events, task }
}

impl SessionHandle {
    /// Start a new recording episode
    pub async fn start(&self) -> Result<(), RecordingError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(SessionCommand::Start { reply })
            .map_err(|_| RecordingError::SessionClosed)?;
        rx.await.map_err(|_| RecordingError::SessionClosed)?
    }

    /// Ask the running episode to stop. Observed on the next frame.
    pub fn request_stop(&self) {
        let _ = self.tx.send(SessionCommand::RequestStop);
    }

    /// Current session state, or None once the task has exited
    pub async fn status(&self) -> Option<SessionStatus> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(SessionCommand::Status { reply }).ok()?;
        rx.await.ok()
    }

    /// Follow lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Stop the session once any running episode and save have finished
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.tx.send(SessionCommand::Shutdown);
        self.task.await.context("Session task panicked")
    }
}

/// Drain the mailbox until shutdown
async fn run(mut session: RecordingSession, mut rx: CommandReceiver) {
    let mut draining = false;

    while let Some(command) = rx.recv().await {
        match command {
            SessionCommand::Start { reply } => {
                let result = if draining {
                    Err(RecordingError::SessionClosed)
                } else {
                    session.start().await
                };
                let _ = reply.send(result);
            }
            SessionCommand::RequestStop => session.request_stop(),
            SessionCommand::Tick { episode, tick } => {
                session.on_tick(episode, tick).await;
            }
            SessionCommand::SaveFinished { result } => session.on_save_finished(result),
            SessionCommand::Status { reply } => {
                let _ = reply.send(session.status());
            }
            SessionCommand::Shutdown => {
                debug!("Shutdown requested");
                draining = true;
                session.request_stop();
            }
        }

        if draining && session.is_quiescent() {
            break;
        }
    }

    info!("Recording session closed");
}
