//! Recording session module for scenecast
//!
//! The session is a small state machine driven from a single mailbox:
//! user commands, recorder ticks and save completions are all messages, so
//! state transitions never race each other.

mod actor;
mod autostop;
mod machine;
mod state;
mod time;

pub use actor::{spawn_session, SessionCommand, SessionHandle, TickSink};
pub use autostop::{should_stop, AutostopConfig};
pub use machine::{
    DisplaySink, RecordingError, RecordingSession, SessionEvent, SessionParts, SessionStatus,
    TickOutcome,
};
pub use state::{RecordingState, Tick};
pub use time::{format_time, DisplayTime, FormatError};
