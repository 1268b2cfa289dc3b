//! Recording state and per-frame observations

use serde::{Deserialize, Serialize};

/// Lifecycle state of a recording session
///
/// Transitions only ever go Idle → Recording → Stopping → Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// Waiting for a start request
    #[default]
    Idle,
    /// Capturing frames
    Recording,
    /// Waiting for the recorder to finalize the artifact
    Stopping,
}

impl RecordingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
        }
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: RecordingState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Recording)
                | (Self::Recording, Self::Stopping)
                | (Self::Stopping, Self::Idle)
        )
    }
}

/// One elapsed-time observation reported by the recorder per rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Seconds since the capture started
    pub elapsed_seconds: f64,
}

impl Tick {
    pub fn new(elapsed_seconds: f64) -> Self {
        Self { elapsed_seconds }
    }

    /// Ticks before the clock has advanced carry no rate information
    pub fn is_meaningful(&self) -> bool {
        self.elapsed_seconds > 0.0 && self.elapsed_seconds.is_finite()
    }
}
