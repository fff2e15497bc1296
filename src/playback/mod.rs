pub mod engine;

pub use engine::{PlaybackEngine, RunControlHandle, RunHandle};

use chrono::{DateTime, Utc};

/// Run state, owned exclusively by the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Stopping,
    Stopped,
    Completed,
}

impl RunState {
    /// Terminal for the run (the rig can be reclaimed)
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Stopped | RunState::Completed)
    }
}

/// Progress/status event emitted on every transition and every completed
/// sample dispatch
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub index: usize,
    pub total: usize,
    pub state: RunState,
    pub last_error: Option<String>,
    pub timestamp: DateTime<Utc>,
}
