use std::fmt;

/// Lifecycle of a recording session.
///
/// State transitions:
/// ```text
/// idle → starting → recording ↔ paused
///                      ↓          ↓
///                 stopping { canceled } → finalizing → idle
/// ```
///
/// This is the single source of truth for a session: cancellation is part
/// of the `Stopping` state rather than a separate flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingPhase {
    Idle,
    Starting,
    Recording,
    Paused,
    Stopping { canceled: bool },
    Finalizing,
}

impl RecordingPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Started and not yet asked to stop.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Starting | Self::Recording | Self::Paused)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Stopping { canceled: true })
    }
}

/// Encoder pipeline lifecycle. A pipeline is never restarted: every session
/// builds a fresh encoder/muxer pair.
///
/// ```text
/// idle → started → stopping → stopped
///           ↓
///         failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Idle,
    Started,
    Stopping,
    Stopped,
    Failed,
}

impl EncoderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for EncoderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
