//! Session controller state types

use serde::Serialize;

/// Where the turn controller is within one exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionState {
    /// Ready for a typed message or a voice clip
    #[default]
    Idle,
    /// A user turn was appended; the completion request is in flight
    AwaitingReply,
    /// The reply text is known; audio is being produced for it
    Synthesizing { reply: String },
    /// A recorded clip is being transcribed
    Transcribing,
}

impl SessionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingReply => "awaiting_reply",
            SessionState::Synthesizing { .. } => "synthesizing",
            SessionState::Transcribing => "transcribing",
        }
    }
}

/// Per-session facts the transition function may consult
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: String,
    pub synthesis_available: bool,
    pub recognition_available: bool,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            synthesis_available: false,
            recognition_available: false,
        }
    }

    pub fn with_synthesis(mut self, available: bool) -> Self {
        self.synthesis_available = available;
        self
    }

    pub fn with_recognition(mut self, available: bool) -> Self {
        self.recognition_available = available;
        self
    }
}
