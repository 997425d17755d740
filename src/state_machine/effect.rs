//! Effects produced by state transitions

use crate::locale::Notice;
use crate::session::Turn;
use crate::speech::AudioClip;

/// Effects to be executed after a state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append a turn to the message store
    AppendTurn { turn: Turn },

    /// Ask the completion service for a reply to the whole history
    RequestCompletion,

    /// Turn reply text into audio
    RequestSynthesis { text: String },

    /// Turn a recorded clip into text
    RequestTranscription { clip: AudioClip },

    /// Translate one assistant turn
    RequestTranslation { turn: usize, text: String },

    SetTranslationVisible { turn: usize, visible: bool },

    CacheTranslation { turn: usize, text: String },

    /// Record a localized notice, optionally against a turn
    Notify { notice: Notice, turn: Option<usize> },

    /// Send the current snapshot to subscribers
    PublishSnapshot,
}

impl Effect {
    pub fn notify(notice: Notice) -> Self {
        Effect::Notify { notice, turn: None }
    }

    pub fn notify_turn(notice: Notice, turn: usize) -> Self {
        Effect::Notify {
            notice,
            turn: Some(turn),
        }
    }

    pub fn append(turn: Turn) -> Self {
        Effect::AppendTurn { turn }
    }
}
