//! Events that can occur in a session

use crate::llm::LlmErrorKind;
use crate::speech::{AudioArtifact, AudioClip, SpeechErrorKind};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
    },
    VoiceClip {
        clip: AudioClip,
    },
    ToggleTranslation {
        turn: usize,
    },

    // Recognition events
    TranscriptReady {
        text: String,
    },
    TranscriptionFailed {
        kind: SpeechErrorKind,
        message: String,
    },

    // Completion events
    CompletionReady {
        text: String,
    },
    CompletionFailed {
        kind: LlmErrorKind,
        message: String,
    },

    // Synthesis events
    SynthesisReady {
        audio: AudioArtifact,
    },
    SynthesisFailed {
        kind: SpeechErrorKind,
        message: String,
    },

    // Translation events
    TranslationReady {
        turn: usize,
        text: String,
    },
    TranslationFailed {
        turn: usize,
        message: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserMessage { .. } => "user_message",
            Event::VoiceClip { .. } => "voice_clip",
            Event::ToggleTranslation { .. } => "toggle_translation",
            Event::TranscriptReady { .. } => "transcript_ready",
            Event::TranscriptionFailed { .. } => "transcription_failed",
            Event::CompletionReady { .. } => "completion_ready",
            Event::CompletionFailed { .. } => "completion_failed",
            Event::SynthesisReady { .. } => "synthesis_ready",
            Event::SynthesisFailed { .. } => "synthesis_failed",
            Event::TranslationReady { .. } => "translation_ready",
            Event::TranslationFailed { .. } => "translation_failed",
        }
    }
}
