//! Pure state transition function
//!
//! Given the same state, context, session and event this always produces the
//! same result. The session is read-only here; changes to it are expressed as
//! effects.

use super::{Effect, Event, SessionContext, SessionState};
use crate::locale::Notice;
use crate::session::{Role, Session, Turn};
use crate::speech::SpeechErrorKind;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A reply is still being prepared, please wait")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Turn {0} cannot be translated")]
    NotTranslatable(usize),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: &SessionState,
    context: &SessionContext,
    session: &Session,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User input
        // ============================================================
        (SessionState::Idle, Event::UserMessage { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            Ok(accept_user_turn(text))
        }

        (SessionState::Idle, Event::VoiceClip { clip }) => {
            if clip.bytes.is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            if !context.recognition_available {
                return Ok(TransitionResult::new(SessionState::Idle)
                    .with_effect(Effect::notify(Notice::RecognitionUnavailable))
                    .with_effect(Effect::PublishSnapshot));
            }
            Ok(TransitionResult::new(SessionState::Transcribing)
                .with_effect(Effect::PublishSnapshot)
                .with_effect(Effect::RequestTranscription { clip }))
        }

        (_, Event::UserMessage { .. } | Event::VoiceClip { .. }) => Err(TransitionError::Busy),

        // ============================================================
        // Recognition
        // ============================================================
        (SessionState::Transcribing, Event::TranscriptReady { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(TransitionResult::new(SessionState::Idle)
                    .with_effect(Effect::notify(Notice::NothingHeard))
                    .with_effect(Effect::PublishSnapshot));
            }
            Ok(accept_user_turn(text))
        }

        (SessionState::Transcribing, Event::TranscriptionFailed { .. }) => {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::notify(Notice::RecognitionFailed))
                .with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Completion
        // ============================================================
        (SessionState::AwaitingReply, Event::CompletionReady { text }) => {
            require_pending_user_turn(session)?;
            if context.synthesis_available {
                return Ok(TransitionResult::new(SessionState::Synthesizing {
                    reply: text.clone(),
                })
                .with_effect(Effect::PublishSnapshot)
                .with_effect(Effect::RequestSynthesis { text }));
            }
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::append(Turn::assistant(text, None)))
                .with_effect(Effect::PublishSnapshot))
        }

        // The reply becomes the fixed failure string and synthesis is skipped
        (SessionState::AwaitingReply, Event::CompletionFailed { .. }) => {
            require_pending_user_turn(session)?;
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::append(Turn::assistant(
                    Notice::CompletionFailed.text(),
                    None,
                )))
                .with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Synthesis
        // ============================================================
        (SessionState::Synthesizing { reply }, Event::SynthesisReady { audio }) => {
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::append(Turn::assistant(reply.clone(), Some(audio))))
                .with_effect(Effect::PublishSnapshot))
        }

        // Audio failures never drop the text reply
        (SessionState::Synthesizing { reply }, Event::SynthesisFailed { kind, .. }) => {
            let reply_index = session.next_index();
            Ok(TransitionResult::new(SessionState::Idle)
                .with_effect(Effect::append(Turn::assistant(reply.clone(), None)))
                .with_effect(Effect::notify_turn(synthesis_notice(kind), reply_index))
                .with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Translation (allowed in any state)
        // ============================================================
        (_, Event::ToggleTranslation { turn }) => {
            let target = session
                .turn(turn)
                .filter(|t| t.is_translatable())
                .ok_or(TransitionError::NotTranslatable(turn))?;
            let view = session.translation(turn);

            let result = TransitionResult::new(state.clone())
                .with_effect(Effect::SetTranslationVisible {
                    turn,
                    visible: !view.visible,
                })
                .with_effect(Effect::PublishSnapshot);

            if view.visible || view.text.is_some() {
                return Ok(result);
            }
            Ok(result.with_effect(Effect::RequestTranslation {
                turn,
                text: target.content.clone(),
            }))
        }

        (_, Event::TranslationReady { turn, text }) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::CacheTranslation { turn, text })
            .with_effect(Effect::PublishSnapshot)),

        // Not cached, so the next toggle retries
        (_, Event::TranslationFailed { turn, .. }) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::SetTranslationVisible {
                turn,
                visible: false,
            })
            .with_effect(Effect::notify_turn(Notice::TranslationFailed, turn))
            .with_effect(Effect::PublishSnapshot)),

        // ============================================================
        // Everything else is a sequencing bug
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} while {}",
            event.name(),
            state.name()
        ))),
    }
}

fn accept_user_turn(text: &str) -> TransitionResult {
    TransitionResult::new(SessionState::AwaitingReply)
        .with_effect(Effect::append(Turn::user(text)))
        .with_effect(Effect::PublishSnapshot)
        .with_effect(Effect::RequestCompletion)
}

/// An assistant turn may only follow a user turn
fn require_pending_user_turn(session: &Session) -> Result<(), TransitionError> {
    if session.last_role() == Some(Role::User) {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition(
            "reply without a pending user turn".to_string(),
        ))
    }
}

pub fn synthesis_notice(kind: SpeechErrorKind) -> Notice {
    match kind {
        SpeechErrorKind::Connection => Notice::TtsConnectionFailed,
        SpeechErrorKind::ResponseShape => Notice::InvalidAudioPath,
        SpeechErrorKind::ArtifactMissing => Notice::AudioPathNotFound,
        SpeechErrorKind::Failed => Notice::AudioGenerationFailed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use crate::speech::{AudioArtifact, AudioClip};
    use std::path::PathBuf;

    fn test_context() -> SessionContext {
        SessionContext::new("test-session")
            .with_synthesis(true)
            .with_recognition(true)
    }

    fn session_with_user_turn() -> Session {
        let mut session = Session::new("test-session", "Woezɔ");
        session.push_turn(Turn::user("Aleke yame ƒe nɔnɔme le egbe?"));
        session
    }

    fn audio() -> AudioArtifact {
        AudioArtifact {
            file_name: "a.wav".to_string(),
            path: PathBuf::from("/tmp/a.wav"),
            media_type: "audio/wav".to_string(),
        }
    }

    #[test]
    fn test_idle_to_awaiting_reply() {
        let session = Session::new("s", "Woezɔ");
        let result = transition(
            &SessionState::Idle,
            &test_context(),
            &session,
            Event::UserMessage {
                text: "  Ŋdi  ".to_string(),
            },
        )
        .unwrap();

        assert_eq!(result.new_state, SessionState::AwaitingReply);
        assert!(matches!(
            &result.effects[0],
            Effect::AppendTurn { turn } if turn.content == "Ŋdi" && turn.role == Role::User
        ));
        assert!(matches!(result.effects.last(), Some(Effect::RequestCompletion)));
    }

    #[test]
    fn test_reject_blank_message() {
        let session = Session::new("s", "Woezɔ");
        let result = transition(
            &SessionState::Idle,
            &test_context(),
            &session,
            Event::UserMessage {
                text: " \n\t".to_string(),
            },
        );
        assert!(matches!(result, Err(TransitionError::EmptyMessage)));
    }

    #[test]
    fn test_reject_message_while_busy() {
        let session = session_with_user_turn();
        for state in [
            SessionState::AwaitingReply,
            SessionState::Transcribing,
            SessionState::Synthesizing {
                reply: "Ŋdi".to_string(),
            },
        ] {
            let result = transition(
                &state,
                &test_context(),
                &session,
                Event::UserMessage {
                    text: "Hello".to_string(),
                },
            );
            assert!(matches!(result, Err(TransitionError::Busy)));
        }
    }

    #[test]
    fn test_completion_failure_skips_synthesis() {
        let result = transition(
            &SessionState::AwaitingReply,
            &test_context(),
            &session_with_user_turn(),
            Event::CompletionFailed {
                kind: LlmErrorKind::ServerError,
                message: "503".to_string(),
            },
        )
        .unwrap();

        assert_eq!(result.new_state, SessionState::Idle);
        assert!(matches!(
            &result.effects[0],
            Effect::AppendTurn { turn } if turn.content == Notice::CompletionFailed.text()
        ));
        assert!(!result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::RequestSynthesis { .. })));
    }

    #[test]
    fn test_completion_without_synthesis_appends_immediately() {
        let context = SessionContext::new("s");
        let result = transition(
            &SessionState::AwaitingReply,
            &context,
            &session_with_user_turn(),
            Event::CompletionReady {
                text: "Yame nyo.".to_string(),
            },
        )
        .unwrap();

        assert_eq!(result.new_state, SessionState::Idle);
        assert!(matches!(
            &result.effects[0],
            Effect::AppendTurn { turn } if turn.audio.is_none() && turn.content == "Yame nyo."
        ));
    }

    #[test]
    fn test_completion_requires_pending_user_turn() {
        let session = Session::new("s", "Woezɔ");
        let result = transition(
            &SessionState::AwaitingReply,
            &test_context(),
            &session,
            Event::CompletionReady {
                text: "extra".to_string(),
            },
        );
        assert!(matches!(result, Err(TransitionError::InvalidTransition(_))));
    }

    #[test]
    fn test_synthesis_ready_attaches_audio() {
        let result = transition(
            &SessionState::Synthesizing {
                reply: "Yame nyo.".to_string(),
            },
            &test_context(),
            &session_with_user_turn(),
            Event::SynthesisReady { audio: audio() },
        )
        .unwrap();

        assert!(matches!(
            &result.effects[0],
            Effect::AppendTurn { turn } if turn.audio == Some(audio())
        ));
    }

    #[test]
    fn test_synthesis_failure_keeps_text_and_warns() {
        let session = session_with_user_turn();
        let result = transition(
            &SessionState::Synthesizing {
                reply: "Yame nyo.".to_string(),
            },
            &test_context(),
            &session,
            Event::SynthesisFailed {
                kind: SpeechErrorKind::ResponseShape,
                message: "no path".to_string(),
            },
        )
        .unwrap();

        assert!(matches!(
            &result.effects[0],
            Effect::AppendTurn { turn } if turn.audio.is_none() && turn.content == "Yame nyo."
        ));
        assert!(matches!(
            result.effects[1],
            Effect::Notify { notice: Notice::InvalidAudioPath, turn: Some(2) }
        ));
    }

    #[test]
    fn test_synthesis_notices_are_distinct() {
        let kinds = [
            SpeechErrorKind::Connection,
            SpeechErrorKind::ResponseShape,
            SpeechErrorKind::ArtifactMissing,
            SpeechErrorKind::Failed,
        ];
        let notices: std::collections::HashSet<_> =
            kinds.into_iter().map(synthesis_notice).collect();
        assert_eq!(notices.len(), kinds.len());
    }

    #[test]
    fn test_blank_transcript_is_not_appended() {
        let result = transition(
            &SessionState::Transcribing,
            &test_context(),
            &Session::new("s", "Woezɔ"),
            Event::TranscriptReady {
                text: "   ".to_string(),
            },
        )
        .unwrap();

        assert_eq!(result.new_state, SessionState::Idle);
        assert!(!result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::AppendTurn { .. })));
        assert!(matches!(
            result.effects[0],
            Effect::Notify { notice: Notice::NothingHeard, turn: None }
        ));
    }

    #[test]
    fn test_voice_clip_without_recognition() {
        let context = SessionContext::new("s").with_synthesis(true);
        let result = transition(
            &SessionState::Idle,
            &context,
            &Session::new("s", "Woezɔ"),
            Event::VoiceClip {
                clip: AudioClip {
                    bytes: vec![1, 2, 3],
                    media_type: "audio/webm".to_string(),
                },
            },
        )
        .unwrap();

        assert_eq!(result.new_state, SessionState::Idle);
        assert!(matches!(
            result.effects[0],
            Effect::Notify { notice: Notice::RecognitionUnavailable, .. }
        ));
    }

    #[test]
    fn test_first_toggle_requests_translation() {
        let session = Session::new("s", "Woezɔ");
        let result = transition(
            &SessionState::Idle,
            &test_context(),
            &session,
            Event::ToggleTranslation { turn: 0 },
        )
        .unwrap();

        assert!(matches!(
            result.effects[0],
            Effect::SetTranslationVisible { turn: 0, visible: true }
        ));
        assert!(matches!(
            result.effects.last(),
            Some(Effect::RequestTranslation { turn: 0, text }) if text == "Woezɔ"
        ));
    }

    #[test]
    fn test_cached_translation_is_not_requested_again() {
        let mut session = Session::new("s", "Woezɔ");
        session.cache_translation(0, "Welcome".to_string());

        let result = transition(
            &SessionState::Idle,
            &test_context(),
            &session,
            Event::ToggleTranslation { turn: 0 },
        )
        .unwrap();

        assert!(!result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::RequestTranslation { .. })));
    }

    #[test]
    fn test_user_turn_is_not_translatable() {
        let result = transition(
            &SessionState::Idle,
            &test_context(),
            &session_with_user_turn(),
            Event::ToggleTranslation { turn: 1 },
        );
        assert!(matches!(result, Err(TransitionError::NotTranslatable(1))));
    }

    #[test]
    fn test_stray_result_is_invalid() {
        let result = transition(
            &SessionState::Idle,
            &test_context(),
            &Session::new("s", "Woezɔ"),
            Event::SynthesisReady { audio: audio() },
        );
        assert_eq!(
            result.unwrap_err(),
            TransitionError::InvalidTransition("synthesis_ready while idle".to_string())
        );
    }
}
