//! Property-based tests for the state machine
//!
//! Arbitrary event sequences are driven through `transition`, with the
//! store-mutating effects applied to a real `Session`, and the invariants of
//! the message store are checked after every step.

use super::transition::*;
use super::*;
use crate::llm::LlmErrorKind;
use crate::session::{Role, Session};
use crate::speech::{AudioArtifact, AudioClip, SpeechErrorKind};
use proptest::prelude::*;
use std::path::PathBuf;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context(synthesis: bool, recognition: bool) -> SessionContext {
    SessionContext::new("prop-session")
        .with_synthesis(synthesis)
        .with_recognition(recognition)
}

/// Apply the effects that touch the session; requests are left to the caller
fn apply(session: &mut Session, effects: &[Effect]) -> usize {
    let mut requests = 0;
    for effect in effects {
        match effect {
            Effect::AppendTurn { turn } => session.push_turn(turn.clone()),
            Effect::SetTranslationVisible { turn, visible } => {
                session.set_translation_visible(*turn, *visible);
            }
            Effect::CacheTranslation { turn, text } => {
                session.cache_translation(*turn, text.clone());
            }
            Effect::Notify { notice, turn } => session.push_notice(*notice, *turn),
            Effect::RequestTranslation { .. } => requests += 1,
            Effect::RequestCompletion
            | Effect::RequestSynthesis { .. }
            | Effect::RequestTranscription { .. }
            | Effect::PublishSnapshot => {}
        }
    }
    requests
}

fn audio() -> AudioArtifact {
    AudioArtifact {
        file_name: "reply.wav".to_string(),
        path: PathBuf::from("/tmp/reply.wav"),
        media_type: "audio/wav".to_string(),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_speech_error_kind() -> impl Strategy<Value = SpeechErrorKind> {
    prop_oneof![
        Just(SpeechErrorKind::Connection),
        Just(SpeechErrorKind::ResponseShape),
        Just(SpeechErrorKind::ArtifactMissing),
        Just(SpeechErrorKind::Failed),
    ]
}

fn arb_llm_error_kind() -> impl Strategy<Value = LlmErrorKind> {
    prop_oneof![
        Just(LlmErrorKind::Network),
        Just(LlmErrorKind::RateLimit),
        Just(LlmErrorKind::ServerError),
        Just(LlmErrorKind::Auth),
        Just(LlmErrorKind::MalformedResponse),
    ]
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Zɖƒŋɔɛ ]{1,30}",
        Just(String::new()),
        Just("  \n ".to_string()),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        arb_text().prop_map(|text| Event::UserMessage { text }),
        proptest::collection::vec(any::<u8>(), 0..8).prop_map(|bytes| Event::VoiceClip {
            clip: AudioClip {
                bytes,
                media_type: "audio/webm".to_string(),
            }
        }),
        (0usize..8).prop_map(|turn| Event::ToggleTranslation { turn }),
        arb_text().prop_map(|text| Event::TranscriptReady { text }),
        arb_speech_error_kind().prop_map(|kind| Event::TranscriptionFailed {
            kind,
            message: "asr".to_string(),
        }),
        "[a-zA-Z ]{1,30}".prop_map(|text| Event::CompletionReady { text }),
        arb_llm_error_kind().prop_map(|kind| Event::CompletionFailed {
            kind,
            message: "llm".to_string(),
        }),
        Just(Event::SynthesisReady { audio: audio() }),
        arb_speech_error_kind().prop_map(|kind| Event::SynthesisFailed {
            kind,
            message: "tts".to_string(),
        }),
        ((0usize..8), "[a-zA-Z ]{1,20}")
            .prop_map(|(turn, text)| Event::TranslationReady { turn, text }),
        (0usize..8).prop_map(|turn| Event::TranslationFailed {
            turn,
            message: "translate".to_string(),
        }),
    ]
}

fn arb_state() -> impl Strategy<Value = SessionState> {
    prop_oneof![
        Just(SessionState::Idle),
        Just(SessionState::AwaitingReply),
        Just(SessionState::Transcribing),
        "[a-z ]{1,20}".prop_map(|reply| SessionState::Synthesizing { reply }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Roles strictly alternate: greeting, user, assistant, user, ...
    #[test]
    fn prop_roles_alternate(
        events in proptest::collection::vec(arb_event(), 0..60),
        synthesis in any::<bool>(),
        recognition in any::<bool>(),
    ) {
        let context = test_context(synthesis, recognition);
        let mut session = Session::new("prop-session", "Woezɔ");
        let mut state = SessionState::Idle;

        for event in events {
            if let Ok(result) = transition(&state, &context, &session, event) {
                apply(&mut session, &result.effects);
                state = result.new_state;
            }

            let turns = session.turns();
            prop_assert_eq!(turns[0].role, Role::Assistant);
            for pair in turns.windows(2) {
                prop_assert_ne!(pair[0].role, pair[1].role);
            }
        }
    }

    /// Typed input and clips are only accepted while idle
    #[test]
    fn prop_busy_rejects_input(state in arb_state(), text in "[a-z]{1,10}") {
        prop_assume!(!state.is_idle());
        let mut session = Session::new("prop-session", "Woezɔ");
        session.push_turn(crate::session::Turn::user("pending"));
        let context = test_context(true, true);

        let typed = transition(&state, &context, &session, Event::UserMessage { text });
        prop_assert_eq!(typed.unwrap_err(), TransitionError::Busy);

        let clip = Event::VoiceClip {
            clip: AudioClip { bytes: vec![1], media_type: "audio/webm".to_string() },
        };
        prop_assert_eq!(
            transition(&state, &context, &session, clip).unwrap_err(),
            TransitionError::Busy
        );
    }

    /// Once a translation is cached, toggling never asks for it again
    #[test]
    fn prop_translation_requested_once(toggles in 1usize..12, translation in "[a-zA-Z ]{1,20}") {
        let context = test_context(false, false);
        let mut session = Session::new("prop-session", "Woezɔ");
        let state = SessionState::Idle;
        let mut requests = 0;

        for _ in 0..toggles {
            let toggle = Event::ToggleTranslation { turn: 0 };
            let result = transition(&state, &context, &session, toggle).unwrap();
            let requested = apply(&mut session, &result.effects);
            if requested > 0 {
                let ready = Event::TranslationReady { turn: 0, text: translation.clone() };
                let result = transition(&state, &context, &session, ready).unwrap();
                apply(&mut session, &result.effects);
            }
            requests += requested;
        }

        prop_assert_eq!(requests, 1);
        prop_assert_eq!(session.translation(0).visible, toggles % 2 == 1);
        prop_assert_eq!(session.translation(0).text, Some(translation));
    }

    /// Blank transcripts never reach the message store
    #[test]
    fn prop_blank_transcript_not_appended(padding in "[ \t\n]{0,6}") {
        let context = test_context(true, true);
        let session = Session::new("prop-session", "Woezɔ");

        let result = transition(
            &SessionState::Transcribing,
            &context,
            &session,
            Event::TranscriptReady { text: padding },
        ).unwrap();

        prop_assert_eq!(result.new_state, SessionState::Idle);
        let appended = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::AppendTurn { .. }));
        prop_assert!(!appended);
    }

    /// Every completion outcome yields exactly one assistant turn
    #[test]
    fn prop_one_reply_per_user_turn(
        succeed in any::<bool>(),
        synthesis in any::<bool>(),
        audio_ok in any::<bool>(),
        kind in arb_speech_error_kind(),
    ) {
        let context = test_context(synthesis, false);
        let mut session = Session::new("prop-session", "Woezɔ");

        let message = Event::UserMessage { text: "Ŋdi".to_string() };
        let result = transition(&SessionState::Idle, &context, &session, message).unwrap();
        apply(&mut session, &result.effects);
        let mut state = result.new_state;

        let reply = if succeed {
            Event::CompletionReady { text: "Ŋdi na wò".to_string() }
        } else {
            Event::CompletionFailed { kind: LlmErrorKind::Network, message: "down".to_string() }
        };
        let result = transition(&state, &context, &session, reply).unwrap();
        apply(&mut session, &result.effects);
        state = result.new_state;

        if let SessionState::Synthesizing { .. } = state {
            let outcome = if audio_ok {
                Event::SynthesisReady { audio: audio() }
            } else {
                Event::SynthesisFailed { kind, message: "tts".to_string() }
            };
            let result = transition(&state, &context, &session, outcome).unwrap();
            apply(&mut session, &result.effects);
            state = result.new_state;
        }

        prop_assert!(state.is_idle());
        prop_assert_eq!(session.turns().len(), 3);
        prop_assert_eq!(session.last_role(), Some(Role::Assistant));
    }
}
