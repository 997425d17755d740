//! Session runtime executor
//!
//! One task per session. Events arrive on an mpsc queue; each is run through
//! the pure transition function and the resulting effects are executed inline,
//! so upstream calls for a session are strictly sequential.

use super::{Services, SessionSettings, SseEvent};
use crate::prompts::completion_request;
use crate::session::{Capabilities, Session, SessionSnapshot};
use crate::speech::{RecognitionRequest, SpeechError, SynthesisRequest};
use crate::state_machine::{transition, Effect, Event, SessionContext, SessionState};
use crate::translation::translate;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

pub struct SessionRuntime {
    context: SessionContext,
    state: SessionState,
    session: Session,
    services: Services,
    settings: Arc<SessionSettings>,
    audio_dir: PathBuf,
    event_rx: mpsc::Receiver<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionRuntime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context: SessionContext,
        session: Session,
        services: Services,
        settings: Arc<SessionSettings>,
        audio_dir: PathBuf,
        event_rx: mpsc::Receiver<Event>,
        broadcast_tx: broadcast::Sender<SseEvent>,
        snapshot_tx: watch::Sender<SessionSnapshot>,
    ) -> Self {
        Self {
            context,
            state: SessionState::Idle,
            session,
            services,
            settings,
            audio_dir,
            event_rx,
            broadcast_tx,
            snapshot_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.context.session_id, "Starting session runtime");

        while let Some(event) = self.event_rx.recv().await {
            if let Err(e) = self.process_event(event).await {
                tracing::warn!(session_id = %self.context.session_id, error = %e, "Event rejected");
            }
        }

        self.remove_audio_dir().await;
        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), String> {
        // Effects may generate follow-up events; drain them before the next queued event
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let result = match transition(&self.state, &self.context, &self.session, current_event)
            {
                Ok(r) => r,
                Err(e) => {
                    // Transition errors are user-facing (e.g. "busy")
                    let _ = self.broadcast_tx.send(SseEvent::Error {
                        message: e.to_string(),
                    });
                    return Err(e.to_string());
                }
            };

            if result.new_state != self.state {
                tracing::debug!(
                    session_id = %self.context.session_id,
                    from = self.state.name(),
                    to = result.new_state.name(),
                    "State change"
                );
            }
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(())
    }

    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AppendTurn { turn } => {
                self.session.push_turn(turn);
                None
            }

            Effect::RequestCompletion => {
                let request = completion_request(self.session.turns(), &self.settings.persona);
                match self.services.llm.complete(&request).await {
                    Ok(response) => Some(Event::CompletionReady {
                        text: response.text,
                    }),
                    Err(e) => Some(Event::CompletionFailed {
                        kind: e.kind,
                        message: e.message,
                    }),
                }
            }

            Effect::RequestSynthesis { text } => {
                let request = SynthesisRequest {
                    text,
                    language: self.settings.language.clone(),
                    speaker: self.settings.speaker.clone(),
                    output_dir: self.audio_dir.clone(),
                };
                let outcome = match &self.services.synthesizer {
                    Some(synthesizer) => synthesizer.submit(request).await,
                    None => Err(SpeechError::connection("Synthesis is not available")),
                };
                match outcome {
                    Ok(audio) => Some(Event::SynthesisReady { audio }),
                    Err(e) => Some(Event::SynthesisFailed {
                        kind: e.kind,
                        message: e.message,
                    }),
                }
            }

            Effect::RequestTranscription { clip } => {
                let request = RecognitionRequest {
                    clip,
                    language: self.settings.language.clone(),
                };
                let outcome = match &self.services.recognizer {
                    Some(recognizer) => recognizer.submit(request).await,
                    None => Err(SpeechError::connection("Recognition is not available")),
                };
                match outcome {
                    Ok(text) => Some(Event::TranscriptReady { text }),
                    Err(e) => Some(Event::TranscriptionFailed {
                        kind: e.kind,
                        message: e.message,
                    }),
                }
            }

            Effect::RequestTranslation { turn, text } => {
                match translate(&text, &self.settings.persona, self.services.llm.as_ref()).await {
                    Ok(text) => Some(Event::TranslationReady { turn, text }),
                    Err(e) => {
                        tracing::error!(
                            session_id = %self.context.session_id,
                            turn,
                            kind = ?e.kind,
                            error = %e.message,
                            "Translation failed"
                        );
                        Some(Event::TranslationFailed {
                            turn,
                            message: e.message,
                        })
                    }
                }
            }

            Effect::SetTranslationVisible { turn, visible } => {
                self.session.set_translation_visible(turn, visible);
                None
            }

            Effect::CacheTranslation { turn, text } => {
                self.session.cache_translation(turn, text);
                None
            }

            Effect::Notify { notice, turn } => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    notice = ?notice,
                    turn = ?turn,
                    "Notice recorded"
                );
                self.session.push_notice(notice, turn);
                None
            }

            Effect::PublishSnapshot => {
                let snapshot = self.snapshot();
                self.snapshot_tx.send_replace(snapshot.clone());
                let _ = self.broadcast_tx.send(SseEvent::Snapshot(Box::new(snapshot)));
                None
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot(
            &self.state,
            Capabilities {
                synthesis: self.context.synthesis_available,
                recognition: self.context.recognition_available,
            },
        )
    }

    async fn remove_audio_dir(&self) {
        match tokio::fs::remove_dir_all(&self.audio_dir).await {
            Ok(()) => {
                tracing::debug!(dir = %self.audio_dir.display(), "Removed session audio");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    dir = %self.audio_dir.display(),
                    error = %e,
                    "Failed to remove session audio"
                );
            }
        }
    }
}
