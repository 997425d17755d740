//! Runtime for executing sessions
//!
//! [`SessionManager`] owns the process-wide service handles and one
//! [`SessionRuntime`] task per live session.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::llm::LlmService;
use crate::locale::Notice;
use crate::prompts::{Persona, GREETING};
use crate::session::{Capabilities, Session, SessionSnapshot};
use crate::speech::{Recognizer, Synthesizer};
use crate::state_machine::{Event, SessionContext, SessionState};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, RwLock};

/// Upper bound on how often idle sessions are looked for
const MAX_REAP_INTERVAL: Duration = Duration::from_secs(60);

/// Upstream services shared by every session
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LlmService>,
    /// `None` when the synthesis Space could not be reached at startup
    pub synthesizer: Option<Arc<Synthesizer>>,
    /// `None` when voice input is not configured or unreachable
    pub recognizer: Option<Arc<Recognizer>>,
}

/// Settings applied to every session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub persona: Persona,
    pub language: String,
    pub speaker: String,
    /// Each session writes its audio under `audio_root/<session id>`
    pub audio_root: PathBuf,
    pub idle_limit: Duration,
}

/// Events sent to SSE clients
#[derive(Debug, Clone)]
pub enum SseEvent {
    Snapshot(Box<SessionSnapshot>),
    Error { message: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("A reply is still being prepared, please wait")]
    Busy,
    #[error("Session {0} has stopped")]
    Closed(String),
}

/// Handle to interact with a running session
struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SseEvent>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    last_active: Instant,
}

/// Manager for all session runtimes
pub struct SessionManager {
    services: Services,
    settings: Arc<SessionSettings>,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(services: Services, settings: SessionSettings) -> Self {
        Self {
            services,
            settings: Arc::new(settings),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session and return its first snapshot
    pub async fn create(&self) -> SessionSnapshot {
        let id = uuid::Uuid::new_v4().to_string();
        let context = SessionContext::new(&id)
            .with_synthesis(self.services.synthesizer.is_some())
            .with_recognition(self.services.recognizer.is_some());

        let mut session = Session::new(&id, GREETING);
        if !context.synthesis_available {
            session.push_notice(Notice::TtsConnectionFailed, None);
        }

        let state = SessionState::Idle;
        let snapshot = session.snapshot(
            &state,
            Capabilities {
                synthesis: context.synthesis_available,
                recognition: context.recognition_available,
            },
        );

        let (event_tx, event_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot.clone());

        let runtime = SessionRuntime::new(
            context,
            session,
            self.services.clone(),
            Arc::clone(&self.settings),
            self.audio_dir(&id),
            event_rx,
            broadcast_tx.clone(),
            snapshot_tx,
        );
        tokio::spawn(runtime.run());

        self.sessions.write().await.insert(
            id.clone(),
            SessionHandle {
                event_tx,
                broadcast_tx,
                snapshot_rx,
                last_active: Instant::now(),
            },
        );

        tracing::info!(session_id = %id, "Session created");
        snapshot
    }

    /// Queue an event for a session.
    ///
    /// New input is refused up front while the session is working, so the
    /// caller learns about it synchronously.
    pub async fn send_event(&self, id: &str, event: Event) -> Result<(), RuntimeError> {
        let event_tx = {
            let mut sessions = self.sessions.write().await;
            let handle = sessions
                .get_mut(id)
                .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;

            let is_input = matches!(event, Event::UserMessage { .. } | Event::VoiceClip { .. });
            if is_input && handle.snapshot_rx.borrow().busy {
                return Err(RuntimeError::Busy);
            }
            handle.last_active = Instant::now();
            handle.event_tx.clone()
        };

        event_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::Closed(id.to_string()))
    }

    /// Latest snapshot plus a receiver for everything after it
    pub async fn subscribe(
        &self,
        id: &str,
    ) -> Result<(SessionSnapshot, broadcast::Receiver<SseEvent>), RuntimeError> {
        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .get_mut(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        handle.last_active = Instant::now();

        // Subscribe before reading so nothing published in between is lost
        let rx = handle.broadcast_tx.subscribe();
        let snapshot = handle.snapshot_rx.borrow().clone();
        Ok((snapshot, rx))
    }

    pub async fn snapshot(&self, id: &str) -> Result<SessionSnapshot, RuntimeError> {
        let sessions = self.sessions.read().await;
        let handle = sessions
            .get(id)
            .ok_or_else(|| RuntimeError::NotFound(id.to_string()))?;
        let snapshot = handle.snapshot_rx.borrow().clone();
        Ok(snapshot)
    }

    /// Drop a session; its task stops and deletes its audio directory
    pub async fn end(&self, id: &str) -> Result<(), RuntimeError> {
        if self.sessions.write().await.remove(id).is_none() {
            return Err(RuntimeError::NotFound(id.to_string()));
        }
        tracing::info!(session_id = %id, "Session ended");
        Ok(())
    }

    /// Where a session's synthesized audio lives
    pub fn audio_dir(&self, id: &str) -> PathBuf {
        self.settings.audio_root.join(id)
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// End every session idle for longer than the limit; returns the ids ended
    pub async fn reap_idle(&self) -> Vec<String> {
        let limit = self.settings.idle_limit;
        let mut sessions = self.sessions.write().await;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, handle)| handle.last_active.elapsed() > limit)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
            tracing::info!(session_id = %id, "Idle session expired");
        }
        expired
    }

    /// Start the background task that expires idle sessions.
    /// Stops once the manager is dropped.
    pub fn start_reaper(self: &Arc<Self>) {
        let manager: Weak<Self> = Arc::downgrade(self);
        let period = (self.settings.idle_limit / 4)
            .clamp(Duration::from_secs(1), MAX_REAP_INTERVAL);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.reap_idle().await;
            }
            tracing::debug!("Session reaper stopped");
        });
    }
}
