//! In-memory session: the message store and its per-turn UI flags
//!
//! A session is owned by exactly one runtime task. Turns are only ever
//! appended; translation flags and notices are the only other mutable parts.

use crate::locale::{Notice, Severity};
use crate::speech::AudioArtifact;
use crate::state_machine::SessionState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One message exchanged in the conversation
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub audio: Option<AudioArtifact>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            audio: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, audio: Option<AudioArtifact>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            audio,
            created_at: Utc::now(),
        }
    }

    /// Only real assistant replies can be translated
    pub fn is_translatable(&self) -> bool {
        self.role == Role::Assistant && !Notice::is_failure_text(&self.content)
    }
}

/// Translation toggle state for one turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranslationView {
    pub visible: bool,
    /// Cached translation, fetched at most once per turn
    pub text: Option<String>,
}

/// A notice recorded in the session, optionally attached to a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionNotice {
    pub notice: Notice,
    pub severity: Severity,
    pub text: &'static str,
    pub turn: Option<usize>,
}

impl SessionNotice {
    pub fn new(notice: Notice, turn: Option<usize>) -> Self {
        Self {
            notice,
            severity: notice.severity(),
            text: notice.text(),
            turn,
        }
    }
}

/// Which optional upstream services this session can use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub synthesis: bool,
    pub recognition: bool,
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    turns: Vec<Turn>,
    translations: HashMap<usize, TranslationView>,
    notices: Vec<SessionNotice>,
}

impl Session {
    /// Create a session seeded with the assistant's greeting
    pub fn new(id: impl Into<String>, greeting: &str) -> Self {
        Self {
            id: id.into(),
            turns: vec![Turn::assistant(greeting, None)],
            translations: HashMap::new(),
            notices: Vec::new(),
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    pub fn last_role(&self) -> Option<Role> {
        self.turns.last().map(|t| t.role)
    }

    /// Index the next appended turn will occupy
    pub fn next_index(&self) -> usize {
        self.turns.len()
    }

    pub fn translation(&self, index: usize) -> TranslationView {
        self.translations.get(&index).cloned().unwrap_or_default()
    }

    pub fn notices(&self) -> &[SessionNotice] {
        &self.notices
    }

    pub(crate) fn push_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub(crate) fn set_translation_visible(&mut self, index: usize, visible: bool) {
        self.translations.entry(index).or_default().visible = visible;
    }

    pub(crate) fn cache_translation(&mut self, index: usize, text: String) {
        self.translations.entry(index).or_default().text = Some(text);
    }

    pub(crate) fn push_notice(&mut self, notice: Notice, turn: Option<usize>) {
        self.notices.push(SessionNotice::new(notice, turn));
    }

    /// Immutable view handed to the presentation layer
    pub fn snapshot(&self, state: &SessionState, capabilities: Capabilities) -> SessionSnapshot {
        let turns = self
            .turns
            .iter()
            .enumerate()
            .map(|(index, turn)| TurnView {
                index,
                turn: turn.clone(),
                translatable: turn.is_translatable(),
                translation: self.translation(index),
            })
            .collect();

        SessionSnapshot {
            id: self.id.clone(),
            state: state.clone(),
            busy: !state.is_idle(),
            capabilities,
            turns,
            notices: self.notices.clone(),
        }
    }
}

/// A turn as rendered, with its index and translation flags
#[derive(Debug, Clone, Serialize)]
pub struct TurnView {
    pub index: usize,
    #[serde(flatten)]
    pub turn: Turn,
    pub translatable: bool,
    pub translation: TranslationView,
}

/// Immutable copy of a session published after every controller step
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub state: SessionState,
    pub busy: bool,
    pub capabilities: Capabilities,
    pub turns: Vec<TurnView>,
    pub notices: Vec<SessionNotice>,
}
