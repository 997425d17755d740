//! HTTP API for the chat page
//!
//! JSON endpoints for session control, an SSE stream of snapshots, the
//! synthesized audio files and the embedded page itself.

mod assets;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::{Services, SessionManager, SessionSettings};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<SessionManager>,
}

impl AppState {
    pub fn new(services: Services, settings: SessionSettings) -> Self {
        Self {
            runtime: Arc::new(SessionManager::new(services, settings)),
        }
    }
}
