//! API request and response types

use serde::{Deserialize, Serialize};

/// Request to send a typed chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response for actions that queue work on a session
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Conversation starters offered on an empty conversation
#[derive(Debug, Serialize)]
pub struct StartersResponse {
    pub starters: Vec<&'static str>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
