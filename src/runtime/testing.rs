//! Mock implementations for testing
//!
//! These mocks enable runtime and API tests without real upstream services.

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use crate::speech::{
    AudioArtifact, RecognitionRequest, SpeechError, SpeechService, SynthesisRequest,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

// ============================================================================
// Mock LLM Service
// ============================================================================

/// Mock LLM service that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response with the given text
    pub fn queue_text(&self, text: &str) {
        self.responses.lock().unwrap().push_back(Ok(LlmResponse {
            text: text.to_string(),
            finish_reason: Some("STOP".to_string()),
            usage: Usage::default(),
        }));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockLlmService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Mock Speech Services
// ============================================================================

/// Mock speech service that returns queued outputs and records payloads
pub struct MockSpeechService<P, O> {
    outputs: Mutex<VecDeque<Result<O, SpeechError>>>,
    payloads: Mutex<Vec<P>>,
}

pub type MockSynthesizer = MockSpeechService<SynthesisRequest, AudioArtifact>;
pub type MockRecognizer = MockSpeechService<RecognitionRequest, String>;

impl<P: Clone, O> MockSpeechService<P, O> {
    pub fn new() -> Self {
        Self {
            outputs: Mutex::new(VecDeque::new()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_output(&self, output: O) {
        self.outputs.lock().unwrap().push_back(Ok(output));
    }

    pub fn queue_error(&self, error: SpeechError) {
        self.outputs.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_payloads(&self) -> Vec<P> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }
}

impl<P: Clone, O> Default for MockSpeechService<P, O> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P, O> SpeechService for MockSpeechService<P, O>
where
    P: Clone + Send + 'static,
    O: Send + 'static,
{
    type Payload = P;
    type Output = O;

    async fn submit(&self, payload: P) -> Result<O, SpeechError> {
        self.payloads.lock().unwrap().push(payload);
        self.outputs
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SpeechError::connection("No mock output queued")))
    }

    fn provider(&self) -> &str {
        "mock-space"
    }
}

/// An artifact as the synthesizer would have written it into `dir`
pub fn audio_in(dir: &std::path::Path, file_name: &str) -> AudioArtifact {
    let path = dir.join(file_name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, b"RIFF fake wav").unwrap();
    AudioArtifact {
        file_name: file_name.to_string(),
        path,
        media_type: "audio/wav".to_string(),
    }
}
