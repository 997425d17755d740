//! Speech synthesis and recognition through hosted Gradio Spaces
//!
//! Both directions sit behind [`SpeechService`], a single `submit` capability,
//! so the session runtime never depends on a concrete provider.

mod error;
mod gradio;
mod recognition;
mod synthesis;

pub use error::{SpeechError, SpeechErrorKind};
pub use gradio::GradioClient;
pub use recognition::{GradioRecognizer, RecognitionRequest};
pub use synthesis::{GradioSynthesizer, SynthesisRequest};

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A hosted speech capability: one payload in, one output or a typed failure out
#[async_trait]
pub trait SpeechService: Send + Sync {
    type Payload: Send + 'static;
    type Output: Send + 'static;

    async fn submit(&self, payload: Self::Payload) -> Result<Self::Output, SpeechError>;

    /// Where requests go, for logs
    fn provider(&self) -> &str;
}

/// Text to playable audio
pub type Synthesizer = dyn SpeechService<Payload = SynthesisRequest, Output = AudioArtifact>;

/// Recorded clip to transcript
pub type Recognizer = dyn SpeechService<Payload = RecognitionRequest, Output = String>;

/// Synthesized audio copied into the session's audio directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioArtifact {
    pub file_name: String,
    #[serde(skip)]
    pub path: PathBuf,
    pub media_type: String,
}

/// A voice clip recorded by the browser
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl AudioClip {
    /// Media type without parameters (`audio/webm;codecs=opus` -> `audio/webm`)
    pub fn essence(&self) -> &str {
        self.media_type
            .split(';')
            .next()
            .map_or("application/octet-stream", str::trim)
    }
}

/// Logging wrapper for speech services
pub struct LoggingSpeechService<S> {
    inner: S,
    capability: &'static str,
}

impl<S: SpeechService> LoggingSpeechService<S> {
    pub fn new(inner: S, capability: &'static str) -> Self {
        Self { inner, capability }
    }
}

#[async_trait]
impl<S: SpeechService> SpeechService for LoggingSpeechService<S> {
    type Payload = S::Payload;
    type Output = S::Output;

    async fn submit(&self, payload: Self::Payload) -> Result<Self::Output, SpeechError> {
        let start = std::time::Instant::now();
        let result = self.inner.submit(payload).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    capability = self.capability,
                    provider = %self.inner.provider(),
                    duration_ms = %duration.as_millis(),
                    "Speech request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    capability = self.capability,
                    provider = %self.inner.provider(),
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Speech request failed"
                );
            }
        }

        result
    }

    fn provider(&self) -> &str {
        self.inner.provider()
    }
}

/// Connect to the synthesis Space once for the whole process
pub async fn connect_synthesizer(
    space: &str,
    api_name: &str,
    token: Option<String>,
) -> Result<Arc<Synthesizer>, SpeechError> {
    let client = GradioClient::connect(space, token).await?;
    Ok(Arc::new(LoggingSpeechService::new(
        GradioSynthesizer::new(client, api_name),
        "synthesis",
    )))
}

/// Connect to the recognition Space once for the whole process.
///
/// Voice clips are staged under `staging_dir` while they upload.
pub async fn connect_recognizer(
    space: &str,
    api_name: &str,
    token: Option<String>,
    staging_dir: &Path,
) -> Result<Arc<Recognizer>, SpeechError> {
    let client = GradioClient::connect(space, token).await?;
    Ok(Arc::new(LoggingSpeechService::new(
        GradioRecognizer::new(client, api_name).with_staging_dir(staging_dir),
        "recognition",
    )))
}
