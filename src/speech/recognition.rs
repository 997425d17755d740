//! Speech-to-text through a Gradio Space

use super::gradio::{file_data, first_output, GradioClient};
use super::{AudioClip, SpeechError, SpeechService};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub clip: AudioClip,
    pub language: String,
}

pub struct GradioRecognizer {
    client: GradioClient,
    api_name: String,
    staging_dir: PathBuf,
}

impl GradioRecognizer {
    pub fn new(client: GradioClient, api_name: impl Into<String>) -> Self {
        Self {
            client,
            api_name: api_name.into(),
            staging_dir: std::env::temp_dir(),
        }
    }

    /// Stage clips under `dir` instead of the system temp directory
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }
}

#[async_trait]
impl SpeechService for GradioRecognizer {
    type Payload = RecognitionRequest;
    type Output = String;

    async fn submit(&self, payload: RecognitionRequest) -> Result<String, SpeechError> {
        // Removed when `staged` drops, on every return path below.
        let staged = stage_clip(&payload.clip, &self.staging_dir)?;

        let server_path = self
            .client
            .upload(staged.path(), payload.clip.essence())
            .await?;
        let result = self
            .client
            .predict(
                &self.api_name,
                vec![file_data(&server_path), json!(payload.language)],
            )
            .await?;

        first_output(&result)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SpeechError::response_shape(format!("No transcript in {result}")))
    }

    fn provider(&self) -> &str {
        self.client.root()
    }
}

/// Write the clip to a named temporary file with a matching extension
fn stage_clip(clip: &AudioClip, dir: &Path) -> Result<NamedTempFile, SpeechError> {
    let extension = mime_guess::get_mime_extensions_str(clip.essence())
        .and_then(|extensions| extensions.first())
        .copied()
        .unwrap_or("wav");

    let mut file = tempfile::Builder::new()
        .prefix("woezor-clip-")
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)
        .map_err(|e| SpeechError::failed(format!("Cannot create temporary clip: {e}")))?;

    file.write_all(&clip.bytes)
        .and_then(|()| file.flush())
        .map_err(|e| SpeechError::failed(format!("Cannot write temporary clip: {e}")))?;

    Ok(file)
}
