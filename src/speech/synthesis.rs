//! Text-to-speech through a Gradio Space

use super::gradio::{first_output, GradioClient};
use super::{AudioArtifact, SpeechError, SpeechService};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

const DEFAULT_EXTENSION: &str = "wav";

/// Text to synthesize and where the resulting file should live
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub language: String,
    pub speaker: String,
    pub output_dir: PathBuf,
}

pub struct GradioSynthesizer {
    client: GradioClient,
    api_name: String,
}

impl GradioSynthesizer {
    pub fn new(client: GradioClient, api_name: impl Into<String>) -> Self {
        Self {
            client,
            api_name: api_name.into(),
        }
    }
}

#[async_trait]
impl SpeechService for GradioSynthesizer {
    type Payload = SynthesisRequest;
    type Output = AudioArtifact;

    async fn submit(&self, payload: SynthesisRequest) -> Result<AudioArtifact, SpeechError> {
        let result = self
            .client
            .predict(
                &self.api_name,
                vec![
                    json!(payload.text),
                    json!(payload.language),
                    json!(payload.speaker),
                ],
            )
            .await?;

        let output = first_output(&result)
            .ok_or_else(|| SpeechError::response_shape(format!("Empty result: {result}")))?;
        let handle = extract_audio_handle(output).ok_or_else(|| {
            SpeechError::response_shape(format!("Could not extract an audio path from {output}"))
        })?;

        tracing::debug!(handle = %handle, "Resolving synthesized audio");
        let bytes = self.client.fetch_file(&handle).await?;
        store_artifact(&payload.output_dir, &handle, &bytes).await
    }

    fn provider(&self) -> &str {
        self.client.root()
    }
}

/// Pull the audio location out of a synthesis output.
///
/// Spaces have answered with a bare path string, with `{"name": ..}` (older
/// clients) and with Gradio's `FileData` (`url`/`path`). Anything else has no
/// usable handle.
pub fn extract_audio_handle(output: &Value) -> Option<String> {
    let handle = match output {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => ["url", "name", "path"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str)),
        _ => None,
    }?;

    let handle = handle.trim();
    (!handle.is_empty()).then(|| handle.to_string())
}

/// Copy fetched audio into `dir` under a fresh name
async fn store_artifact(
    dir: &Path,
    handle: &str,
    bytes: &[u8],
) -> Result<AudioArtifact, SpeechError> {
    let without_query = handle.split(['?', '#']).next().unwrap_or(handle);
    let extension = Path::new(without_query)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_EXTENSION)
        .to_ascii_lowercase();

    let file_name = format!("{}.{extension}", uuid::Uuid::new_v4());
    let path = dir.join(&file_name);

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SpeechError::failed(format!("Cannot create {}: {e}", dir.display())))?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| SpeechError::failed(format!("Cannot write {}: {e}", path.display())))?;

    let media_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Ok(AudioArtifact {
        file_name,
        path,
        media_type,
    })
}
