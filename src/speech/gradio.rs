//! Minimal client for the Gradio HTTP API
//!
//! A prediction is a two-step exchange: `POST {prefix}/call/{api}` queues the
//! job and returns an event id, then `GET {prefix}/call/{api}/{event_id}`
//! streams server-sent events until `complete` or `error`.

use super::SpeechError;
use reqwest::{multipart, Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

pub struct GradioClient {
    http: Client,
    root: String,
    api_prefix: String,
    token: Option<String>,
}

impl GradioClient {
    /// Resolve the Space and read its config.
    ///
    /// This is the initialisation step: a failure here marks the capability
    /// unavailable for the lifetime of the process.
    pub async fn connect(space: &str, token: Option<String>) -> Result<Self, SpeechError> {
        let http = Client::builder()
            .build()
            .map_err(|e| SpeechError::connection(format!("Failed to create HTTP client: {e}")))?;

        let mut client = Self {
            http,
            root: space_root(space),
            api_prefix: String::new(),
            token,
        };

        let config_url = format!("{}/config", client.root);
        let response = client.get(&config_url).send().await.map_err(|e| {
            SpeechError::connection(format!("Cannot reach {}: {e}", client.root))
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SpeechError::connection(format!(
                "{config_url} answered HTTP {status}"
            )));
        }

        let config: SpaceConfig = response
            .json()
            .await
            .map_err(|e| SpeechError::connection(format!("Unreadable Space config: {e}")))?;
        client.api_prefix = config
            .api_prefix
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();

        tracing::info!(
            root = %client.root,
            api_prefix = %client.api_prefix,
            version = config.version.as_deref().unwrap_or("unknown"),
            "Connected to Gradio Space"
        );

        Ok(client)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{path}", self.root, self.api_prefix)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.authorize(self.http.get(url))
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.authorize(self.http.post(url))
    }

    /// Run a named endpoint and return its output array
    pub async fn predict(&self, api_name: &str, data: Vec<Value>) -> Result<Value, SpeechError> {
        let call_url = self.url(&format!("/call/{}", api_name.trim_start_matches('/')));

        let response = self
            .post(&call_url)
            .json(&json!({ "data": data }))
            .send()
            .await?;
        let response = check_status(response, &call_url).await?;
        let queued: QueuedCall = response.json().await.map_err(|e| {
            SpeechError::response_shape(format!("No event id in call response: {e}"))
        })?;

        let result_url = format!("{call_url}/{}", queued.event_id);
        let response = self.get(&result_url).send().await?;
        let response = check_status(response, &result_url).await?;
        let body = response.text().await?;

        parse_event_stream(&body)
    }

    /// Upload a local file; returns the server-side path to reference it by
    pub async fn upload(&self, path: &Path, media_type: &str) -> Result<String, SpeechError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| SpeechError::failed(format!("Cannot read {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "clip".to_string(), |n| n.to_string_lossy().into_owned());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(media_type)
            .map_err(|e| SpeechError::failed(format!("Invalid media type {media_type}: {e}")))?;
        let form = multipart::Form::new().part("files", part);

        let upload_url = self.url("/upload");
        let response = self.post(&upload_url).multipart(form).send().await?;
        let response = check_status(response, &upload_url).await?;
        let paths: Vec<String> = response
            .json()
            .await
            .map_err(|e| SpeechError::response_shape(format!("Unexpected upload response: {e}")))?;

        paths
            .into_iter()
            .next()
            .ok_or_else(|| SpeechError::response_shape("Upload returned no path"))
    }

    /// Fetch the bytes behind a handle returned by a prediction.
    ///
    /// The handle is either an absolute URL or a path on the Space server,
    /// read through `{prefix}/file=`. Handles are never read from this host.
    pub async fn fetch_file(&self, handle: &str) -> Result<Vec<u8>, SpeechError> {
        if handle.starts_with("http://") || handle.starts_with("https://") {
            return self.download(handle).await;
        }
        let url = self.file_url(handle)?;
        self.download(url.as_str()).await
    }

    /// `{prefix}/file={handle}` with every path segment percent-encoded
    fn file_url(&self, handle: &str) -> Result<Url, SpeechError> {
        let mut url = Url::parse(&self.url("")).map_err(|e| {
            SpeechError::connection(format!("Invalid Space URL {}: {e}", self.root))
        })?;
        let mut segments = handle.split('/');
        let first = segments.next().unwrap_or_default();
        url.path_segments_mut()
            .map_err(|()| SpeechError::connection(format!("{} cannot carry a path", self.root)))?
            .pop_if_empty()
            .push(&format!("file={first}"))
            .extend(segments);
        Ok(url)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, SpeechError> {
        let response = self.get(url).send().await?;
        let status = response.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Err(SpeechError::artifact_missing(format!(
                "No file at {url} (HTTP {status})"
            )));
        }
        let response = check_status(response, url).await?;
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(SpeechError::artifact_missing(format!("Empty file at {url}")));
        }
        Ok(bytes.to_vec())
    }
}

async fn check_status(
    response: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, SpeechError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SpeechError::connection(format!(
        "HTTP {status} from {url}: {body}"
    )))
}

/// `owner/name` becomes `https://owner-name.hf.space`; URLs pass through
pub fn space_root(space: &str) -> String {
    let space = space.trim();
    if space.starts_with("http://") || space.starts_with("https://") {
        return space.trim_end_matches('/').to_string();
    }
    format!(
        "https://{}.hf.space",
        space.to_lowercase().replace(['/', '.', '_'], "-")
    )
}

/// Reference an uploaded file as a prediction input
pub fn file_data(server_path: &str) -> Value {
    json!({
        "path": server_path,
        "meta": { "_type": "gradio.FileData" }
    })
}

/// First element of a prediction's output array
pub fn first_output(result: &Value) -> Option<&Value> {
    result.as_array().and_then(|outputs| outputs.first())
}

/// Read a prediction's server-sent event stream to its terminal event
pub fn parse_event_stream(body: &str) -> Result<Value, SpeechError> {
    let mut event = "";
    for line in body.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
            continue;
        }
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        match event {
            "complete" => {
                return serde_json::from_str(data).map_err(|e| {
                    SpeechError::response_shape(format!("Unparsable result {data}: {e}"))
                });
            }
            "error" => {
                return Err(SpeechError::failed(format!("Prediction failed: {data}")));
            }
            _ => {}
        }
    }
    Err(SpeechError::response_shape(
        "Event stream ended without a result",
    ))
}

#[derive(Debug, Deserialize)]
struct SpaceConfig {
    version: Option<String>,
    api_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueuedCall {
    event_id: String,
}
