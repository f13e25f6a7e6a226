//! Gemini File Search backend over REST
//!
//! Endpoints used (all relative to the configured base URL):
//!
//! | Capability | Request |
//! |------------|---------|
//! | create store | `POST /v1beta/fileSearchStores` |
//! | upload | `POST /upload/v1beta/{store}:uploadToFileSearchStore?uploadType=media` |
//! | wait | `GET /v1beta/{operation}` until `done` |
//! | query | `POST /v1beta/models/{model}:generateContent` with the `fileSearch` tool |

use crate::backend::{
    BackendError, IndexingBackend, OperationHandle, QueryAnswer, Source, WaitPolicy,
};
use crate::config::BackendConfig;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Filename used when a grounding chunk has neither title nor URI
const UNKNOWN_SOURCE: &str = "unknown";

/// Gemini File Search client
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    wait_policy: WaitPolicy,
}

impl GeminiBackend {
    pub fn new(client: Client, config: &BackendConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            wait_policy: WaitPolicy {
                poll_interval: Duration::from_secs(config.poll_interval_secs),
                max_wait: Duration::from_secs(config.max_operation_wait_secs),
            },
        }
    }

    /// Builds a backend reading the API key from `config.api_key_env`
    pub fn from_env(client: Client, config: &BackendConfig) -> Result<Self, BackendError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BackendError::MissingApiKey(config.api_key_env.clone()))?;
        Ok(Self::new(client, config, api_key))
    }

    pub fn with_wait_policy(mut self, wait_policy: WaitPolicy) -> Self {
        self.wait_policy = wait_policy;
        self
    }

    async fn get_operation(&self, name: &str) -> Result<OperationResponse, BackendError> {
        let response = self
            .client
            .get(format!("{}/v1beta/{}", self.base_url, name))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        Ok(check_status(response).await?.json().await?)
    }

    async fn upload_one(
        &self,
        store_id: &str,
        path: &Path,
    ) -> Result<OperationHandle, BackendError> {
        let body = tokio::fs::read(path).await.map_err(|e| BackendError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let response = self
            .client
            .post(format!(
                "{}/upload/v1beta/{}:uploadToFileSearchStore",
                self.base_url, store_id
            ))
            .query(&[("uploadType", "media")])
            .header(API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, mime_type_for(path))
            .body(body)
            .send()
            .await?;

        let operation: OperationResponse = check_status(response).await?.json().await?;
        Ok(OperationHandle(operation.name))
    }
}

#[async_trait]
impl IndexingBackend for GeminiBackend {
    async fn create_store(&self, display_name: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(format!("{}/v1beta/fileSearchStores", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "displayName": display_name }))
            .send()
            .await?;

        let store: StoreResponse = check_status(response).await?.json().await?;
        tracing::info!(store = %store.name, "Created file search store");
        Ok(store.name)
    }

    async fn upload(
        &self,
        store_id: &str,
        paths: &[PathBuf],
    ) -> Result<Vec<OperationHandle>, BackendError> {
        let mut handles = Vec::with_capacity(paths.len());
        for path in paths {
            match self.upload_one(store_id, path).await {
                Ok(handle) => {
                    tracing::info!(
                        store = store_id,
                        operation = %handle,
                        "Upload started for {}",
                        path.display()
                    );
                    handles.push(handle);
                }
                Err(e) => {
                    tracing::error!(store = store_id, "Upload failed for {}: {}", path.display(), e);
                }
            }
        }
        Ok(handles)
    }

    async fn wait(&self, handle: &OperationHandle) -> Result<(), BackendError> {
        let started = Instant::now();
        loop {
            let operation = self.get_operation(handle.as_str()).await?;

            if let Some(error) = operation.error {
                return Err(BackendError::OperationFailed {
                    operation: handle.to_string(),
                    message: error.message.unwrap_or_else(|| format!("code {}", error.code)),
                });
            }

            if operation.done {
                tracing::debug!(operation = %handle, "Operation done");
                return Ok(());
            }

            if started.elapsed() + self.wait_policy.poll_interval > self.wait_policy.max_wait {
                return Err(BackendError::Timeout {
                    operation: handle.to_string(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            tokio::time::sleep(self.wait_policy.poll_interval).await;
        }
    }

    async fn query(
        &self,
        store_id: &str,
        text: &str,
        system_instruction: &str,
    ) -> Result<QueryAnswer, BackendError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": text }] }],
            "systemInstruction": { "parts": [{ "text": system_instruction }] },
            "tools": [{ "fileSearch": { "fileSearchStoreNames": [store_id] } }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            },
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let generated: GenerateResponse = check_status(response).await?.json().await?;
        Ok(answer_from(generated))
    }
}

async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .unwrap_or(body);

    Err(BackendError::Api {
        status: status.as_u16(),
        message,
    })
}

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Joins the first candidate's text parts and collects its grounding sources
fn answer_from(response: GenerateResponse) -> QueryAnswer {
    let Some(candidate) = response.candidates.into_iter().next() else {
        tracing::info!("Response has no candidates");
        return QueryAnswer {
            answer: String::new(),
            sources: Vec::new(),
        };
    };

    let answer = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let chunks = candidate
        .grounding_metadata
        .map(|metadata| metadata.grounding_chunks)
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut sources = Vec::new();
    for context in chunks.into_iter().filter_map(|chunk| chunk.retrieved_context) {
        let filename = context
            .title
            .filter(|t| !t.is_empty())
            .or(context.uri.filter(|u| !u.is_empty()))
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string());

        if seen.insert(filename.clone()) {
            sources.push(Source {
                filename,
                page: None,
                snippet: context.text.unwrap_or_default(),
            });
        }
    }

    QueryAnswer { answer, sources }
}

#[derive(Debug, Deserialize)]
struct StoreResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingChunk {
    #[serde(default)]
    retrieved_context: Option<RetrievedContext>,
}

#[derive(Debug, Deserialize)]
struct RetrievedContext {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    text: Option<String>,
}
