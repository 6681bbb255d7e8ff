use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::FutureExt;
use futures::future::BoxFuture;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use shared::{RawResponse, ToolTrace, WebSource};
use std::time::Duration;

use super::{MediaPayload, ModelClient, ModelInvocationError};
use crate::config::ModelConfig;

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    model_id: String,
    api_key: String,
    web_search: bool,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    web_search_queries: Vec<String>,
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

impl GenerateContentResponse {
    fn into_raw_response(self) -> Result<RawResponse, ModelInvocationError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(ModelInvocationError::EmptyResponse)?;

        let text: String = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        let trace = candidate.grounding_metadata.map(|metadata| ToolTrace {
            search_queries: metadata.web_search_queries,
            sources: metadata
                .grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .map(|web| WebSource {
                    title: web.title,
                    uri: web.uri,
                })
                .collect(),
        });
        let tool_activity_signal = trace
            .as_ref()
            .is_some_and(|trace| !trace.search_queries.is_empty());

        Ok(RawResponse {
            text,
            tool_activity_signal,
            trace,
        })
    }
}

impl GeminiClient {
    /// Reads the credential from the environment variable named in `config`.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ModelInvocationError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ModelInvocationError::MissingCredential(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &ModelConfig, api_key: String) -> Result<Self, ModelInvocationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model_id: config.id.clone(),
            api_key,
            web_search: config.web_search,
        })
    }

    fn request_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model_id)
    }

    fn build_request(&self, instruction: &str, mime_type: &str, media: &[u8]) -> GenerateContentRequest {
        let tools = if self.web_search {
            vec![Tool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".into()),
                parts: vec![
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: STANDARD.encode(media),
                        }),
                    },
                    Part {
                        text: Some(instruction.to_string()),
                        inline_data: None,
                    },
                ],
            }],
            tools,
        }
    }

    async fn call(&self, instruction: &str, media: &MediaPayload) -> Result<RawResponse, ModelInvocationError> {
        let bytes = tokio::fs::read(&media.path).await?;
        info!(
            "Calling model {} with {} {} bytes ({})",
            self.model_id,
            bytes.len(),
            media.kind,
            media.mime_type
        );

        let body = self.build_request(instruction, &media.mime_type, &bytes);
        let response = self
            .http
            .post(self.request_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelInvocationError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let payload: GenerateContentResponse = response.json().await?;
        let raw = payload.into_raw_response()?;
        debug!(
            "Model returned {} bytes of text, tool trace present: {}",
            raw.text.len(),
            raw.trace.is_some()
        );
        Ok(raw)
    }
}

impl ModelClient for GeminiClient {
    fn generate<'a>(
        &'a self,
        instruction: &'a str,
        media: &'a MediaPayload,
    ) -> BoxFuture<'a, Result<RawResponse, ModelInvocationError>> {
        self.call(instruction, media).boxed()
    }
}
