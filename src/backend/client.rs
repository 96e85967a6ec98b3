// SPDX-FileCopyrightText: 2026 Questmap contributors
// SPDX-License-Identifier: MIT

use std::fmt;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stream::{StreamAssembler, StreamEvent};
use crate::model::{decode_quest_value, MalformedQuestError, QuestDocument};

/// Default generation backend address.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug)]
pub enum BackendError {
    Http { source: reqwest::Error },
    Status { status: u16, body: String },
    /// The backend reported a generation failure in-stream.
    Backend { message: String },
    /// The stream closed without a terminal quest.
    StreamEndedWithoutQuest,
    MalformedQuest { source: MalformedQuestError },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { source } => write!(f, "backend request failed: {source}"),
            Self::Status { status, body } => {
                write!(f, "backend returned status {status}: {body}")
            }
            Self::Backend { message } => write!(f, "generation failed: {message}"),
            Self::StreamEndedWithoutQuest => {
                write!(f, "generation stream ended without a quest")
            }
            Self::MalformedQuest { source } => {
                write!(f, "generated quest is malformed: {source}")
            }
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http { source } => Some(source),
            Self::MalformedQuest { source } => Some(source),
            Self::Status { .. } | Self::Backend { .. } | Self::StreamEndedWithoutQuest => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub setting: String,
    pub api_key: String,
    pub api_provider: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalModel {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// Models offered by a remote provider, split by pricing tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub free: Vec<String>,
    #[serde(default)]
    pub paid: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValidation {
    pub valid: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct LocalModelsResponse {
    #[serde(default)]
    models: Vec<LocalModel>,
}

#[derive(Debug, Deserialize)]
struct ValidateKeyResponse {
    status: String,
    #[serde(default)]
    message: String,
}

/// HTTP client for the quest generation backend.
#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    base_url: String,
}

impl GenerationClient {
    pub fn new(base_url: &str) -> Self {
        // Generation can sit behind a slow model; give it room.
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a generation and stream progress through `on_progress`.
    ///
    /// The quest arrives on the terminal `done` line; a stream that closes
    /// without one is an error, as is a quest that does not decode.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
        mut on_progress: impl FnMut(&str),
    ) -> Result<QuestDocument, BackendError> {
        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(request)
            .send()
            .await
            .map_err(|source| BackendError::Http { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let mut assembler = StreamAssembler::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|source| BackendError::Http { source })?;
            for event in assembler.push_chunk(&chunk) {
                match event {
                    StreamEvent::Progress { message } => {
                        debug!(%message, "generation progress");
                        on_progress(&message);
                    }
                    StreamEvent::Done { quest } => {
                        return decode_quest_value(&quest)
                            .map_err(|source| BackendError::MalformedQuest { source });
                    }
                    StreamEvent::Error { message } => {
                        return Err(BackendError::Backend { message });
                    }
                }
            }
        }

        for event in assembler.finish() {
            match event {
                StreamEvent::Progress { message } => on_progress(&message),
                StreamEvent::Done { quest } => {
                    return decode_quest_value(&quest)
                        .map_err(|source| BackendError::MalformedQuest { source });
                }
                StreamEvent::Error { message } => {
                    return Err(BackendError::Backend { message });
                }
            }
        }

        Err(BackendError::StreamEndedWithoutQuest)
    }

    pub async fn list_local_models(&self) -> Result<Vec<LocalModel>, BackendError> {
        let response = self
            .client
            .get(format!("{}/api/local_models", self.base_url))
            .send()
            .await
            .map_err(|source| BackendError::Http { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let body: LocalModelsResponse = response
            .json()
            .await
            .map_err(|source| BackendError::Http { source })?;
        Ok(body.models)
    }

    pub async fn list_models(
        &self,
        api_provider: &str,
        api_key: &str,
    ) -> Result<ModelCatalog, BackendError> {
        let response = self
            .client
            .post(format!("{}/api/models", self.base_url))
            .json(&serde_json::json!({
                "api_provider": api_provider,
                "api_key": api_key,
            }))
            .send()
            .await
            .map_err(|source| BackendError::Http { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        response.json().await.map_err(|source| BackendError::Http { source })
    }

    pub async fn validate_api_key(
        &self,
        api_provider: &str,
        api_key: &str,
    ) -> Result<KeyValidation, BackendError> {
        let response = self
            .client
            .post(format!("{}/validate_api_key", self.base_url))
            .json(&serde_json::json!({
                "api_provider": api_provider,
                "api_key": api_key,
            }))
            .send()
            .await
            .map_err(|source| BackendError::Http { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let body: ValidateKeyResponse = response
            .json()
            .await
            .map_err(|source| BackendError::Http { source })?;
        Ok(KeyValidation { valid: body.status == "valid", message: body.message })
    }
}

#[cfg(test)]
mod tests {
    use super::{GenerationClient, LocalModelsResponse, ModelCatalog, ValidateKeyResponse};

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GenerationClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[test]
    fn local_models_response_tolerates_missing_fields() {
        let parsed: LocalModelsResponse =
            serde_json::from_str(r#"{"models":[{"name":"llama3"}]}"#).expect("parse");
        assert_eq!(parsed.models[0].name, "llama3");
        assert_eq!(parsed.models[0].size, 0);

        let empty: LocalModelsResponse = serde_json::from_str("{}").expect("parse");
        assert!(empty.models.is_empty());
    }

    #[test]
    fn model_catalog_defaults_both_tiers() {
        let catalog: ModelCatalog =
            serde_json::from_str(r#"{"free":["m1"]}"#).expect("parse");
        assert_eq!(catalog.free, vec!["m1"]);
        assert!(catalog.paid.is_empty());
    }

    #[test]
    fn key_validation_maps_the_status_string() {
        let ok: ValidateKeyResponse =
            serde_json::from_str(r#"{"status":"valid","message":"API key is valid"}"#)
                .expect("parse");
        assert_eq!(ok.status, "valid");

        let bad: ValidateKeyResponse =
            serde_json::from_str(r#"{"status":"invalid"}"#).expect("parse");
        assert_eq!(bad.status, "invalid");
        assert!(bad.message.is_empty());
    }
}
