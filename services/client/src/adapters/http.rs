//! services/client/src/adapters/http.rs
//!
//! This module contains the adapter for the quest API over HTTP.
//! It implements the `QuestSource` and `SubmissionChannel` ports from the `core` crate.

use crate::config::{Config, ConfigError};
use adhd_game_core::{
    CompletionRequest, CompletionResponse, DungeonId, PortError, PortResult, Quest, QuestId,
    QuestSource, SubmissionChannel, SubmissionError, SubmissionResult, UserContext,
};
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Response, StatusCode, Url};
use tracing::{debug, warn};

/// Header carrying the opaque user identifier on every call.
pub const USER_ID_HEADER: &str = "X-User-ID";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the quest ports against the REST API.
#[derive(Clone)]
pub struct HttpApiAdapter {
    client: Client,
    base: Url,
}

impl HttpApiAdapter {
    /// Creates a new `HttpApiAdapter` rooted at `base_url` (e.g. `http://host/api/v1`).
    pub fn new(client: Client, base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidValue("QUEST_API_BASE_URL".to_string(), reason);
        let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(invalid(format!("'{}' cannot be used as a base URL", base_url)));
        }
        Ok(Self { client, base })
    }

    /// Builds the adapter with its own client, using the configured timeout.
    pub fn from_config(config: &Config) -> Result<Self, crate::error::ClientError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::new(client, &config.api_base_url)?)
    }

    // Path segments are percent-encoded by `Url`.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

// The body of an error response, trimmed; falls back to the status reason.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body.to_string()
    }
}

//=========================================================================================
// `QuestSource` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuestSource for HttpApiAdapter {
    async fn list_quests(&self, user: &UserContext, dungeon_id: &DungeonId) -> PortResult<Vec<Quest>> {
        let url = self.endpoint(&["dungeons", &dungeon_id.0, "quests"]);
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_ID_HEADER, user.user_id())
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<Vec<Quest>>()
                .await
                .map_err(|e| PortError::Unexpected(format!("Malformed quest list: {}", e))),
            StatusCode::NOT_FOUND => Err(PortError::NotFound(format!("dungeon {}", dungeon_id))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PortError::Unauthorized),
            status => {
                let message = error_message(response).await;
                warn!("Listing quests failed with {}: {}", status, message);
                Err(PortError::Unexpected(format!("{} (status {})", message, status.as_u16())))
            }
        }
    }
}

//=========================================================================================
// `SubmissionChannel` Trait Implementation
//=========================================================================================

#[async_trait]
impl SubmissionChannel for HttpApiAdapter {
    async fn submit_completion(
        &self,
        user: &UserContext,
        quest_id: &QuestId,
        request: &CompletionRequest,
    ) -> SubmissionResult<CompletionResponse> {
        let url = self.endpoint(&["quests", &quest_id.0, "complete"]);
        debug!("POST {} idempotency_key={}", url, request.idempotency_key());

        let response = self
            .client
            .post(url)
            .header(USER_ID_HEADER, user.user_id())
            .json(request)
            .send()
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            warn!("Completion of {} answered {}: {}", quest_id, status, message);
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))
    }
}
