//! HTTP clients for the remote session and reward services.
//!
//! `ApiClient` carries the shared plumbing (base URL, bearer credential,
//! request timeout, status mapping). The service wrappers on top of it are
//! stateless and never retry; retrying is the outbox's job.

mod lifecycle;
mod rewards;

pub use lifecycle::{HttpLifecycleClient, MeditationVariant, PhaseLabel, SessionLifecycleClient};
pub use rewards::{GrantedReward, HttpRewardEvaluator, RewardEvaluator};

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, CoreError, Result, ValidationError};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Build a client rooted at `base_url` (e.g. `http://localhost:5000/api`).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `base_url` is not an absolute URL,
    /// or `ServiceUnavailable` if the HTTP client cannot be built.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "api.base_url".into(),
            message: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::ServiceUnavailable(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "api request");
        let builder = self.http.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<()> {
        let resp = request.send().await?;
        check_response(resp).await?;
        Ok(())
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request.send().await?;
        let resp = check_response(resp).await?;
        let body = resp.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| CoreError::ServiceUnavailable(format!("malformed response: {e}")))
    }
}

/// Map a non-success status onto the error taxonomy.
async fn check_response(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = error_message(status, &body);
    Err(match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            CoreError::Validation(ValidationError::Rejected(message))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CoreError::Unauthorized(message),
        _ => CoreError::ServiceUnavailable(message),
    })
}

/// Pull `error` or `message` out of a JSON error body, falling back to the
/// raw body or the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    format!("HTTP {}: {detail}", status.as_u16())
}
