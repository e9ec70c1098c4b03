//! Session lifecycle service client.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{ApiClient, IDEMPOTENCY_HEADER};
use crate::error::Result;
use crate::session::{SessionConfig, SessionId, SessionKind};

/// Which timed phase of an interval session finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseLabel {
    Work,
    Rest,
}

/// Remote session lifecycle calls.
///
/// Implementations are stateless request wrappers: one call, one request,
/// no retry.
#[async_trait]
pub trait SessionLifecycleClient: Send + Sync {
    /// Create the remote session record.
    async fn start(&self, config: &SessionConfig) -> Result<SessionId>;

    /// Record that a work or rest phase ended.
    async fn complete_phase(
        &self,
        session_id: &SessionId,
        phase: PhaseLabel,
        idempotency_key: Uuid,
    ) -> Result<()>;

    /// Close the remote session record.
    async fn finish(
        &self,
        session_id: &SessionId,
        kind: SessionKind,
        completed: bool,
        rating: Option<u8>,
        idempotency_key: Uuid,
    ) -> Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IntervalStartBody {
    work_seconds: u64,
    break_seconds: u64,
    target_cycles: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeditationStartBody<'a> {
    duration_seconds: u64,
    variant: &'a str,
}

#[derive(Serialize)]
struct CompletePhaseBody {
    phase: PhaseLabel,
}

#[derive(Serialize)]
struct FinishBody {
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<u8>,
}

#[derive(Deserialize)]
struct StartResponse {
    #[serde(rename = "sessionId", alias = "session_id", alias = "id")]
    session_id: RawId,
}

/// Servers hand out either string or numeric ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for SessionId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => SessionId::new(s),
            RawId::Number(n) => SessionId::new(n.to_string()),
        }
    }
}

/// A meditation variant offered by the server, as used in
/// `MeditationConfig::variant`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeditationVariant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Catalogue entries come as bare names or as objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawVariant {
    Name(String),
    Entry(MeditationVariant),
}

impl From<RawVariant> for MeditationVariant {
    fn from(raw: RawVariant) -> Self {
        match raw {
            RawVariant::Name(name) => MeditationVariant {
                id: None,
                name,
                description: None,
            },
            RawVariant::Entry(variant) => variant,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VariantsResponse {
    List(Vec<RawVariant>),
    Wrapped { variants: Vec<RawVariant> },
}

fn base_path(kind: SessionKind) -> &'static str {
    match kind {
        SessionKind::Interval => "/productivity/interval",
        SessionKind::Meditation => "/wellness/meditation",
    }
}

/// `SessionLifecycleClient` over the REST API.
#[derive(Debug, Clone)]
pub struct HttpLifecycleClient {
    api: ApiClient,
}

impl HttpLifecycleClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Meditation variants the server accepts at start.
    pub async fn variants(&self) -> Result<Vec<MeditationVariant>> {
        let path = format!("{}/variants", base_path(SessionKind::Meditation));
        let request = self.api.request(Method::GET, &path);
        let resp: VariantsResponse = self.api.send_json(request).await?;
        let raw = match resp {
            VariantsResponse::List(list) => list,
            VariantsResponse::Wrapped { variants } => variants,
        };
        Ok(raw.into_iter().map(MeditationVariant::from).collect())
    }
}

#[async_trait]
impl SessionLifecycleClient for HttpLifecycleClient {
    async fn start(&self, config: &SessionConfig) -> Result<SessionId> {
        let path = format!("{}/start", base_path(config.kind()));
        let request = self.api.request(Method::POST, &path);
        let request = match config {
            SessionConfig::Interval(cfg) => request.json(&IntervalStartBody {
                work_seconds: cfg.work_seconds,
                break_seconds: cfg.break_seconds,
                target_cycles: cfg.target_cycles,
            }),
            SessionConfig::Meditation(cfg) => request.json(&MeditationStartBody {
                duration_seconds: cfg.duration_seconds,
                variant: &cfg.variant,
            }),
        };
        let resp: StartResponse = self.api.send_json(request).await?;
        let session_id = SessionId::from(resp.session_id);
        info!(%session_id, kind = ?config.kind(), "remote session created");
        Ok(session_id)
    }

    async fn complete_phase(
        &self,
        session_id: &SessionId,
        phase: PhaseLabel,
        idempotency_key: Uuid,
    ) -> Result<()> {
        let path = format!(
            "{}/{}/complete-phase",
            base_path(SessionKind::Interval),
            session_id
        );
        let request = self
            .api
            .request(Method::PATCH, &path)
            .header(IDEMPOTENCY_HEADER, idempotency_key.to_string())
            .json(&CompletePhaseBody { phase });
        self.api.send(request).await
    }

    async fn finish(
        &self,
        session_id: &SessionId,
        kind: SessionKind,
        completed: bool,
        rating: Option<u8>,
        idempotency_key: Uuid,
    ) -> Result<()> {
        let path = format!("{}/{}/finish", base_path(kind), session_id);
        let request = self
            .api
            .request(Method::PATCH, &path)
            .header(IDEMPOTENCY_HEADER, idempotency_key.to_string())
            .json(&FinishBody { completed, rating });
        self.api.send(request).await
    }
}
