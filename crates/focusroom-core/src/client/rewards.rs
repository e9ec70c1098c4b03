//! Reward service client.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::ApiClient;
use crate::error::Result;

/// A reward the server granted during an automatic check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantedReward {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Asks the reward service to evaluate and grant milestone rewards.
///
/// The returned list is informational (for a toast); callers never depend
/// on it for session correctness.
#[async_trait]
pub trait RewardEvaluator: Send + Sync {
    async fn check_automatic(&self) -> Result<Vec<GrantedReward>>;
}

#[derive(Deserialize)]
struct CheckAutomaticResponse {
    #[serde(rename = "grantedRewards", alias = "granted_rewards", default)]
    granted_rewards: Vec<GrantedReward>,
}

#[derive(Debug, Clone)]
pub struct HttpRewardEvaluator {
    api: ApiClient,
}

impl HttpRewardEvaluator {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RewardEvaluator for HttpRewardEvaluator {
    async fn check_automatic(&self) -> Result<Vec<GrantedReward>> {
        let request = self
            .api
            .request(Method::POST, "/gamification/rewards/check-automatic");
        let resp: CheckAutomaticResponse = self.api.send_json(request).await?;
        if !resp.granted_rewards.is_empty() {
            info!(count = resp.granted_rewards.len(), "rewards granted");
        }
        Ok(resp.granted_rewards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::time::Duration;

    fn evaluator_for(server: &mockito::ServerGuard) -> HttpRewardEvaluator {
        let api = ApiClient::new(&server.url(), Some("t".into()), Duration::from_secs(5)).unwrap();
        HttpRewardEvaluator::new(api)
    }

    #[tokio::test]
    async fn parses_granted_rewards() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gamification/rewards/check-automatic")
            .match_header("authorization", "Bearer t")
            .with_status(200)
            .with_body(r#"{"grantedRewards":[{"id":3,"name":"Zen Master"}]}"#)
            .create_async()
            .await;

        let rewards = evaluator_for(&server).check_automatic().await.unwrap();
        assert_eq!(rewards.len(), 1);
        assert_eq!(rewards[0].name, "Zen Master");
        assert_eq!(rewards[0].id, Some(serde_json::json!(3)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_list_means_nothing_granted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/gamification/rewards/check-automatic")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let rewards = evaluator_for(&server).check_automatic().await.unwrap();
        assert!(rewards.is_empty());
    }

    #[tokio::test]
    async fn gateway_error_is_service_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/gamification/rewards/check-automatic")
            .with_status(502)
            .create_async()
            .await;

        let err = evaluator_for(&server).check_automatic().await.unwrap_err();
        assert!(matches!(err, CoreError::ServiceUnavailable(_)));
    }
}
