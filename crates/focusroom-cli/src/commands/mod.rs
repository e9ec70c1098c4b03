pub mod config;
pub mod rewards;
pub mod session;

use std::sync::Arc;

use focusroom_core::{ApiClient, Config, CoreError, HttpLifecycleClient, HttpRewardEvaluator};

/// HTTP clients built from the `[api]` section.
pub struct Services {
    pub lifecycle: Arc<HttpLifecycleClient>,
    pub rewards: Arc<HttpRewardEvaluator>,
}

pub fn connect(config: &Config) -> Result<Services, CoreError> {
    let api = ApiClient::new(
        &config.api.base_url,
        config.api_token(),
        config.request_timeout(),
    )?;
    Ok(Services {
        lifecycle: Arc::new(HttpLifecycleClient::new(api.clone())),
        rewards: Arc::new(HttpRewardEvaluator::new(api)),
    })
}

/// One-line explanation of a failure, phrased for the person at the terminal.
pub fn describe(err: &CoreError) -> String {
    match err {
        CoreError::Validation(e) => format!("invalid settings: {e}"),
        CoreError::Unauthorized(_) => format!(
            "not authorized: set api.token or {}",
            focusroom_core::storage::TOKEN_ENV
        ),
        CoreError::ServiceUnavailable(msg) => {
            format!("session service unavailable ({msg}); try again later")
        }
        other => other.to_string(),
    }
}
