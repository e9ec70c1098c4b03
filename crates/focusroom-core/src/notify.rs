//! Best-effort user-facing notifications on phase transitions.
//!
//! `NotificationDispatcher::notify` never fails and never blocks: the
//! backend call runs on a background task and any error is logged and
//! dropped.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::tasks::BackgroundTasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Undetermined,
    /// The platform has no notification support.
    Unsupported,
}

/// Platform notification surface (desktop, terminal, ...).
#[async_trait]
pub trait NotificationBackend: Send + Sync {
    fn permission(&self) -> Permission;

    /// Ask the user for permission. Callers do not wait on the answer.
    async fn request_permission(&self) -> Permission;

    /// Show a notification. Failures map to `CoreError::NotificationUnavailable`.
    async fn show(&self, title: &str, body: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    backend: Option<Arc<dyn NotificationBackend>>,
    tasks: BackgroundTasks,
}

impl NotificationDispatcher {
    pub fn new(backend: Arc<dyn NotificationBackend>) -> Self {
        Self {
            backend: Some(backend),
            tasks: BackgroundTasks::new(),
        }
    }

    /// A dispatcher that drops every notification.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            tasks: BackgroundTasks::new(),
        }
    }

    pub fn notify(&self, title: &str, body: &str) {
        let Some(backend) = self.backend.clone() else {
            return;
        };
        match backend.permission() {
            Permission::Granted => {
                let title = title.to_string();
                let body = body.to_string();
                self.tasks.spawn(async move {
                    if let Err(e) = backend.show(&title, &body).await {
                        warn!(error = %e, "notification failed");
                    }
                });
            }
            Permission::Undetermined => {
                debug!("notification permission undetermined, requesting");
                self.tasks.spawn(async move {
                    let answer = backend.request_permission().await;
                    debug!(?answer, "notification permission answered");
                });
            }
            Permission::Denied | Permission::Unsupported => {}
        }
    }

    /// Wait for in-flight notifications.
    pub async fn flush(&self) {
        self.tasks.flush().await;
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::CoreError;
    use std::sync::Mutex;

    /// Records shown notifications; optionally fails every `show`.
    pub struct RecordingBackend {
        pub permission: Mutex<Permission>,
        pub shown: Mutex<Vec<(String, String)>>,
        pub requests: Mutex<usize>,
        pub fail: bool,
    }

    impl RecordingBackend {
        pub fn new(permission: Permission) -> Self {
            Self {
                permission: Mutex::new(permission),
                shown: Mutex::new(Vec::new()),
                requests: Mutex::new(0),
                fail: false,
            }
        }

        pub fn shown(&self) -> Vec<(String, String)> {
            self.shown.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationBackend for RecordingBackend {
        fn permission(&self) -> Permission {
            *self.permission.lock().unwrap()
        }

        async fn request_permission(&self) -> Permission {
            *self.requests.lock().unwrap() += 1;
            let mut p = self.permission.lock().unwrap();
            *p = Permission::Granted;
            *p
        }

        async fn show(&self, title: &str, body: &str) -> Result<()> {
            if self.fail {
                return Err(CoreError::NotificationUnavailable("no display".into()));
            }
            self.shown
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }
}
