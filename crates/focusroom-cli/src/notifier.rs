//! Desktop notifications via notify-rust.

use async_trait::async_trait;
use focusroom_core::error::Result;
use focusroom_core::{CoreError, NotificationBackend, Permission};
use notify_rust::Notification;
use tracing::debug;

pub struct DesktopNotifier;

impl DesktopNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationBackend for DesktopNotifier {
    /// Desktops do not prompt for permission; a Linux session without a
    /// display has nowhere to show anything.
    fn permission(&self) -> Permission {
        let headless = cfg!(target_os = "linux")
            && std::env::var_os("DISPLAY").is_none()
            && std::env::var_os("WAYLAND_DISPLAY").is_none();
        if headless {
            Permission::Unsupported
        } else {
            Permission::Granted
        }
    }

    async fn request_permission(&self) -> Permission {
        self.permission()
    }

    async fn show(&self, title: &str, body: &str) -> Result<()> {
        debug!("notification: {title}");
        let title = title.to_string();
        let body = body.to_string();
        tokio::task::spawn_blocking(move || {
            Notification::new()
                .summary(&title)
                .body(&body)
                .appname("Focusroom")
                .show()
                .map(|_| ())
                .map_err(|e| CoreError::NotificationUnavailable(e.to_string()))
        })
        .await
        .map_err(|e| CoreError::NotificationUnavailable(e.to_string()))?
    }
}
