use async_trait::async_trait;

use super::{
    error::RelayError,
    host::{ShownNotification, WindowClient, WorkerHost},
    model::{NotificationRequest, Payload},
};
use crate::cfg::RelayConfig;

/// Entry points the platform binding calls, one per worker event.
///
/// Each returned future resolves only after every host call it depends on has
/// settled, so the binding can hand it straight to `waitUntil`.
#[async_trait(?Send)]
pub trait ServiceWorkerHandler {
    async fn on_install(&self) -> Result<(), RelayError>;

    async fn on_activate(&self) -> Result<(), RelayError>;

    async fn on_push(&self, payload: Option<&[u8]>) -> Result<NotificationRequest, RelayError>;

    async fn on_notification_click(
        &self,
        notification: &dyn ShownNotification,
    ) -> Result<ClickOutcome, RelayError>;
}

/// Which branch a notification click took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// An open window was already at the target URL.
    Focused(String),
    Opened(String),
}

pub struct NotificationRelay<H> {
    host: H,
    config: RelayConfig,
}

impl<H: WorkerHost> NotificationRelay<H> {
    pub fn new(host: H, config: RelayConfig) -> Self {
        Self { host, config }
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

#[async_trait(?Send)]
impl<H: WorkerHost> ServiceWorkerHandler for NotificationRelay<H> {
    async fn on_install(&self) -> Result<(), RelayError> {
        tracing::info!("service worker installing");
        self.host
            .skip_waiting()
            .await
            .map_err(RelayError::host("skipWaiting"))
    }

    async fn on_activate(&self) -> Result<(), RelayError> {
        tracing::info!("service worker activating");
        self.host
            .claim_clients()
            .await
            .map_err(RelayError::host("clients.claim"))
    }

    async fn on_push(&self, payload: Option<&[u8]>) -> Result<NotificationRequest, RelayError> {
        tracing::info!(bytes = ?payload.map(<[u8]>::len), "push event received");
        let request = Payload::decode(payload).resolve(&self.config);
        tracing::debug!(
            title = %request.title,
            url = %request.options.data.url,
            "showing notification"
        );

        self.host
            .show_notification(&request.title, &request.options)
            .await
            .map_err(RelayError::host("showNotification"))?;
        Ok(request)
    }

    async fn on_notification_click(
        &self,
        notification: &dyn ShownNotification,
    ) -> Result<ClickOutcome, RelayError> {
        tracing::info!("notification click received");
        notification.close();

        let url = notification
            .navigation_url()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.config.default_url.clone());

        let windows = self
            .host
            .match_all_windows()
            .await
            .map_err(RelayError::host("clients.matchAll"))?;

        // exact match only: "/a" and "/a/" are different windows
        if let Some(window) = windows
            .iter()
            .find(|window| window.is_focusable() && window.url() == url)
        {
            tracing::debug!(%url, "focusing open window");
            window
                .focus()
                .await
                .map_err(RelayError::host("WindowClient.focus"))?;
            return Ok(ClickOutcome::Focused(url));
        }

        tracing::debug!(%url, open = windows.len(), "no matching window, opening");
        self.host
            .open_window(&url)
            .await
            .map_err(RelayError::host("clients.openWindow"))?;
        Ok(ClickOutcome::Opened(url))
    }
}
