//! Calls the relay makes into the platform running the worker.

use async_trait::async_trait;

use super::{error::HostError, model::NotificationOptions};

#[async_trait(?Send)]
pub trait WorkerHost {
    type Client: WindowClient;

    /// Activate the installing worker without waiting for old instances.
    async fn skip_waiting(&self) -> Result<(), HostError>;

    /// Take control of every open page in scope.
    async fn claim_clients(&self) -> Result<(), HostError>;

    async fn show_notification(
        &self,
        title: &str,
        options: &NotificationOptions,
    ) -> Result<(), HostError>;

    /// All open windows controlled by this worker.
    async fn match_all_windows(&self) -> Result<Vec<Self::Client>, HostError>;

    async fn open_window(&self, url: &str) -> Result<(), HostError>;
}

#[async_trait(?Send)]
pub trait WindowClient {
    fn url(&self) -> String;

    fn is_focusable(&self) -> bool;

    async fn focus(&self) -> Result<(), HostError>;
}

/// A notification previously displayed by the relay.
pub trait ShownNotification {
    fn close(&self);

    /// The `data.url` stored when the notification was shown.
    fn navigation_url(&self) -> Option<String>;
}
