use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use async_trait::async_trait;

use super::{
    error::HostError,
    host::{ShownNotification, WindowClient, WorkerHost},
    model::NotificationOptions,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SkipWaiting,
    ClaimClients,
    Show(String, NotificationOptions),
    MatchAll,
    Focus(String),
    Open(String),
}

type CallLog = Rc<RefCell<Vec<Call>>>;

/// Records every host call in order. One operation can be made to fail.
#[derive(Default)]
pub struct MockHost {
    calls: CallLog,
    windows: Vec<(String, bool)>,
    failing: Option<&'static str>,
    claimed: Cell<bool>,
}

impl MockHost {
    pub fn with_windows(windows: &[(&str, bool)]) -> Self {
        Self {
            windows: windows
                .iter()
                .map(|(url, focusable)| (url.to_string(), *focusable))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing(operation: &'static str) -> Self {
        Self {
            failing: Some(operation),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn claimed(&self) -> bool {
        self.claimed.get()
    }

    fn record(&self, operation: &'static str, call: Call) -> Result<(), HostError> {
        if self.failing == Some(operation) {
            return Err(HostError::new("permission denied"));
        }
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

#[async_trait(?Send)]
impl WorkerHost for MockHost {
    type Client = MockWindow;

    async fn skip_waiting(&self) -> Result<(), HostError> {
        self.record("skipWaiting", Call::SkipWaiting)
    }

    async fn claim_clients(&self) -> Result<(), HostError> {
        tokio::task::yield_now().await;
        self.record("clients.claim", Call::ClaimClients)?;
        self.claimed.set(true);
        Ok(())
    }

    async fn show_notification(
        &self,
        title: &str,
        options: &NotificationOptions,
    ) -> Result<(), HostError> {
        tokio::task::yield_now().await;
        self.record(
            "showNotification",
            Call::Show(title.to_string(), options.clone()),
        )
    }

    async fn match_all_windows(&self) -> Result<Vec<MockWindow>, HostError> {
        self.record("clients.matchAll", Call::MatchAll)?;
        Ok(self
            .windows
            .iter()
            .map(|(url, focusable)| MockWindow {
                url: url.clone(),
                focusable: *focusable,
                calls: self.calls.clone(),
            })
            .collect())
    }

    async fn open_window(&self, url: &str) -> Result<(), HostError> {
        self.record("clients.openWindow", Call::Open(url.to_string()))
    }
}

pub struct MockWindow {
    url: String,
    focusable: bool,
    calls: CallLog,
}

#[async_trait(?Send)]
impl WindowClient for MockWindow {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn is_focusable(&self) -> bool {
        self.focusable
    }

    async fn focus(&self) -> Result<(), HostError> {
        self.calls.borrow_mut().push(Call::Focus(self.url.clone()));
        Ok(())
    }
}

pub struct MockNotification {
    url: Option<String>,
    closed: Cell<bool>,
}

impl MockNotification {
    pub fn new(url: Option<&str>) -> Self {
        Self {
            url: url.map(str::to_string),
            closed: Cell::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

impl ShownNotification for MockNotification {
    fn close(&self) {
        self.closed.set(true);
    }

    fn navigation_url(&self) -> Option<String> {
        self.url.clone()
    }
}
