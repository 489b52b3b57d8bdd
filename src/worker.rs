//! Browser binding: implements the host traits over `web-sys` and exports one
//! function per worker event for the glue script in [`crate::bootstrap`].

use std::io;

use async_trait::async_trait;
use js_sys::{Array, Promise, Reflect, JSON};
use wasm_bindgen::{JsCast, JsValue, prelude::wasm_bindgen};
use wasm_bindgen_futures::{JsFuture, future_to_promise};
use web_sys::{
    ClientQueryOptions, ClientType, ExtendableEvent, Notification, NotificationEvent, PushEvent,
    ServiceWorkerGlobalScope,
};

use crate::{
    cfg::get_config,
    notification::{
        error::{HostError, RelayError},
        host::{ShownNotification, WindowClient, WorkerHost},
        model::{NotificationData, NotificationOptions},
        svc::{NotificationRelay, ServiceWorkerHandler},
    },
};

#[wasm_bindgen(start)]
pub fn start() {
    let _ = tracing_subscriber::fmt()
        .with_writer(ConsoleWriter::default)
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_ansi(false)
        .try_init();
}

#[wasm_bindgen]
pub fn on_install(scope: ServiceWorkerGlobalScope, _event: ExtendableEvent) -> Promise {
    let relay = relay(scope);
    future_to_promise(async move {
        relay
            .on_install()
            .await
            .map(|_| JsValue::UNDEFINED)
            .map_err(to_js)
    })
}

#[wasm_bindgen]
pub fn on_activate(scope: ServiceWorkerGlobalScope, _event: ExtendableEvent) -> Promise {
    let relay = relay(scope);
    future_to_promise(async move {
        relay
            .on_activate()
            .await
            .map(|_| JsValue::UNDEFINED)
            .map_err(to_js)
    })
}

#[wasm_bindgen]
pub fn on_push(scope: ServiceWorkerGlobalScope, event: PushEvent) -> Promise {
    let relay = relay(scope);
    let payload = event.data().map(|data| data.text().into_bytes());
    future_to_promise(async move {
        relay
            .on_push(payload.as_deref())
            .await
            .map(|_| JsValue::UNDEFINED)
            .map_err(to_js)
    })
}

#[wasm_bindgen]
pub fn on_notification_click(scope: ServiceWorkerGlobalScope, event: NotificationEvent) -> Promise {
    let relay = relay(scope);
    let notification = BrowserNotification(event.notification());
    future_to_promise(async move {
        relay
            .on_notification_click(&notification)
            .await
            .map(|_| JsValue::UNDEFINED)
            .map_err(to_js)
    })
}

fn relay(scope: ServiceWorkerGlobalScope) -> NotificationRelay<BrowserHost> {
    NotificationRelay::new(BrowserHost { scope }, get_config().relay.clone())
}

fn to_js(err: RelayError) -> JsValue {
    tracing::error!(error = %err, "worker event failed");
    js_sys::Error::new(&err.to_string()).into()
}

fn host_error(value: JsValue) -> HostError {
    HostError::new(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

async fn settle(promise: Result<Promise, JsValue>) -> Result<JsValue, HostError> {
    JsFuture::from(promise.map_err(host_error)?)
        .await
        .map_err(host_error)
}

pub struct BrowserHost {
    scope: ServiceWorkerGlobalScope,
}

#[async_trait(?Send)]
impl WorkerHost for BrowserHost {
    type Client = BrowserWindow;

    async fn skip_waiting(&self) -> Result<(), HostError> {
        settle(self.scope.skip_waiting()).await.map(drop)
    }

    async fn claim_clients(&self) -> Result<(), HostError> {
        settle(Ok(self.scope.clients().claim())).await.map(drop)
    }

    async fn show_notification(
        &self,
        title: &str,
        options: &NotificationOptions,
    ) -> Result<(), HostError> {
        let data = serde_json::to_string(&options.data)
            .map_err(|err| HostError::new(err.to_string()))?;

        let js_options = web_sys::NotificationOptions::new();
        js_options.set_body(&options.body);
        js_options.set_icon(&options.icon);
        js_options.set_badge(&options.badge);
        js_options.set_data(&JSON::parse(&data).map_err(host_error)?);

        let registration = self.scope.registration();
        settle(registration.show_notification_with_options(title, &js_options))
            .await
            .map(drop)
    }

    async fn match_all_windows(&self) -> Result<Vec<BrowserWindow>, HostError> {
        let query = ClientQueryOptions::new();
        query.set_type(ClientType::Window);
        let clients = settle(Ok(self.scope.clients().match_all_with_options(&query))).await?;

        Ok(Array::from(&clients)
            .iter()
            .filter_map(|client| client.dyn_into::<web_sys::WindowClient>().ok())
            .map(BrowserWindow)
            .collect())
    }

    async fn open_window(&self, url: &str) -> Result<(), HostError> {
        settle(Ok(self.scope.clients().open_window(url))).await.map(drop)
    }
}

pub struct BrowserWindow(web_sys::WindowClient);

#[async_trait(?Send)]
impl WindowClient for BrowserWindow {
    fn url(&self) -> String {
        self.0.url()
    }

    fn is_focusable(&self) -> bool {
        Reflect::has(&self.0, &JsValue::from_str("focus")).unwrap_or(false)
    }

    async fn focus(&self) -> Result<(), HostError> {
        settle(self.0.focus()).await.map(drop)
    }
}

struct BrowserNotification(Notification);

impl ShownNotification for BrowserNotification {
    fn close(&self) {
        self.0.close();
    }

    fn navigation_url(&self) -> Option<String> {
        let data = JSON::stringify(&self.0.data()).ok()?.as_string()?;
        let data = serde_json::from_str(&data).ok()?;
        NotificationData::stored_url(&data)
    }
}

/// Buffers one formatted tracing event and writes it to `console.log`.
#[derive(Default)]
struct ConsoleWriter {
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        if !line.is_empty() {
            web_sys::console::log_1(&JsValue::from_str(line));
        }
    }
}
