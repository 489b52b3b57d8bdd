//! The JavaScript file the browser registers as the worker.
//!
//! It loads the wasm-bindgen `no-modules` package once and forwards each event
//! to the matching Rust export. `waitUntil` is called synchronously inside the
//! listener, which is the only point where the browser still accepts it.
//!
//! Work that must not wait for the package to load runs in the listener
//! itself: a clicked notification is closed before `ready` settles, so a cold
//! worker start does not delay the close or eat into the window the browser
//! allows for `openWindow` after a click.

static LISTENER_TEMPLATE: &str =
    "self.addEventListener('NAME', event => { PRELUDEevent.waitUntil(ready.then(() => wasm_bindgen.EXPORT(self, event))); });\n";

/// Worker event name, the Rust export handling it, and any statement that
/// runs synchronously before the export is awaited.
pub static WORKER_LISTENERS: [(&str, &str, &str); 4] = [
    ("install", "on_install", ""),
    ("activate", "on_activate", ""),
    ("push", "on_push", ""),
    (
        "notificationclick",
        "on_notification_click",
        "event.notification.close(); ",
    ),
];

/// Renders the glue script for a package served under `pkg_url`.
///
/// `crate_name` is the wasm-bindgen output stem, i.e. `push_relay` for
/// `push_relay.js` and `push_relay_bg.wasm`.
pub fn worker_script(pkg_url: &str, crate_name: &str) -> String {
    let pkg_url = pkg_url.trim_end_matches('/');
    let mut script = format!(
        "importScripts('{pkg_url}/{crate_name}.js');\n\
         const ready = wasm_bindgen('{pkg_url}/{crate_name}_bg.wasm');\n"
    );
    for (name, export, prelude) in WORKER_LISTENERS {
        script += LISTENER_TEMPLATE
            .replace("NAME", name)
            .replace("PRELUDE", prelude)
            .replace("EXPORT", export)
            .as_str();
    }
    script
}
