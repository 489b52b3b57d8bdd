pub mod bootstrap;
pub mod cfg;
pub mod notification;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(target_arch = "wasm32")]
pub mod worker;
