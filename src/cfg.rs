use std::{env, sync::OnceLock};

const DEFAULT_ICON: &str = match option_env!("RELAY_DEFAULT_ICON") {
    Some(icon) => icon,
    None => "/path/to/default-icon.png",
};
const DEFAULT_BADGE: &str = match option_env!("RELAY_DEFAULT_BADGE") {
    Some(badge) => badge,
    None => "/path/to/default-badge.png",
};

/// Values substituted for anything a push payload leaves out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub default_title: String,
    pub default_body: String,
    /// Title used when the payload is plain text or missing.
    pub fallback_title: String,
    /// Body used when the push event carries no payload at all.
    pub empty_body: String,
    pub default_icon: String,
    pub default_badge: String,
    pub default_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_title: "Default Title".to_string(),
            default_body: "Default body message.".to_string(),
            fallback_title: "New Notification".to_string(),
            empty_body: "You have a new message!".to_string(),
            default_icon: DEFAULT_ICON.to_string(),
            default_badge: DEFAULT_BADGE.to_string(),
            default_url: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Directory holding the wasm-bindgen output served under `/pkg/`.
    pub pkg_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "localhost:8080".to_string(),
            pkg_dir: "pkg".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub relay: RelayConfig,
    pub server: ServerConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(icon) = var("RELAY_DEFAULT_ICON") {
            config.relay.default_icon = icon;
        }
        if let Some(badge) = var("RELAY_DEFAULT_BADGE") {
            config.relay.default_badge = badge;
        }
        if let Some(addr) = var("RELAY_BIND_ADDR") {
            config.server.bind_addr = addr;
        }
        if let Some(dir) = var("RELAY_PKG_DIR") {
            config.server.pkg_dir = dir;
        }
        config
    }
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Loads `.env` and the process environment. Only the first call has effect.
pub fn init_config() -> &'static Config {
    dotenvy::dotenv().ok();
    CONFIG.get_or_init(Config::from_env)
}

#[inline]
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(Config::default)
}
