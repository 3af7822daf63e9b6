//! Server configuration read from the process environment.

use std::path::PathBuf;
use tracing::warn;

pub const ENV_HTTP_PORT: &str = "STOREFRONT_HTTP_PORT";
pub const ENV_DB_ROOT: &str = "STOREFRONT_DB_ROOT";
pub const ENV_TEMPLATE_ROOT: &str = "STOREFRONT_TEMPLATE_ROOT";
pub const ENV_DEFAULT_TENANT: &str = "STOREFRONT_DEFAULT_TENANT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub http_port: u16,
    /// Folder holding one sub-folder per tenant database.
    pub db_root: PathBuf,
    /// Shared filesystem template root (fallback provider and theme asset files).
    pub template_root: PathBuf,
    /// Tenant used when the request host names no tenant folder.
    pub default_tenant: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            db_root: PathBuf::from("dbs"),
            template_root: PathBuf::from("templates"),
            default_tenant: "default".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Build from an arbitrary key lookup; unset or empty keys keep their defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let mut cfg = Self::default();
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(port) = get(ENV_HTTP_PORT) {
            match port.parse::<u16>() {
                Ok(p) => cfg.http_port = p,
                Err(_) => warn!(target: "startup", "{}='{}' is not a valid port, using {}", ENV_HTTP_PORT, port, cfg.http_port),
            }
        }
        if let Some(v) = get(ENV_DB_ROOT) { cfg.db_root = PathBuf::from(v); }
        if let Some(v) = get(ENV_TEMPLATE_ROOT) { cfg.template_root = PathBuf::from(v); }
        if let Some(v) = get(ENV_DEFAULT_TENANT) { cfg.default_tenant = v; }
        cfg
    }
}
