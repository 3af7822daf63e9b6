use axum::http::{header, HeaderMap};
use tracing::debug;

use crate::storage::{is_valid_tenant_name, Store};

/// Host header without its port, lowercased.
fn host_name(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::HOST)?.to_str().ok()?.trim();
    let host = match raw.rsplit_once(':') {
        Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) => h,
        _ => raw,
    };
    let host = host.to_ascii_lowercase();
    if host.is_empty() { None } else { Some(host) }
}

/// The tenant named by the host when a database folder exists for it, else `default`.
pub fn host_tenant(headers: &HeaderMap, store: &Store, default: &str) -> String {
    match host_name(headers) {
        Some(host) if is_valid_tenant_name(&host) && store.has_tenant(&host) => host,
        other => {
            debug!(target: "storefront::router", "host {:?} has no tenant folder, using '{}'", other, default);
            default.to_string()
        }
    }
}
