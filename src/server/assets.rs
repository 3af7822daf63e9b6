//! Stylesheet and theme asset passthrough.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::error::AppError;

use super::{host_tenant, AppState};

fn plain(status: StatusCode, body: &str) -> Response {
    (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body.to_string()).into_response()
}

/// A single relative path segment or a relative path of them, never escaping its root.
fn is_safe_relative(path: &str, allow_nested: bool) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && !path.contains('\0')
        && (allow_nested || !path.contains('/'))
        && path.split('/').all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

pub fn content_type_for(file: &str) -> &'static str {
    match file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).as_deref() {
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        _ => "application/octet-stream",
    }
}

fn failure(tenant: &str, op: &str, e: &AppError) -> Response {
    error!(target: "storefront::router", tenant = %tenant, op = op, "{}", e);
    let status = StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    plain(status, status.canonical_reason().unwrap_or("error"))
}

/// `GET /styles/{filename}`: `styles/<filename>` through the active theme's provider chain.
pub async fn stylesheet(State(state): State<AppState>, headers: HeaderMap, Path(filename): Path<String>) -> Response {
    if !is_safe_relative(&filename, false) {
        return plain(StatusCode::BAD_REQUEST, "invalid stylesheet name");
    }
    let tenant = host_tenant(&headers, &state.store, &state.config.default_tenant);
    let env = match state.pipeline.active_env(&tenant).await {
        Ok(env) => env,
        Err(e) => return failure(&tenant, "render_stylesheet", &e),
    };
    match env.load_raw(&format!("styles/{}", filename)).await {
        Ok(Some(css)) => ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], css).into_response(),
        Ok(None) => plain(StatusCode::NOT_FOUND, "stylesheet not found"),
        Err(e) => failure(&tenant, "render_stylesheet", &e),
    }
}

/// `GET /themes/{theme}/{*file}`: files under `<template_root>/themes/<theme>/`.
pub async fn theme_asset(State(state): State<AppState>, Path((theme, file)): Path<(String, String)>) -> Response {
    if !is_safe_relative(&theme, false) || !is_safe_relative(&file, true) {
        return plain(StatusCode::BAD_REQUEST, "invalid asset path");
    }
    let path = state.config.template_root.join("themes").join(&theme).join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type_for(&file))], bytes).into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound || e.kind() == std::io::ErrorKind::IsADirectory => {
            plain(StatusCode::NOT_FOUND, "asset not found")
        }
        Err(e) => failure(&state.config.default_tenant, "theme_asset", &e.into()),
    }
}
