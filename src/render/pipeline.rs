//! Single-page render orchestration.
//!
//! `render` assembles the shared context (site, customer, styles, theme assets), renders
//! through the tenant's environment and substitutes fragments. `render_page` wraps it
//! with the error-page fallback: a failed render is logged and answered with
//! `errors/500.html`; if that template fails too the response is plain text.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use serde_json::{json, Map, Value};
use tracing::error;

use crate::error::{AppError, AppResult};
use crate::identity::Visitor;
use crate::storage::{SiteSettings, Store};
use crate::theme::{ThemeRegistry, DEFAULT_THEME};

use super::environment::{EnvironmentCache, ThemeEnvironment};
use super::shortcodes::{process_shortcodes, StoreFragments};
use super::styles::resolve_styles;

pub const ERROR_TEMPLATE: &str = "errors/500.html";
pub const NOT_FOUND_TEMPLATE: &str = "errors/404.html";

const HTML: &str = "text/html; charset=utf-8";
const PLAIN: &str = "text/plain; charset=utf-8";

/// Context keys owned by the pipeline; request context cannot replace them.
const RESERVED_KEYS: &[&str] = &["site", "customer", "styles", "theme_css", "theme_js", "theme"];

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub tenant: String,
    pub template: String,
    /// Template-level style overrides (the template row's `options`).
    pub style_overrides: Option<Value>,
    pub context: Map<String, Value>,
    pub visitor: Visitor,
}

impl RenderRequest {
    pub fn new(tenant: &str, template: &str, visitor: Visitor) -> Self {
        Self {
            tenant: tenant.to_string(),
            template: template.to_string(),
            style_overrides: None,
            context: Map::new(),
            visitor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub status: StatusCode,
    pub body: String,
    pub content_type: &'static str,
}

impl Rendered {
    pub fn html(status: StatusCode, body: String) -> Self { Self { status, body, content_type: HTML } }
    pub fn plain(status: StatusCode, body: &str) -> Self { Self { status, body: body.to_string(), content_type: PLAIN } }
}

impl IntoResponse for Rendered {
    fn into_response(self) -> Response {
        (self.status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

fn active_theme(settings: &SiteSettings) -> &str {
    settings.active_theme.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_THEME)
}

pub struct RenderPipeline {
    store: Store,
    themes: ThemeRegistry,
    envs: EnvironmentCache,
}

impl RenderPipeline {
    pub fn new(store: Store, template_root: impl Into<PathBuf>) -> Self {
        let themes = ThemeRegistry::new(store.clone());
        let envs = EnvironmentCache::new(store.clone(), themes.clone(), template_root);
        Self { store, themes, envs }
    }

    /// Environment for the tenant's active theme.
    pub async fn active_env(&self, tenant: &str) -> AppResult<Arc<ThemeEnvironment>> {
        let settings = self.store.read_settings(tenant).await?;
        self.envs.get_env(tenant, active_theme(&settings)).await
    }

    pub async fn render(&self, req: &RenderRequest) -> AppResult<String> {
        let settings = self.store.read_settings(&req.tenant).await?;
        let env = self.envs.get_env(&req.tenant, active_theme(&settings)).await?;
        let assets = self.themes.get_theme_assets(&req.tenant, &env.theme).await?;
        let styles = resolve_styles(settings.global_styles.as_ref(), req.style_overrides.as_ref());
        let site = serde_json::to_value(&settings)?;

        let mut ctx: Map<String, Value> = req
            .context
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        ctx.insert("site".into(), site.clone());
        ctx.insert("customer".into(), serde_json::to_value(&req.visitor.customer)?);
        ctx.insert("styles".into(), Value::Object(styles));
        ctx.insert("theme_css".into(), json!(assets.css));
        ctx.insert("theme_js".into(), json!(assets.js));
        ctx.insert("theme".into(), json!({"slug": env.theme, "chain": env.chain}));

        let mut shared = Map::new();
        shared.insert("site".into(), site);
        shared.insert("blocks".into(), ctx.get("blocks").cloned().unwrap_or(Value::Null));

        let html = env.render(&req.template, &Value::Object(ctx)).await?;
        let fragments = StoreFragments { store: self.store.clone(), tenant: req.tenant.clone() };
        Ok(process_shortcodes(&html, &env, &fragments, &req.visitor.permission_context(), &shared).await)
    }

    async fn render_guarded(&self, req: &RenderRequest) -> AppResult<String> {
        match AssertUnwindSafe(self.render(req)).catch_unwind().await {
            Ok(res) => res,
            Err(_) => Err(AppError::internal("render_panic".to_string(), format!("panic while rendering '{}'", req.template))),
        }
    }

    /// Render `req` with `status`; any failure becomes the error page.
    pub async fn render_page(&self, req: RenderRequest, status: StatusCode, op: &str) -> Rendered {
        match self.render_guarded(&req).await {
            Ok(body) => Rendered::html(status, body),
            Err(e) => {
                error!(target: "storefront::render", tenant = %req.tenant, op = op, template = %req.template, "render failed: {}", e);
                self.render_error(&req.tenant, req.visitor).await
            }
        }
    }

    pub async fn render_error(&self, tenant: &str, visitor: Visitor) -> Rendered {
        let mut req = RenderRequest::new(tenant, ERROR_TEMPLATE, visitor);
        req.context.insert("status".into(), json!(500));
        match self.render_guarded(&req).await {
            Ok(body) => Rendered::html(StatusCode::INTERNAL_SERVER_ERROR, body),
            Err(e) => {
                error!(target: "storefront::render", tenant = %tenant, op = "render_error_page", "error page failed: {}", e);
                Rendered::plain(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
            }
        }
    }

    pub async fn render_not_found(&self, tenant: &str, visitor: Visitor, path: &str) -> Rendered {
        let mut req = RenderRequest::new(tenant, NOT_FOUND_TEMPLATE, visitor);
        req.context.insert("status".into(), json!(404));
        req.context.insert("path".into(), json!(path));
        match self.render_guarded(&req).await {
            Ok(body) => Rendered::html(StatusCode::NOT_FOUND, body),
            Err(e) => {
                error!(target: "storefront::render", tenant = %tenant, op = "render_not_found", "404 page failed: {}", e);
                Rendered::plain(StatusCode::NOT_FOUND, "404 Not Found")
            }
        }
    }

    pub fn invalidate_tenant(&self, tenant: &str) { self.envs.invalidate_tenant(tenant); }

    pub fn invalidate_all(&self) { self.envs.invalidate_all(); }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
