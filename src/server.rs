//!
//! storefront HTTP server
//! -----------------------
//! Axum front end for the rendering pipeline.
//!
//! Responsibilities:
//! - Tenant selection from the request host (see `tenant`).
//! - The catch-all content route (`content`, `resolve`, `listing`, `seo`).
//! - Stylesheet and theme asset passthrough (`assets`).
//! - Cache invalidation hooks for the admin layer.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{routing::get, Router};
use tracing::info;

use crate::config::ServerConfig;
use crate::render::RenderPipeline;
use crate::storage::Store;

pub mod assets;
pub mod content;
pub mod listing;
pub mod resolve;
pub mod seo;
mod tenant;

pub use tenant::host_tenant;

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub pipeline: Arc<RenderPipeline>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let store = Store::new(&config.db_root)
            .with_context(|| format!("While creating tenant store with root: {}", config.db_root.display()))?;
        let pipeline = Arc::new(RenderPipeline::new(store.clone(), config.template_root.clone()));
        Ok(Self { store, pipeline, config: Arc::new(config) })
    }

    /// Drop every cached theme config, environment and template source of `tenant`.
    /// The admin layer calls this after any theme, template or settings edit.
    pub fn invalidate_tenant(&self, tenant: &str) {
        info!(target: "storefront::router", tenant = %tenant, "caches invalidated");
        self.pipeline.invalidate_tenant(tenant);
    }

    pub fn invalidate_all(&self) { self.pipeline.invalidate_all(); }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/styles/{filename}", get(assets::stylesheet))
        .route("/themes/{theme}/{*file}", get(assets::theme_asset))
        .route("/", get(content::content_handler))
        .route("/{*path}", get(content::content_handler))
        .with_state(state)
}

fn log_startup_folders(config: &ServerConfig) {
    let cwd = std::env::current_dir().ok();
    info!(
        target: "startup",
        "storefront starting. Folder configuration: cwd={:?}, db_root={:?} (exists={}), template_root={:?} (exists={}), default_tenant='{}'",
        cwd,
        config.db_root,
        config.db_root.exists(),
        config.template_root,
        config.template_root.exists(),
        config.default_tenant
    );
}

pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    log_startup_folders(&config);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = build_router(AppState::new(config)?);

    info!(target: "startup", "Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("While binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}
