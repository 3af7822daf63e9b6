use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use storefront::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let config = ServerConfig::from_env();
    info!(
        target: "startup",
        "storefront starting: RUST_LOG='{}', http_port={}, db_root='{}', template_root='{}', default_tenant='{}'",
        rust_log, config.http_port, config.db_root.display(), config.template_root.display(), config.default_tenant
    );

    storefront::server::run_with_config(config).await
}
