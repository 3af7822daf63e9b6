//!
//! storefront storage module
//! --------------------------
//! Tenant databases live under a shared root, one folder per tenant:
//! `<db_root>/<tenant>/<table>.json`. Every table is a JSON array of rows except
//! `site_settings.json`, which holds a single object. The rendering core only reads
//! these documents; the admin layer owns all writes (the `write_*` helpers exist for
//! seeding and tests).
//!
//! Key responsibilities:
//! - Async table reads with typed row decoding (`read_table`, `read_settings`).
//! - Tenant name validation so a host header can never escape the root.
//! - Typed lookups used by the resolver and renderer (see `queries`).
//!
//! A missing table file reads as an empty table. A malformed file is an error; callers
//! decide whether that is fatal (page render) or skippable (slug fallbacks).

use std::{fs, path::{Path, PathBuf}};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};

mod paths;
pub mod model;
pub mod queries;

pub use model::*;
pub use paths::is_valid_tenant_name;
pub use queries::ModuleDetail;

pub const SITE_SETTINGS: &str = "site_settings";
pub const THEMES: &str = "themes";
pub const TEMPLATES: &str = "templates";
pub const CONTENT: &str = "content";
pub const PAGES: &str = "pages";
pub const PRODUCTS: &str = "products";
pub const PRODUCT_VARIANTS: &str = "product_variants";
pub const PRODUCT_IMAGES: &str = "product_images";
pub const POSTS: &str = "posts";
pub const CLASSIFIED_ADS: &str = "classified_ads";
pub const BLOCKS: &str = "blocks";

/// Handle on the folder tree holding every tenant database.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Create a Store rooted at the given path. The directory is created if missing.
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root_path(&self) -> &Path { &self.root }

    /// True when a tenant folder exists for `tenant`.
    pub fn has_tenant(&self, tenant: &str) -> bool {
        self.tenant_dir(tenant).map(|d| d.is_dir()).unwrap_or(false)
    }

    /// Read every row of a table. Missing file => empty table.
    pub async fn read_table<T: DeserializeOwned>(&self, tenant: &str, table: &str) -> AppResult<Vec<T>> {
        let path = self.table_path(tenant, table)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "storefront::storage", "read_table: tenant='{}' table='{}' absent -> empty", tenant, table);
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice::<Vec<T>>(&bytes).map_err(|e| {
            AppError::internal("table_decode".to_string(), format!("{}/{}: {}", tenant, table, e))
        })
    }

    /// Read the tenant's site settings. Missing file => defaults.
    pub async fn read_settings(&self, tenant: &str) -> AppResult<SiteSettings> {
        let path = self.table_path(tenant, SITE_SETTINGS)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<SiteSettings>(&bytes).map_err(|e| {
                AppError::internal("settings_decode".to_string(), format!("{}: {}", tenant, e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SiteSettings::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a table document. Used by seeding and tests; the renderer never writes.
    pub fn write_table<T: Serialize>(&self, tenant: &str, table: &str, rows: &[T]) -> AppResult<()> {
        let path = self.table_path(tenant, table)?;
        if let Some(dir) = path.parent() { fs::create_dir_all(dir)?; }
        fs::write(&path, serde_json::to_vec_pretty(rows)?)?;
        debug!(target: "storefront::storage", "write_table: tenant='{}' table='{}' rows={}", tenant, table, rows.len());
        Ok(())
    }

    pub fn write_settings(&self, tenant: &str, settings: &SiteSettings) -> AppResult<()> {
        let path = self.table_path(tenant, SITE_SETTINGS)?;
        if let Some(dir) = path.parent() { fs::create_dir_all(dir)?; }
        fs::write(&path, serde_json::to_vec_pretty(settings)?)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
