//! Theme configuration and inheritance chains.
//!
//! Theme rows come from the tenant's `themes` table. The `default` theme always
//! exists: until a database record for it is created, a built-in baseline stands in.
//! Configs are cached per `(tenant, slug)`; the admin layer must call
//! `invalidate_tenant` after editing a tenant's themes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AppResult;
use crate::storage::{json_object, Store, ThemeRow, ThemeSource};

mod assets;

pub use assets::{assets_for_chain, ThemeAssets};

pub const DEFAULT_THEME: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetLists {
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default)]
    pub js: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeConfig {
    pub slug: String,
    pub name: String,
    pub version: String,
    pub inherits: Option<String>,
    pub assets: AssetLists,
    pub source: ThemeSource,
}

impl ThemeConfig {
    fn from_row(row: ThemeRow) -> Self {
        let assets = decode_asset_lists(&row.config);
        Self {
            name: if row.name.is_empty() { row.slug.clone() } else { row.name },
            slug: row.slug,
            version: row.version.unwrap_or_else(|| "0.0.0".to_string()),
            inherits: row.inherits.filter(|p| !p.trim().is_empty()),
            assets,
            source: row.source,
        }
    }

    /// Built-in `default` theme used until the tenant stores its own record.
    pub fn baseline_default() -> Self {
        Self {
            slug: DEFAULT_THEME.to_string(),
            name: "Default".to_string(),
            version: "1.0.0".to_string(),
            inherits: None,
            assets: AssetLists { css: vec!["css/main.css".to_string()], js: vec!["js/main.js".to_string()] },
            source: ThemeSource::System,
        }
    }
}

type CacheKey = (String, String);

/// Resolves theme configs and inheritance chains, caching configs per tenant.
#[derive(Clone)]
pub struct ThemeRegistry {
    store: Store,
    configs: Arc<RwLock<HashMap<CacheKey, Arc<ThemeConfig>>>>,
}

impl ThemeRegistry {
    pub fn new(store: Store) -> Self {
        Self { store, configs: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Config for `slug` in `tenant`, or `None` when the tenant has no such theme.
    pub async fn get_theme_config(&self, tenant: &str, slug: &str) -> AppResult<Option<Arc<ThemeConfig>>> {
        let key = (tenant.to_string(), slug.to_string());
        let cached = self.configs.read().get(&key).cloned();
        if cached.is_some() {
            return Ok(cached);
        }
        let loaded = match self.store.find_theme(tenant, slug).await? {
            Some(row) => Some(ThemeConfig::from_row(row)),
            None if slug == DEFAULT_THEME => Some(ThemeConfig::baseline_default()),
            None => None,
        };
        let Some(cfg) = loaded else { return Ok(None); };
        debug!(target: "storefront::theme", "theme config loaded: tenant='{}' slug='{}' source={:?}", tenant, slug, cfg.source);
        let cfg = Arc::new(cfg);
        self.configs.write().insert(key, cfg.clone());
        Ok(Some(cfg))
    }

    /// True when the tenant's themes table holds `slug` (the baseline does not count).
    pub async fn theme_exists(&self, tenant: &str, slug: &str) -> AppResult<bool> {
        Ok(self.store.find_theme(tenant, slug).await?.is_some())
    }

    /// Configs of the inheritance chain, parent-first, `default` always at the front.
    ///
    /// The walk follows `inherits` from `slug`, stops at the first slug seen twice or at
    /// a theme with no config, then prepends `default` if the walk never reached it.
    pub async fn resolve_chain_configs(&self, tenant: &str, slug: &str) -> AppResult<Vec<Arc<ThemeConfig>>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut chain: VecDeque<Arc<ThemeConfig>> = VecDeque::new();
        let mut current = Some(slug.to_string());
        while let Some(s) = current {
            if !visited.insert(s.clone()) {
                debug!(target: "storefront::theme", "inheritance cycle at '{}' (tenant='{}')", s, tenant);
                break;
            }
            let Some(cfg) = self.get_theme_config(tenant, &s).await? else { break; };
            current = cfg.inherits.clone();
            chain.push_front(cfg);
        }
        if !chain.iter().any(|c| c.slug == DEFAULT_THEME) {
            if let Some(def) = self.get_theme_config(tenant, DEFAULT_THEME).await? {
                chain.push_front(def);
            }
        }
        Ok(chain.into_iter().collect())
    }

    /// Slugs of the inheritance chain, parent-first.
    pub async fn resolve_theme_chain(&self, tenant: &str, slug: &str) -> AppResult<Vec<String>> {
        Ok(self.resolve_chain_configs(tenant, slug).await?.iter().map(|c| c.slug.clone()).collect())
    }

    /// Ordered CSS/JS URLs for a theme and its ancestors.
    pub async fn get_theme_assets(&self, tenant: &str, slug: &str) -> AppResult<ThemeAssets> {
        Ok(assets_for_chain(&self.resolve_chain_configs(tenant, slug).await?))
    }

    pub fn invalidate_tenant(&self, tenant: &str) {
        self.configs.write().retain(|(t, _), _| t != tenant);
    }

    pub fn invalidate_all(&self) { self.configs.write().clear(); }
}

/// Theme config documents may arrive as objects or encoded strings; both decode here.
fn decode_asset_lists(config: &Value) -> AssetLists {
    json_object(Some(config))
        .get("assets")
        .cloned()
        .and_then(|v| serde_json::from_value::<AssetLists>(v).ok())
        .unwrap_or_default()
}
