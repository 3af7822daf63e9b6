//! Per-(tenant, theme) template environments.
//!
//! An environment owns its `TemplateLoader` (and therefore the template sources and
//! compiled templates it has seen). Dropping an environment from the cache is how edits
//! to templates, themes or settings become visible.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use minijinja::{AutoEscape, Environment};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::storage::Store;
use crate::theme::{ThemeRegistry, DEFAULT_THEME};

use super::filters;
use super::loader::{DatabaseProvider, FilesystemProvider, TemplateLoader, TemplateProvider};

pub struct ThemeEnvironment {
    pub tenant: String,
    /// Theme actually used (the requested one, or `default` when it does not exist).
    pub theme: String,
    /// Inheritance chain, parent-first.
    pub chain: Vec<String>,
    loader: Arc<TemplateLoader>,
    env: Environment<'static>,
}

impl ThemeEnvironment {
    fn build(tenant: &str, theme: &str, chain: Vec<String>, loader: TemplateLoader) -> Self {
        let loader = Arc::new(loader);
        let mut env = Environment::new();
        let sources = loader.resolved_sources();
        env.set_loader(move |name| Ok(sources.read().get(name).cloned()));
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        filters::register(&mut env);
        Self { tenant: tenant.to_string(), theme: theme.to_string(), chain, loader, env }
    }

    pub fn loader(&self) -> &TemplateLoader { &self.loader }

    /// Fetch `name` and its dependencies, then render it with `ctx`.
    pub async fn render(&self, name: &str, ctx: &Value) -> AppResult<String> {
        self.loader.prefetch(name).await?;
        let template = self.env.get_template(name)?;
        Ok(template.render(ctx)?)
    }

    /// Raw source through the provider chain, without rendering.
    pub async fn load_raw(&self, name: &str) -> AppResult<Option<String>> {
        self.loader.load(name).await
    }
}

type EnvKey = (String, String);

pub struct EnvironmentCache {
    store: Store,
    registry: ThemeRegistry,
    template_root: PathBuf,
    envs: RwLock<HashMap<EnvKey, Arc<ThemeEnvironment>>>,
}

impl EnvironmentCache {
    pub fn new(store: Store, registry: ThemeRegistry, template_root: impl Into<PathBuf>) -> Self {
        Self { store, registry, template_root: template_root.into(), envs: RwLock::new(HashMap::new()) }
    }

    /// Environment for `theme` in `tenant`, keyed by the requested slug.
    /// A theme the tenant does not have falls back to `default`.
    pub async fn get_env(&self, tenant: &str, theme: &str) -> AppResult<Arc<ThemeEnvironment>> {
        let key = (tenant.to_string(), theme.to_string());
        let cached = self.envs.read().get(&key).cloned();
        if let Some(env) = cached {
            return Ok(env);
        }

        let mut effective = theme.to_string();
        if theme != DEFAULT_THEME && !self.registry.theme_exists(tenant, theme).await? {
            warn!(target: "storefront::env", tenant = %tenant, "theme '{}' not found, using '{}'", theme, DEFAULT_THEME);
            effective = DEFAULT_THEME.to_string();
        }
        let chain = self.registry.resolve_theme_chain(tenant, &effective).await?;
        let providers: Vec<Box<dyn TemplateProvider>> = vec![
            Box::new(DatabaseProvider::new(self.store.clone(), tenant, &chain)) as Box<dyn TemplateProvider>,
            Box::new(FilesystemProvider::new(self.template_root.clone())),
        ];
        let loader = TemplateLoader::new(providers);
        debug!(target: "storefront::env", "environment created: tenant='{}' theme='{}' chain={:?}", tenant, effective, chain);
        let env = Arc::new(ThemeEnvironment::build(tenant, &effective, chain, loader));

        // Two requests may race to build the same key; keep whichever landed first.
        let mut envs = self.envs.write();
        Ok(envs.entry(key).or_insert(env).clone())
    }

    pub fn cached_len(&self) -> usize { self.envs.read().len() }

    pub fn invalidate_tenant(&self, tenant: &str) {
        self.envs.write().retain(|(t, _), _| t != tenant);
        self.registry.invalidate_tenant(tenant);
    }

    pub fn invalidate_all(&self) {
        self.envs.write().clear();
        self.registry.invalidate_all();
    }
}
