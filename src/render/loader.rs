//! Template source loading.
//!
//! A `TemplateLoader` asks an ordered list of providers for a template name; the first
//! provider that finds it wins. Each provider answers `Ok(Some(source))` (found),
//! `Ok(None)` (not found: try the next provider) or `Err` (stop and fail the render).
//!
//! The template engine resolves names synchronously, so rendering first calls
//! `prefetch`, which loads the requested template and everything it references
//! (`extends`, `include`, `import`, `from`) into `resolved`. The engine's loader then
//! reads only from that map.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, error};

use crate::error::{AppError, AppResult};
use crate::storage::Store;

static TEMPLATE_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{%-?\s*(?:extends|include|import|from)\s+["']([^"']+)["']"#).expect("valid template reference regex")
});

/// Names must stay relative to their provider's root.
pub fn validate_template_name(name: &str) -> AppResult<()> {
    let bad = name.trim().is_empty()
        || name.starts_with('/')
        || name.starts_with('\\')
        || name.contains("..")
        || name.contains('\0');
    if bad {
        return Err(AppError::user("invalid_template_name".to_string(), format!("invalid template name '{}'", name)));
    }
    Ok(())
}

/// Literal template names referenced by a template source, in order of appearance.
pub fn referenced_templates(source: &str) -> Vec<String> {
    TEMPLATE_REF_RE.captures_iter(source).map(|c| c[1].to_string()).collect()
}

pub trait TemplateProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn lookup<'a>(&'a self, name: &'a str) -> BoxFuture<'a, AppResult<Option<String>>>;
}

/// Templates stored in the tenant's `templates` table.
///
/// Tries the bare name, then `<theme>/<name>` for each theme from the child up to
/// `default`. Found sources are cached for the life of the provider.
pub struct DatabaseProvider {
    store: Store,
    tenant: String,
    /// Theme chain, child-first.
    themes: Vec<String>,
    cache: RwLock<HashMap<String, String>>,
}

impl DatabaseProvider {
    /// `chain` is parent-first (as resolved); lookups walk it child-first.
    pub fn new(store: Store, tenant: &str, chain: &[String]) -> Self {
        Self {
            store,
            tenant: tenant.to_string(),
            themes: chain.iter().rev().cloned().collect(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn candidates(&self, name: &str) -> Vec<String> {
        let mut out = vec![name.to_string()];
        out.extend(self.themes.iter().map(|t| format!("{}/{}", t, name)));
        out
    }

    async fn lookup_uncached(&self, name: &str) -> AppResult<Option<String>> {
        for candidate in self.candidates(name) {
            if let Some(row) = self.store.find_template(&self.tenant, &candidate).await? {
                debug!(target: "storefront::loader", "db hit: tenant='{}' name='{}' as '{}'", self.tenant, name, candidate);
                return Ok(Some(row.content));
            }
        }
        Ok(None)
    }
}

impl TemplateProvider for DatabaseProvider {
    fn name(&self) -> &'static str { "database" }

    fn lookup<'a>(&'a self, name: &'a str) -> BoxFuture<'a, AppResult<Option<String>>> {
        async move {
            validate_template_name(name)?;
            let cached = self.cache.read().get(name).cloned();
            if cached.is_some() {
                return Ok(cached);
            }
            let found = self.lookup_uncached(name).await?;
            if let Some(src) = &found {
                self.cache.write().insert(name.to_string(), src.clone());
            }
            Ok(found)
        }
        .boxed()
    }
}

/// Templates not yet migrated into the database (system error pages, module indexes).
pub struct FilesystemProvider {
    root: PathBuf,
}

impl FilesystemProvider {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self { Self { root: root.into() } }
}

impl TemplateProvider for FilesystemProvider {
    fn name(&self) -> &'static str { "filesystem" }

    fn lookup<'a>(&'a self, name: &'a str) -> BoxFuture<'a, AppResult<Option<String>>> {
        async move {
            validate_template_name(name)?;
            let path = self.root.join(name);
            match tokio::fs::read_to_string(&path).await {
                Ok(src) => Ok(Some(src)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::IsADirectory => Ok(None),
                Err(e) => Err(AppError::io("template_read".to_string(), format!("{}: {}", path.display(), e))),
            }
        }
        .boxed()
    }
}

/// Ordered provider chain plus the map of sources the engine may see.
pub struct TemplateLoader {
    providers: Vec<Box<dyn TemplateProvider>>,
    resolved: Arc<RwLock<HashMap<String, String>>>,
}

impl TemplateLoader {
    pub fn new(providers: Vec<Box<dyn TemplateProvider>>) -> Self {
        Self { providers, resolved: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn provider_names(&self) -> Vec<&'static str> { self.providers.iter().map(|p| p.name()).collect() }

    /// Shared handle read by the engine's synchronous loader.
    pub fn resolved_sources(&self) -> Arc<RwLock<HashMap<String, String>>> { self.resolved.clone() }

    /// Resolve one name through the provider chain.
    pub async fn load(&self, name: &str) -> AppResult<Option<String>> {
        validate_template_name(name)?;
        let cached = self.resolved.read().get(name).cloned();
        if cached.is_some() {
            return Ok(cached);
        }
        for provider in &self.providers {
            match provider.lookup(name).await {
                Ok(Some(src)) => {
                    debug!(target: "storefront::loader", "template '{}' served by {}", name, provider.name());
                    self.resolved.write().insert(name.to_string(), src.clone());
                    return Ok(Some(src));
                }
                Ok(None) => continue,
                Err(e) => {
                    error!(target: "storefront::loader", "provider {} failed for '{}': {}", provider.name(), name, e);
                    return Err(e);
                }
            }
        }
        Ok(None)
    }

    /// Load `name` and, recursively, every template it references.
    /// The root must exist; missing references are left for the engine to report.
    pub async fn prefetch(&self, name: &str) -> AppResult<()> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut pending = vec![name.to_string()];
        while let Some(next) = pending.pop() {
            if !seen.insert(next.clone()) { continue; }
            let is_root = next == name;
            if !is_root && validate_template_name(&next).is_err() { continue; }
            match self.load(&next).await? {
                Some(src) => pending.extend(referenced_templates(&src)),
                None if is_root => {
                    return Err(AppError::not_found("template_not_found".to_string(), format!("template '{}' not found", name)));
                }
                None => debug!(target: "storefront::loader", "referenced template '{}' not found (from '{}')", next, name),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
