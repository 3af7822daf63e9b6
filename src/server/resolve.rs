//! Path to content-row resolution.
//!
//! Order: exact slug match, then each known module prefix prepended (`/products`,
//! `/pages`, `/posts`), then the path's own module prefix stripped (scoped to that
//! module). The first hit wins; within one lookup the lowest id wins.
//! Storage errors on the exact match propagate. Errors during the fallbacks count as
//! "no match" and the next heuristic is tried.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tracing::debug;

use crate::error::AppResult;
use crate::storage::{ContentRow, Module, Store};

pub const MODULE_PREFIXES: &[(&str, Module)] = &[
    ("/products", Module::Products),
    ("/pages", Module::Pages),
    ("/posts", Module::Posts),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Via {
    Exact,
    Prefixed(&'static str),
    Stripped(&'static str),
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub row: ContentRow,
    pub via: Via,
}

pub fn has_prefix(path: &str, prefix: &str) -> bool {
    path == prefix || (path.starts_with(prefix) && path[prefix.len()..].starts_with('/'))
}

/// The module prefix `path` starts with, if any.
pub fn module_prefix(path: &str) -> Option<(&'static str, Module)> {
    MODULE_PREFIXES.iter().copied().find(|(p, _)| has_prefix(path, p))
}

/// Slug lookup the resolver runs its heuristics against.
pub trait SlugLookup: Send + Sync {
    fn find_by_slug<'a>(&'a self, tenant: &'a str, slug: &'a str, module: Option<Module>) -> BoxFuture<'a, AppResult<Option<ContentRow>>>;
}

impl SlugLookup for Store {
    fn find_by_slug<'a>(&'a self, tenant: &'a str, slug: &'a str, module: Option<Module>) -> BoxFuture<'a, AppResult<Option<ContentRow>>> {
        async move { self.find_content_by_slug(tenant, slug, module).await }.boxed()
    }
}

async fn fallback(lookup: &dyn SlugLookup, tenant: &str, slug: &str, module: Option<Module>) -> Option<ContentRow> {
    match lookup.find_by_slug(tenant, slug, module).await {
        Ok(hit) => hit,
        Err(e) => {
            debug!(target: "storefront::router", tenant = %tenant, "fallback lookup '{}' skipped: {}", slug, e);
            None
        }
    }
}

pub async fn resolve_content(lookup: &dyn SlugLookup, tenant: &str, path: &str) -> AppResult<Option<Resolved>> {
    if let Some(row) = lookup.find_by_slug(tenant, path, None).await? {
        return Ok(Some(Resolved { row, via: Via::Exact }));
    }
    if path == "/" {
        return Ok(None);
    }
    for &(prefix, _) in MODULE_PREFIXES {
        if has_prefix(path, prefix) {
            continue;
        }
        if let Some(row) = fallback(lookup, tenant, &format!("{}{}", prefix, path), None).await {
            return Ok(Some(Resolved { row, via: Via::Prefixed(prefix) }));
        }
    }
    if let Some((prefix, module)) = module_prefix(path) {
        let stripped = &path[prefix.len()..];
        if !stripped.is_empty() {
            if let Some(row) = fallback(lookup, tenant, stripped, Some(module)).await {
                return Ok(Some(Resolved { row, via: Via::Stripped(prefix) }));
            }
        }
    }
    Ok(None)
}
