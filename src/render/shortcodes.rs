//! Post-render fragment substitution.
//!
//! Rendered HTML may contain `[[widget:<slug>]]` and `[[block:<slug>]]` placeholders
//! (emitted by `renderWidget` / `renderBlock` or typed into rich content). Every
//! occurrence is looked up, permission-checked and rendered on its own; all occurrences
//! run concurrently and the results are spliced back in scan order. A fragment that is
//! missing, denied or fails to render becomes an inline HTML comment; it never fails
//! the page. Substitution is a single pass over the page output.

use std::ops::Range;
use std::panic::AssertUnwindSafe;

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::error::AppResult;
use crate::identity::{evaluate_access, PermissionContext};
use crate::storage::{FragmentRow, Store};

use super::environment::ThemeEnvironment;

static SHORTCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(widget|block):([A-Za-z0-9_-]+)\]\]").expect("valid shortcode regex"));
static SLUG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid slug regex"));

pub fn is_valid_slug(slug: &str) -> bool { SLUG_RE.is_match(slug) }

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Widget,
    Block,
}

impl FragmentKind {
    pub fn token_name(&self) -> &'static str {
        match self {
            FragmentKind::Widget => "widget",
            FragmentKind::Block => "block",
        }
    }

    /// `content_type` value of matching rows in the blocks table.
    pub fn content_type(&self) -> &'static str {
        match self {
            FragmentKind::Widget => "widgets",
            FragmentKind::Block => "blocks",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcode {
    pub kind: FragmentKind,
    pub slug: String,
    pub span: Range<usize>,
}

/// All placeholders in `html`, in order of appearance.
pub fn scan(html: &str) -> Vec<Shortcode> {
    SHORTCODE_RE
        .captures_iter(html)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let kind = if &c[1] == "widget" { FragmentKind::Widget } else { FragmentKind::Block };
            Some(Shortcode { kind, slug: c[2].to_string(), span: whole.range() })
        })
        .collect()
}

/// Where fragment rows come from.
pub trait FragmentSource: Send + Sync {
    fn find_fragment<'a>(&'a self, kind: FragmentKind, slug: &'a str) -> BoxFuture<'a, AppResult<Option<FragmentRow>>>;
}

/// Fragments from one tenant's blocks table.
pub struct StoreFragments {
    pub store: Store,
    pub tenant: String,
}

impl FragmentSource for StoreFragments {
    fn find_fragment<'a>(&'a self, kind: FragmentKind, slug: &'a str) -> BoxFuture<'a, AppResult<Option<FragmentRow>>> {
        async move { self.store.find_fragment(&self.tenant, slug, kind.content_type()).await }.boxed()
    }
}

fn comment(kind: FragmentKind, slug: &str, what: &str) -> String {
    format!("<!-- {} \"{}\" {} -->", kind.token_name(), slug, what)
}

fn fragment_context(fragment: &FragmentRow, shared: &Map<String, Value>) -> Value {
    let mut ctx = shared.clone();
    let content = crate::storage::json_object(Some(&fragment.content));
    for (k, v) in content.iter() {
        ctx.insert(k.clone(), v.clone());
    }
    ctx.insert("content".into(), Value::Object(content));
    ctx.insert("fragment".into(), serde_json::json!({
        "slug": fragment.slug,
        "content_type": fragment.content_type,
    }));
    Value::Object(ctx)
}

async fn resolve_one(
    code: &Shortcode,
    env: &ThemeEnvironment,
    fragments: &dyn FragmentSource,
    perm: &PermissionContext,
    shared: &Map<String, Value>,
) -> String {
    let (kind, slug) = (code.kind, code.slug.as_str());
    let fragment = match fragments.find_fragment(kind, slug).await {
        Ok(Some(f)) => f,
        Ok(None) => {
            debug!(target: "storefront::shortcode", "{} '{}' not found", kind.token_name(), slug);
            return comment(kind, slug, "not found");
        }
        Err(e) => {
            error!(target: "storefront::shortcode", tenant = %env.tenant, op = "render_fragment", "lookup of {} '{}' failed: {}", kind.token_name(), slug, e);
            return comment(kind, slug, "failed to render");
        }
    };
    if !evaluate_access(fragment.access_rules.as_ref(), perm) {
        return comment(kind, slug, "access denied");
    }
    let Some(template) = fragment.template_filename.as_deref().filter(|t| !t.trim().is_empty()) else {
        warn!(target: "storefront::shortcode", tenant = %env.tenant, "{} '{}' has no template_filename", kind.token_name(), slug);
        return comment(kind, slug, "failed to render");
    };
    let ctx = fragment_context(&fragment, shared);
    match AssertUnwindSafe(env.render(template, &ctx)).catch_unwind().await {
        Ok(Ok(html)) => html,
        Ok(Err(e)) => {
            error!(target: "storefront::shortcode", tenant = %env.tenant, op = "render_fragment", "{} '{}' failed: {}", kind.token_name(), slug, e);
            comment(kind, slug, "failed to render")
        }
        Err(_) => {
            error!(target: "storefront::shortcode", tenant = %env.tenant, op = "render_fragment", "{} '{}' panicked while rendering", kind.token_name(), slug);
            comment(kind, slug, "failed to render")
        }
    }
}

/// Replace every placeholder in `html`. Text outside placeholders is copied unchanged.
pub async fn process_shortcodes(
    html: &str,
    env: &ThemeEnvironment,
    fragments: &dyn FragmentSource,
    perm: &PermissionContext,
    shared: &Map<String, Value>,
) -> String {
    let codes = scan(html);
    if codes.is_empty() {
        return html.to_string();
    }
    let rendered = join_all(codes.iter().map(|c| resolve_one(c, env, fragments, perm, shared))).await;
    let mut out = String::with_capacity(html.len());
    let mut last = 0usize;
    for (code, replacement) in codes.iter().zip(rendered) {
        out.push_str(&html[last..code.span.start]);
        out.push_str(&replacement);
        last = code.span.end;
    }
    out.push_str(&html[last..]);
    out
}

#[cfg(test)]
#[path = "shortcodes_tests.rs"]
mod tests;
