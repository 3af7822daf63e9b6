//! Module index pages (`/pages`, `/products`, `/posts`).
//!
//! Products accept `q`, `min_price`, `max_price`, `sort` (`price` | `title` |
//! `created_at`) and `order` (`asc` | `desc`); the default is title ascending. Other
//! modules list newest first.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::AppResult;
use crate::identity::Visitor;
use crate::render::RenderRequest;
use crate::storage::{json_object, ContentRow, DetailRow, Module, Store};

use super::resolve::MODULE_PREFIXES;

/// The module whose index lives at exactly `path`.
pub fn index_module(path: &str) -> Option<Module> {
    MODULE_PREFIXES.iter().find(|(p, _)| *p == path).map(|(_, m)| *m)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Price,
    Title,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort: SortKey,
    pub order: SortOrder,
}

impl Default for ProductQuery {
    fn default() -> Self { Self { q: None, min_price: None, max_price: None, sort: SortKey::Title, order: SortOrder::Asc } }
}

impl ProductQuery {
    /// Unknown or unparseable parameters keep their defaults.
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |k: &str| params.get(k).map(|v| v.trim()).filter(|v| !v.is_empty());
        let mut out = Self::default();
        out.q = get("q").map(str::to_string);
        out.min_price = get("min_price").and_then(|v| v.parse().ok());
        out.max_price = get("max_price").and_then(|v| v.parse().ok());
        out.sort = match get("sort") {
            Some("price") => SortKey::Price,
            Some("created_at") => SortKey::CreatedAt,
            _ => SortKey::Title,
        };
        out.order = match get("order") {
            Some(o) if o.eq_ignore_ascii_case("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        };
        out
    }

    fn matches(&self, item: &ListItem) -> bool {
        if let Some(q) = &self.q {
            let needle = q.to_lowercase();
            let hay = [Some(item.content.title.as_str()), item.text("sku"), item.text("search_index")];
            if !hay.iter().flatten().any(|h| h.to_lowercase().contains(&needle)) {
                return false;
            }
        }
        let price = item.detail.field_f64("price");
        if let Some(min) = self.min_price {
            if price.map(|p| p < min).unwrap_or(true) { return false; }
        }
        if let Some(max) = self.max_price {
            if price.map(|p| p > max).unwrap_or(true) { return false; }
        }
        true
    }
}

struct ListItem {
    content: ContentRow,
    detail: DetailRow,
    data: Map<String, Value>,
}

impl ListItem {
    fn text(&self, key: &str) -> Option<&str> {
        self.detail.field_str(key).or_else(|| self.data.get(key).and_then(Value::as_str))
    }

    fn created_at(&self) -> Option<&str> {
        self.detail.created_at.as_deref().or(self.content.created_at.as_deref())
    }

    fn to_value(&self) -> Value {
        let mut out = self.data.clone();
        for (k, v) in &self.detail.fields {
            out.insert(k.clone(), v.clone());
        }
        out.insert("id".into(), json!(self.content.id));
        out.insert("slug".into(), json!(self.content.slug));
        out.insert("title".into(), json!(self.content.title));
        out.insert("module".into(), json!(self.content.module.as_str()));
        out.insert("created_at".into(), json!(self.created_at()));
        out.insert("status".into(), json!(self.detail.status));
        out.insert("data".into(), Value::Object(self.data.clone()));
        Value::Object(out)
    }
}

fn compare(a: &ListItem, b: &ListItem, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => a.content.title.to_lowercase().cmp(&b.content.title.to_lowercase()),
        SortKey::CreatedAt => a.created_at().cmp(&b.created_at()),
        SortKey::Price => match (a.detail.field_f64("price"), b.detail.field_f64("price")) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Public rows of `module`, filtered and sorted for its index page.
pub async fn list_items(store: &Store, tenant: &str, module: Module, query: Option<&ProductQuery>) -> AppResult<Vec<Value>> {
    let mut items: Vec<ListItem> = store
        .list_module(tenant, module)
        .await?
        .into_iter()
        .map(|(content, detail)| {
            let data = json_object(Some(&content.data));
            ListItem { content, detail, data }
        })
        .collect();
    match query {
        Some(q) => {
            items.retain(|i| q.matches(i));
            items.sort_by(|a, b| {
                let ord = compare(a, b, q.sort);
                if q.order == SortOrder::Desc { ord.reverse() } else { ord }
            });
        }
        None => items.sort_by(|a, b| compare(b, a, SortKey::CreatedAt)),
    }
    Ok(items.iter().map(ListItem::to_value).collect())
}

pub async fn index_request(
    store: &Store,
    tenant: &str,
    module: Module,
    params: &HashMap<String, String>,
    visitor: Visitor,
) -> AppResult<RenderRequest> {
    let query = (module == Module::Products).then(|| ProductQuery::from_params(params));
    let items = list_items(store, tenant, module, query.as_ref()).await?;
    let mut req = RenderRequest::new(tenant, &format!("{}/index.html", module.as_str()), visitor);
    req.context.insert("items".into(), Value::Array(items));
    req.context.insert("module".into(), json!(module.as_str()));
    req.context.insert("path".into(), json!(format!("/{}", module.as_str())));
    if let Some(q) = query {
        req.context.insert("query".into(), serde_json::to_value(&q)?);
    }
    Ok(req)
}
