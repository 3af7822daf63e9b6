//! Row types for the tenant tables.
//!
//! Rows keep every column the admin layer wrote: module-specific columns land in a
//! flattened `fields` map so templates see them without the core knowing about them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Site-wide settings record (`site_settings.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub active_theme: Option<String>,
    /// Object, or a JSON-encoded string of one.
    #[serde(default)]
    pub global_styles: Option<Value>,
    #[serde(default)]
    pub site_url: Option<String>,
    /// Content row id rendered for `/`.
    #[serde(default)]
    pub home_page_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeSource {
    Filesystem,
    #[default]
    Database,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeRow {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub inherits: Option<String>,
    /// `{ "assets": { "css": [...], "js": [...] } }`, object or JSON string.
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub source: ThemeSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRow {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Style overrides shipped with the template.
    #[serde(default)]
    pub options: Option<Value>,
}

/// Content category of a row. Unknown module names decode as `Other`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Module {
    Pages,
    Products,
    Posts,
    Classifieds,
    Blocks,
    Widgets,
    #[serde(other)]
    Other,
}

impl Module {
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Pages => "pages",
            Module::Products => "products",
            Module::Posts => "posts",
            Module::Classifieds => "classifieds",
            Module::Blocks => "blocks",
            Module::Widgets => "widgets",
            Module::Other => "other",
        }
    }

    /// Detail table joined 1:1 to content rows of this module.
    /// Unrecognized modules use the pages table.
    pub fn detail_table(&self) -> &'static str {
        match self {
            Module::Products => super::PRODUCTS,
            Module::Posts => super::POSTS,
            Module::Classifieds => super::CLASSIFIED_ADS,
            Module::Blocks | Module::Widgets => super::BLOCKS,
            Module::Pages | Module::Other => super::PAGES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRow {
    pub id: i64,
    pub module: Module,
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A module detail row (pages, products, posts, classified_ads, blocks).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRow {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub content_id: Option<i64>,
    #[serde(default)]
    pub template_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub access_rules: Option<Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl DetailRow {
    /// Absent, `published` and `active` rows are visible to visitors.
    pub fn is_public(&self) -> bool {
        match self.status.as_deref() {
            None => true,
            Some(s) => s.eq_ignore_ascii_case("published") || s.eq_ignore_ascii_case("active"),
        }
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str()).filter(|s| !s.is_empty())
    }

    /// Numeric column, accepting numbers or numeric strings (`"19.99"`).
    pub fn field_f64(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

/// Product child rows (variants, images).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductChildRow {
    pub id: i64,
    pub product_id: i64,
    #[serde(default)]
    pub sort_order: Option<i64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A reusable fragment (block or widget) from `blocks.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FragmentRow {
    #[serde(default)]
    pub id: Option<i64>,
    pub slug: String,
    /// `blocks` or `widgets`.
    pub content_type: String,
    #[serde(default)]
    pub template_filename: Option<String>,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub access_rules: Option<Value>,
}

/// Parse a JSON column that may hold an object directly or a JSON-encoded string.
pub fn json_object(raw: Option<&Value>) -> Map<String, Value> {
    match raw {
        Some(Value::Object(m)) => m.clone(),
        Some(Value::String(s)) if !s.trim().is_empty() => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(m)) => m,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}
