//! SEO block for content pages.
//!
//! Every field has a fallback chain so templates can print `seo.*` unconditionally:
//! - title: meta title, then content title.
//! - description: meta description, then excerpt, then empty.
//! - og.image: explicit OG image, then hero/featured/product image, then null.
//! - canonical: `site_url` (without trailing slash) plus the request path.

use serde_json::{json, Map, Value};

use crate::storage::{Module, ModuleDetail, SiteSettings};

pub const DEFAULT_ROBOTS: &str = "index, follow";

fn first_str<'a>(maps: &[&'a Map<String, Value>], keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| {
        maps.iter()
            .find_map(|m| m.get(*k).and_then(Value::as_str).map(str::trim).filter(|s| !s.is_empty()))
    })
}

fn product_image(detail: &ModuleDetail) -> Option<String> {
    detail
        .images
        .iter()
        .find_map(|img| ["url", "image_url", "src"].iter().find_map(|k| img.fields.get(*k).and_then(Value::as_str)))
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

pub fn build_seo(settings: &SiteSettings, path: &str, title: &str, data: &Map<String, Value>, detail: &ModuleDetail) -> Value {
    let sources = [data, &detail.row.fields];
    let title = first_str(&sources, &["meta_title", "seo_title"]).unwrap_or(title).to_string();
    let description = first_str(&sources, &["meta_description", "seo_description", "excerpt"]).unwrap_or("").to_string();
    let robots = first_str(&sources, &["robots", "meta_robots"]).unwrap_or(DEFAULT_ROBOTS).to_string();
    let image = first_str(&sources, &["og_image"])
        .or_else(|| first_str(&sources, &["hero_image", "featured_image", "image_url", "image"]))
        .map(str::to_string)
        .or_else(|| product_image(detail));
    let canonical = format!("{}{}", settings.site_url.as_deref().unwrap_or("").trim_end_matches('/'), path);
    let og_title = first_str(&sources, &["og_title"]).map(str::to_string).unwrap_or_else(|| title.clone());
    let og_description = first_str(&sources, &["og_description"]).map(str::to_string).unwrap_or_else(|| description.clone());

    let schema = match detail.module {
        Module::Products => {
            let price = detail.row.field_f64("price").or_else(|| data.get("price").and_then(Value::as_f64));
            let mut s = json!({"@context": "https://schema.org", "@type": "Product", "name": title, "description": description});
            if let Some(img) = &image { s["image"] = json!(img); }
            if let Some(sku) = first_str(&sources, &["sku"]) { s["sku"] = json!(sku); }
            if let Some(p) = price {
                s["offers"] = json!({"@type": "Offer", "price": format!("{:.2}", p), "url": canonical});
            }
            s
        }
        Module::Posts => {
            let mut s = json!({"@context": "https://schema.org", "@type": "Article", "headline": title, "description": description});
            if let Some(img) = &image { s["image"] = json!(img); }
            if let Some(d) = detail.row.created_at.as_deref().or_else(|| first_str(&sources, &["published_at"])) {
                s["datePublished"] = json!(d);
            }
            s
        }
        _ => json!({"@context": "https://schema.org", "@type": "WebPage", "name": title, "url": canonical}),
    };

    json!({
        "title": title,
        "description": description,
        "canonical": canonical,
        "robots": robots,
        "og": {"title": og_title, "description": og_description, "image": image, "url": canonical},
        "schema": schema,
    })
}
