//! Style option precedence: system defaults < global site styles < template overrides.
//!
//! Null or blank values count as unset in both tiers, and so does a template override
//! equal to the system default for its key.
//! Templates ship with baseline values and must not clobber an administrator's global
//! choice with them.

use serde_json::{Map, Value};

use crate::storage::json_object;

pub const HEADING_FONT: &str = "google_font_heading";
pub const BODY_FONT: &str = "google_font_body";

pub const SYSTEM_DEFAULTS: &[(&str, &str)] = &[
    ("primary_color", "#2563eb"),
    ("secondary_color", "#64748b"),
    ("accent_color", "#f59e0b"),
    ("text_color", "#1f2937"),
    ("background_color", "#ffffff"),
    ("link_color", "#2563eb"),
    (BODY_FONT, "Inter"),
    ("font_size_base", "16px"),
    ("border_radius", "0.375rem"),
    ("container_width", "1200px"),
    ("button_style", "rounded"),
];

pub fn system_defaults() -> Map<String, Value> {
    SYSTEM_DEFAULTS.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect()
}

fn is_blank(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Merge the three tiers. Both inputs may be objects, JSON strings, or absent.
pub fn resolve_styles(global: Option<&Value>, overrides: Option<&Value>) -> Map<String, Value> {
    let defaults = system_defaults();
    let mut out = defaults.clone();
    for (k, v) in json_object(global) {
        if !is_blank(Some(&v)) {
            out.insert(k, v);
        }
    }
    for (k, v) in json_object(overrides) {
        if is_blank(Some(&v)) || defaults.get(&k) == Some(&v) {
            continue;
        }
        out.insert(k, v);
    }
    if is_blank(out.get(HEADING_FONT)) {
        if let Some(body) = out.get(BODY_FONT).cloned() {
            out.insert(HEADING_FONT.to_string(), body);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn global_choice_survives_default_valued_override() {
        let merged = resolve_styles(
            Some(&json!({"google_font_body": "Roboto"})),
            Some(&json!({"google_font_body": "Inter", "primary_color": "#ff0000"})),
        );
        assert_eq!(merged["google_font_body"], "Roboto");
        assert_eq!(merged["primary_color"], "#ff0000");
        assert_eq!(merged["google_font_heading"], "Roboto");
    }

    #[test]
    fn overrides_equal_to_defaults_never_apply() {
        let global = json!({"primary_color": "#111111", "link_color": "#222222"});
        let overrides: Map<String, Value> = system_defaults();
        let merged = resolve_styles(Some(&global), Some(&Value::Object(overrides.clone())));
        for (k, default) in overrides.iter() {
            let expected = global.get(k).unwrap_or(default);
            assert_eq!(merged.get(k), Some(expected), "key {}", k);
        }
    }

    #[test]
    fn blank_values_never_clobber_lower_tiers() {
        let merged = resolve_styles(
            Some(&json!({"primary_color": "#111111", "link_color": "  "})),
            Some(&json!({"primary_color": "", "accent_color": " ", "google_font_body": "Lato"})),
        );
        assert_eq!(merged["primary_color"], "#111111");
        assert_eq!(merged["link_color"], "#2563eb");
        assert_eq!(merged["accent_color"], "#f59e0b");
        assert_eq!(merged["google_font_body"], "Lato");
        assert_eq!(merged["google_font_heading"], "Lato");
    }

    #[test]
    fn reapplying_the_result_is_stable() {
        let first = resolve_styles(
            Some(&json!({"accent_color": "#000", "google_font_heading": "Lora"})),
            Some(&json!({"container_width": "960px"})),
        );
        let second = resolve_styles(Some(&Value::Object(first.clone())), None);
        assert_eq!(first, second);
    }

    #[test]
    fn accepts_empty_and_encoded_inputs() {
        let merged = resolve_styles(None, None);
        assert_eq!(merged["primary_color"], "#2563eb");
        assert_eq!(merged["google_font_heading"], "Inter");

        let merged = resolve_styles(Some(&json!("{\"google_font_heading\": \"\"}")), Some(&json!("not json")));
        assert_eq!(merged["google_font_heading"], "Inter");

        let merged = resolve_styles(Some(&json!({"primary_color": null})), Some(&json!({"primary_color": null})));
        assert_eq!(merged["primary_color"], "#2563eb");
    }
}
