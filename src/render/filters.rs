//! Filters and globals registered on every theme environment.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use minijinja::{Environment, Value};
use once_cell::sync::Lazy;
use regex::Regex;

use super::shortcodes::{is_valid_slug, FragmentKind};

pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";
pub const DEFAULT_TRUNCATE_LENGTH: usize = 255;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

pub fn register(env: &mut Environment<'static>) {
    env.add_filter("date", date);
    env.add_filter("striptags", striptags);
    env.add_filter("truncate", truncate);
    env.add_filter("parse_json", parse_json);
    env.add_filter("nl2br", nl2br);
    env.add_function("renderWidget", render_widget);
    env.add_function("renderBlock", render_block);
}

fn parse_datetime(value: &Value) -> Option<NaiveDateTime> {
    if let Some(s) = value.as_str() {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_local());
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Some(dt);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Some(dt);
        }
        return NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0));
    }
    let millis = i64::try_from(value.clone()).ok()?;
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// `{{ created_at | date("%Y-%m-%d") }}`. Unparseable input passes through unchanged.
pub fn date(value: Value, format: Option<String>) -> String {
    if value.is_undefined() || value.is_none() {
        return String::new();
    }
    let Some(dt) = parse_datetime(&value) else { return value.to_string(); };
    let fmt = format.unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
    let mut out = String::new();
    // An invalid format string surfaces as a fmt error rather than a panic.
    if write!(out, "{}", dt.format(&fmt)).is_err() {
        return value.to_string();
    }
    out
}

pub fn striptags(value: String) -> String {
    let stripped = TAG_RE.replace_all(&value, "");
    WS_RE.replace_all(stripped.trim(), " ").into_owned()
}

/// Cut to `length` characters and append `end` when anything was removed.
pub fn truncate(value: String, length: Option<usize>, end: Option<String>) -> String {
    let length = length.unwrap_or(DEFAULT_TRUNCATE_LENGTH);
    if value.chars().count() <= length {
        return value;
    }
    let end = end.unwrap_or_else(|| "...".to_string());
    let cut: String = value.chars().take(length).collect();
    format!("{}{}", cut.trim_end(), end)
}

/// Parse a JSON string into a structured value; invalid JSON yields `none`.
/// Values that are already structured pass through.
pub fn parse_json(value: Value) -> Value {
    let Some(s) = value.as_str() else { return value; };
    match serde_json::from_str::<serde_json::Value>(s) {
        Ok(v) => Value::from_serialize(&v),
        Err(_) => Value::from(()),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape first, then turn newlines into `<br>`; the result is marked safe so the
/// inserted tags survive autoescaping.
pub fn nl2br(value: String) -> Value {
    let escaped = escape_html(&value).replace("\r\n", "\n").replace('\n', "<br>");
    Value::from_safe_string(escaped)
}

fn token(kind: FragmentKind, slug: &str) -> Value {
    if !is_valid_slug(slug) {
        return Value::from_safe_string(String::new());
    }
    Value::from_safe_string(format!("[[{}:{}]]", kind.token_name(), slug))
}

/// Emits a placeholder; the widget is resolved after the page render.
pub fn render_widget(slug: String) -> Value { token(FragmentKind::Widget, &slug) }

pub fn render_block(slug: String) -> Value { token(FragmentKind::Block, &slug) }

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(src: &str, ctx: serde_json::Value) -> String {
        let mut env = Environment::new();
        register(&mut env);
        env.set_auto_escape_callback(|_| minijinja::AutoEscape::Html);
        env.add_template_owned("t.html".to_string(), src.to_string()).unwrap();
        env.get_template("t.html").unwrap().render(ctx).unwrap()
    }

    #[test]
    fn date_formats_strings_and_millis() {
        assert_eq!(render("{{ d | date('%Y-%m-%d') }}", json!({"d": "2024-03-05T10:00:00Z"})), "2024-03-05");
        assert_eq!(render("{{ d | date }}", json!({"d": "2024-03-05"})), "March 5, 2024");
        assert_eq!(render("{{ d | date('%H:%M') }}", json!({"d": "2024-03-05 14:30:00"})), "14:30");
        assert_eq!(render("{{ d | date('%Y') }}", json!({"d": 0})), "1970");
        assert_eq!(render("{{ d | date('%Y') }}", json!({"d": "yesterday"})), "yesterday");
        assert_eq!(render("{{ missing | date }}", json!({})), "");
    }

    #[test]
    fn striptags_and_truncate() {
        assert_eq!(render("{{ h | striptags }}", json!({"h": "<p>Hello <b>big</b>\n world</p>"})), "Hello big world");
        assert_eq!(render("{{ t | truncate(5) }}", json!({"t": "Hello world"})), "Hello...");
        assert_eq!(render("{{ t | truncate(6, '…') }}", json!({"t": "Hello world"})), "Hello…");
        assert_eq!(render("{{ t | truncate(50) }}", json!({"t": "short"})), "short");
        assert_eq!(truncate("héllo wörld".into(), Some(4), None), "héll...");
    }

    #[test]
    fn parse_json_is_safe() {
        assert_eq!(render("{{ (s | parse_json).a }}", json!({"s": "{\"a\": 7}"})), "7");
        assert_eq!(render("{{ 'none' if (s | parse_json) is none else 'value' }}", json!({"s": "{oops"})), "none");
        assert_eq!(render("{{ (o | parse_json).a }}", json!({"o": {"a": 1}})), "1");
    }

    #[test]
    fn nl2br_escapes_before_inserting_breaks() {
        assert_eq!(render("{{ t | nl2br }}", json!({"t": "a <b>\nc"})), "a &lt;b&gt;<br>c");
        assert_eq!(render("{{ t | nl2br }}", json!({"t": "x\r\ny"})), "x<br>y");
    }

    #[test]
    fn fragment_globals_emit_placeholders() {
        assert_eq!(render("{{ renderWidget('promo-1') }}", json!({})), "[[widget:promo-1]]");
        assert_eq!(render("{{ renderBlock('hero_main') }}", json!({})), "[[block:hero_main]]");
        assert_eq!(render("{{ renderWidget('bad slug!') }}", json!({})), "");
    }
}
