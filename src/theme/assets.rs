use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ThemeConfig;

/// Ordered asset URLs for a resolved theme chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThemeAssets {
    pub css: Vec<String>,
    pub js: Vec<String>,
}

fn asset_url(theme: &str, file: &str) -> String {
    let f = file.trim();
    if f.starts_with("http://") || f.starts_with("https://") || f.starts_with("//") {
        return f.to_string();
    }
    format!("/themes/{}/{}", theme, f.trim_start_matches('/'))
}

/// One URL per listed file per theme, walking the chain parent-first so a child's
/// stylesheets come after (and override) its ancestors'.
pub fn assets_for_chain(chain: &[Arc<ThemeConfig>]) -> ThemeAssets {
    let mut out = ThemeAssets::default();
    for theme in chain {
        out.css.extend(theme.assets.css.iter().filter(|f| !f.trim().is_empty()).map(|f| asset_url(&theme.slug, f)));
        out.js.extend(theme.assets.js.iter().filter(|f| !f.trim().is_empty()).map(|f| asset_url(&theme.slug, f)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ThemeSource;
    use crate::theme::AssetLists;

    fn theme(slug: &str, css: &[&str], js: &[&str]) -> Arc<ThemeConfig> {
        Arc::new(ThemeConfig {
            slug: slug.into(),
            name: slug.into(),
            version: "1".into(),
            inherits: None,
            assets: AssetLists {
                css: css.iter().map(|s| s.to_string()).collect(),
                js: js.iter().map(|s| s.to_string()).collect(),
            },
            source: ThemeSource::Database,
        })
    }

    #[test]
    fn parent_assets_come_first() {
        let chain = vec![
            theme("default", &["css/main.css"], &["js/main.js"]),
            theme("shop", &["/css/shop.css", "css/cart.css"], &[]),
        ];
        let assets = assets_for_chain(&chain);
        assert_eq!(assets.css, vec![
            "/themes/default/css/main.css",
            "/themes/shop/css/shop.css",
            "/themes/shop/css/cart.css",
        ]);
        assert_eq!(assets.js, vec!["/themes/default/js/main.js"]);
    }

    #[test]
    fn absolute_urls_pass_through_and_blanks_are_skipped() {
        let chain = vec![theme("x", &["https://cdn.example.com/a.css", " "], &["//cdn.example.com/b.js"])];
        let assets = assets_for_chain(&chain);
        assert_eq!(assets.css, vec!["https://cdn.example.com/a.css"]);
        assert_eq!(assets.js, vec!["//cdn.example.com/b.js"]);
    }
}
