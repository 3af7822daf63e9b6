use std::path::PathBuf;

use axum::{Extension, Router};
use serde_json::json;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use storefront::config::ServerConfig;
use storefront::identity::{Customer, Subscription, Visitor};
use storefront::server::{build_router, AppState};
use storefront::storage::{
    Store, BLOCKS, CONTENT, PAGES, PRODUCTS, PRODUCT_VARIANTS, TEMPLATES, THEMES,
};

const TENANT: &str = "acme";

struct Guard(JoinHandle<()>);
impl Drop for Guard { fn drop(&mut self) { self.0.abort(); } }

fn seed(store: &Store) {
    store
        .write_settings(TENANT, &serde_json::from_value(json!({
            "site_name": "Acme",
            "active_theme": "shop",
            "global_styles": {"google_font_body": "Roboto"},
            "site_url": "https://acme.test/",
            "home_page_id": 1
        })).unwrap())
        .unwrap();
    store
        .write_table(TENANT, THEMES, &[json!({"slug": "shop", "inherits": "default", "config": {"assets": {"css": ["css/shop.css"]}}})])
        .unwrap();
    store
        .write_table(TENANT, TEMPLATES, &[
            json!({"id": 1, "filename": "page.html",
                   "content": "<h1>{{ page.title }}</h1>|sub={{ 'yes' if subscription_required else 'no' }}|body={{ page.body | safe }}|font={{ styles.google_font_body }}/{{ styles.primary_color }}|css={{ theme_css | join(',') | safe }}",
                   "options": {"google_font_body": "Inter", "primary_color": "#ff0000"}}),
            json!({"id": 2, "filename": "product.html",
                   "content": "{{ product.title }}|{{ product.price }}|{% for v in product.variants %}{{ v.name }},{% endfor %}|{{ seo.canonical | safe }}"}),
            json!({"id": 3, "filename": "widgets/promo.html", "content": "<aside>{{ headline }}</aside>"}),
            json!({"id": 4, "filename": "styles/custom.css", "content": "body{color:red}"}),
        ])
        .unwrap();
    store
        .write_table(TENANT, CONTENT, &[
            json!({"id": 1, "module": "pages", "slug": "/home", "title": "Home",
                   "data": {"body": "Welcome [[widget:promo]] [[widget:missing-slug]]"}}),
            json!({"id": 2, "module": "pages", "slug": "/premium", "title": "Premium", "data": {"body": "Members content"}}),
            json!({"id": 3, "module": "products", "slug": "/products/my-item", "title": "My Item", "created_at": "2024-01-01"}),
            json!({"id": 4, "module": "products", "slug": "/mug", "title": "Mug", "created_at": "2024-02-01"}),
            json!({"id": 5, "module": "pages", "slug": "/broken", "title": "Broken"}),
            json!({"id": 6, "module": "pages", "slug": "/draft", "title": "Draft"}),
        ])
        .unwrap();
    store
        .write_table(TENANT, PAGES, &[
            json!({"id": 1, "content_id": 1, "template_id": 1}),
            json!({"id": 2, "content_id": 2, "template_id": 1, "access_rules": {"subscription": "required"}}),
            json!({"id": 3, "content_id": 5}),
            json!({"id": 4, "content_id": 6, "template_id": 1, "status": "draft"}),
        ])
        .unwrap();
    store
        .write_table(TENANT, PRODUCTS, &[
            json!({"id": 10, "content_id": 3, "template_id": 2, "price": 19.5}),
            json!({"id": 11, "content_id": 4, "template_id": 2, "price": 5}),
        ])
        .unwrap();
    store
        .write_table(TENANT, PRODUCT_VARIANTS, &[
            json!({"id": 2, "product_id": 10, "name": "Large", "sort_order": 2}),
            json!({"id": 1, "product_id": 10, "name": "Small", "sort_order": 1}),
        ])
        .unwrap();
    store
        .write_table(TENANT, BLOCKS, &[json!({
            "id": 1, "slug": "promo", "content_type": "widgets",
            "template_filename": "widgets/promo.html", "content": {"headline": "Sale"}
        })])
        .unwrap();
}

fn state(tmp: &TempDir) -> AppState {
    let config = ServerConfig {
        http_port: 0,
        db_root: tmp.path().to_path_buf(),
        template_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates"),
        default_tenant: TENANT.to_string(),
    };
    let state = AppState::new(config).unwrap();
    seed(&state.store);
    state
}

async fn serve(app: Router) -> (Guard, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server task error: {e:?}");
        }
    });
    (Guard(handle), format!("http://{}", addr))
}

async fn get(base: &str, path: &str) -> (u16, String, String) {
    let resp = reqwest::get(format!("{}{}", base, path)).await.expect("request");
    let status = resp.status().as_u16();
    let ctype = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    (status, ctype, resp.text().await.unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn home_page_renders_with_styles_assets_and_widgets() {
    let tmp = tempfile::tempdir().unwrap();
    let (_g, base) = serve(build_router(state(&tmp))).await;

    let (status, ctype, body) = get(&base, "/").await;
    assert_eq!(status, 200);
    assert!(ctype.starts_with("text/html"));
    assert!(body.starts_with("<h1>Home</h1>|sub=no|"), "{}", body);
    assert!(body.contains("Welcome <aside>Sale</aside> <!-- widget \"missing-slug\" not found -->"), "{}", body);
    assert!(body.contains("font=Roboto/#ff0000"), "{}", body);
    assert!(body.contains("css=/themes/default/css/main.css,/themes/shop/css/shop.css"), "{}", body);

    let (_, _, health) = get(&base, "/healthz").await;
    assert_eq!(health, "ok");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subscription_flag_is_advisory() {
    let tmp = tempfile::tempdir().unwrap();
    let app_state = state(&tmp);
    let (_g, base) = serve(build_router(app_state.clone())).await;

    let (status, _, body) = get(&base, "/premium").await;
    assert_eq!(status, 200);
    assert!(body.contains("sub=yes"), "{}", body);
    assert!(body.contains("body=Members content"), "{}", body);

    let (status, _, body) = get(&base, "/premium/").await;
    assert_eq!(status, 200);
    assert!(body.contains("sub=yes"));

    let subscriber = Visitor {
        customer: Some(Customer { id: "c1".into(), ..Default::default() }),
        subscription: Some(Subscription { status: "active".into(), plan_slug: Some("pro".into()) }),
    };
    let (_g2, base2) = serve(build_router(app_state).layer(Extension(subscriber))).await;
    let (status, _, body) = get(&base2, "/premium").await;
    assert_eq!(status, 200);
    assert!(body.contains("sub=no"), "{}", body);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slug_fallbacks_resolve_in_both_directions() {
    let tmp = tempfile::tempdir().unwrap();
    let (_g, base) = serve(build_router(state(&tmp))).await;

    let (status, _, body) = get(&base, "/my-item").await;
    assert_eq!(status, 200);
    assert_eq!(body, "My Item|19.5|Small,Large,|https://acme.test/my-item");

    let (status, _, body) = get(&base, "/products/mug").await;
    assert_eq!(status, 200);
    assert_eq!(body, "Mug|5||https://acme.test/products/mug");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_unpublished_and_corrupt_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let (_g, base) = serve(build_router(state(&tmp))).await;

    let (status, _, body) = get(&base, "/no-such-page").await;
    assert_eq!(status, 404);
    assert!(body.contains("Page not found"), "{}", body);
    assert!(body.contains("no-such-page"));

    let (status, _, _) = get(&base, "/draft").await;
    assert_eq!(status, 404);

    let (status, _, body) = get(&base, "/broken").await;
    assert_eq!(status, 500);
    assert!(body.contains("Something went wrong"), "{}", body);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn product_index_supports_sorting() {
    let tmp = tempfile::tempdir().unwrap();
    let (_g, base) = serve(build_router(state(&tmp))).await;

    let (status, _, body) = get(&base, "/products").await;
    assert_eq!(status, 200);
    let (mug, item) = (body.find(">Mug<").unwrap(), body.find(">My Item<").unwrap());
    assert!(mug < item, "title ascending");

    let (_, _, body) = get(&base, "/products?sort=price&order=desc").await;
    let (mug, item) = (body.find(">Mug<").unwrap(), body.find(">My Item<").unwrap());
    assert!(item < mug, "price descending");

    let (_, _, body) = get(&base, "/products?q=item").await;
    assert!(body.contains(">My Item<"));
    assert!(!body.contains(">Mug<"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stylesheets_and_theme_assets() {
    let tmp = tempfile::tempdir().unwrap();
    let (_g, base) = serve(build_router(state(&tmp))).await;

    let (status, ctype, body) = get(&base, "/styles/custom.css").await;
    assert_eq!(status, 200);
    assert!(ctype.starts_with("text/css"));
    assert_eq!(body, "body{color:red}");

    let (status, _, _) = get(&base, "/styles/absent.css").await;
    assert_eq!(status, 404);

    let (status, ctype, body) = get(&base, "/themes/default/css/main.css").await;
    assert_eq!(status, 200);
    assert!(ctype.starts_with("text/css"));
    assert!(body.contains("--font-body"));

    let (status, _, _) = get(&base, "/themes/shop/css/shop.css").await;
    assert_eq!(status, 404);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn edits_show_up_after_invalidation() {
    let tmp = tempfile::tempdir().unwrap();
    let app_state = state(&tmp);
    let (_g, base) = serve(build_router(app_state.clone())).await;

    let (_, _, before) = get(&base, "/my-item").await;
    assert!(before.starts_with("My Item|"));

    app_state
        .store
        .write_table(TENANT, TEMPLATES, &[json!({"id": 2, "filename": "product.html", "content": "edited {{ product.title }}"})])
        .unwrap();
    let (_, _, cached) = get(&base, "/my-item").await;
    assert_eq!(cached, before);

    app_state.invalidate_tenant(TENANT);
    let (_, _, after) = get(&base, "/my-item").await;
    assert_eq!(after, "edited My Item");
}
