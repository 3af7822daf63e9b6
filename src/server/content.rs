//! Catch-all content route.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::Extension;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info_span, Instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::{evaluate_access, Visitor};
use crate::render::{RenderRequest, Rendered};
use crate::storage::{json_object, ContentRow, Module, ModuleDetail, ProductChildRow};

use super::{host_tenant, listing, resolve, seo, AppState};

pub enum Outcome {
    /// Render with the operation tag used in failure logs.
    Render(RenderRequest, &'static str),
    NotFound(String),
}

/// Percent-decode and normalize: leading slash, no trailing slash except for the root.
pub fn normalize_path(raw: &str) -> AppResult<String> {
    let decoded = urlencoding::decode(raw)
        .map_err(|e| AppError::user("bad_path".to_string(), format!("path '{}' is not valid UTF-8: {}", raw, e)))?;
    let trimmed = decoded.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok("/".to_string());
    }
    Ok(if trimmed.starts_with('/') { trimmed.to_string() } else { format!("/{}", trimmed) })
}

fn child_values(rows: &[ProductChildRow]) -> Value {
    Value::Array(
        rows.iter()
            .map(|r| {
                let mut m = r.fields.clone();
                m.insert("id".into(), json!(r.id));
                m.insert("product_id".into(), json!(r.product_id));
                m.insert("sort_order".into(), json!(r.sort_order));
                Value::Object(m)
            })
            .collect(),
    )
}

/// Content row, editable data and detail columns merged into the record templates see.
fn content_record(row: &ContentRow, data: &Map<String, Value>, detail: &ModuleDetail) -> Map<String, Value> {
    let mut rec = data.clone();
    for (k, v) in &detail.row.fields {
        rec.insert(k.clone(), v.clone());
    }
    rec.insert("id".into(), json!(row.id));
    rec.insert("detail_id".into(), json!(detail.row.id));
    rec.insert("slug".into(), json!(row.slug));
    rec.insert("title".into(), json!(row.title));
    rec.insert("module".into(), json!(row.module.as_str()));
    rec.insert("status".into(), json!(detail.row.status));
    rec.insert("created_at".into(), json!(detail.row.created_at.as_ref().or(row.created_at.as_ref())));
    rec.insert("data".into(), Value::Object(data.clone()));
    rec
}

async fn detail_request(
    state: &AppState,
    tenant: &str,
    path: &str,
    row: &ContentRow,
    detail: ModuleDetail,
    visitor: Visitor,
) -> AppResult<RenderRequest> {
    let Some(template) = detail.template.clone() else {
        return Err(AppError::integrity(
            "template_unassigned".to_string(),
            format!("{} row for content {} has no template (template_id={:?})", row.module.as_str(), row.id, detail.row.template_id),
        ));
    };
    let settings = state.store.read_settings(tenant).await?;
    let data = json_object(Some(&row.data));
    let rules = detail.row.access_rules.as_ref().or_else(|| data.get("access_rules"));
    let subscription_required = !evaluate_access(rules, &visitor.permission_context());
    let record = Value::Object(content_record(row, &data, &detail));

    let mut req = RenderRequest::new(tenant, &template.filename, visitor);
    req.style_overrides = template.options.clone();
    let ctx = &mut req.context;
    ctx.insert("content".into(), record.clone());
    ctx.insert("page".into(), record.clone());
    ctx.insert("data".into(), Value::Object(data.clone()));
    ctx.insert("blocks".into(), data.get("blocks").cloned().unwrap_or(Value::Null));
    ctx.insert("template".into(), json!({"id": template.id, "filename": template.filename}));
    ctx.insert("seo".into(), seo::build_seo(&settings, path, &row.title, &data, &detail));
    ctx.insert("subscription_required".into(), json!(subscription_required));
    ctx.insert("module".into(), json!(row.module.as_str()));
    ctx.insert("path".into(), json!(path));
    match detail.module {
        Module::Products => {
            let mut product = record;
            product["variants"] = child_values(&detail.variants);
            product["images"] = child_values(&detail.images);
            ctx.insert("variants".into(), product["variants"].clone());
            ctx.insert("images".into(), product["images"].clone());
            ctx.insert("product".into(), product);
        }
        Module::Classifieds => { ctx.insert("ad".into(), record); }
        Module::Posts => { ctx.insert("post".into(), record); }
        _ => {}
    }
    Ok(req)
}

/// Map a request path to the render it needs (or a 404).
pub async fn build_outcome(
    state: &AppState,
    tenant: &str,
    raw_path: &str,
    params: &HashMap<String, String>,
    visitor: Visitor,
) -> AppResult<Outcome> {
    let mut path = normalize_path(raw_path)?;
    if path == "/" {
        let settings = state.store.read_settings(tenant).await?;
        if let Some(id) = settings.home_page_id {
            match state.store.find_content_by_id(tenant, id).await? {
                Some(home) => path = normalize_path(&home.slug)?,
                None => debug!(target: "storefront::router", tenant = %tenant, "home_page_id {} has no content row", id),
            }
        }
    }

    if let Some(module) = listing::index_module(&path) {
        let req = listing::index_request(&state.store, tenant, module, params, visitor).await?;
        return Ok(Outcome::Render(req, "render_index"));
    }

    let Some(resolved) = resolve::resolve_content(&state.store, tenant, &path).await? else {
        return Ok(Outcome::NotFound(path));
    };
    debug!(target: "storefront::router", tenant = %tenant, "'{}' -> content {} via {:?}", path, resolved.row.id, resolved.via);
    let Some(detail) = state.store.module_detail(tenant, &resolved.row).await? else {
        return Ok(Outcome::NotFound(path));
    };
    let req = detail_request(state, tenant, &path, &resolved.row, detail, visitor).await?;
    Ok(Outcome::Render(req, "render_content"))
}

pub async fn render_content(
    state: &AppState,
    tenant: &str,
    raw_path: &str,
    params: &HashMap<String, String>,
    visitor: Visitor,
) -> Rendered {
    let pipeline = &state.pipeline;
    match build_outcome(state, tenant, raw_path, params, visitor.clone()).await {
        Ok(Outcome::Render(req, op)) => pipeline.render_page(req, StatusCode::OK, op).await,
        Ok(Outcome::NotFound(path)) => pipeline.render_not_found(tenant, visitor, &path).await,
        Err(e) if e.is_not_found() => pipeline.render_not_found(tenant, visitor, raw_path).await,
        Err(e @ AppError::UserInput { .. }) => Rendered::plain(StatusCode::BAD_REQUEST, e.message()),
        Err(e) => {
            error!(target: "storefront::router", tenant = %tenant, op = "render_content", path = %raw_path, "content resolution failed: {}", e);
            pipeline.render_error(tenant, visitor).await
        }
    }
}

pub async fn content_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
    visitor: Option<Extension<Visitor>>,
) -> Rendered {
    let tenant = host_tenant(&headers, &state.store, &state.config.default_tenant);
    let params = Query::<HashMap<String, String>>::try_from_uri(&uri).map(|q| q.0).unwrap_or_default();
    let visitor = visitor.map(|Extension(v)| v).unwrap_or_default();
    let span = info_span!("request", request_id = %Uuid::new_v4(), tenant = %tenant, path = %uri.path());
    render_content(&state, &tenant, uri.path(), &params, visitor).instrument(span).await
}
