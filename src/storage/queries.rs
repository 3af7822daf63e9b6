//! Typed lookups over the tenant tables.
//!
//! Each function reads the table documents it needs and performs the join in memory.
//! When a lookup could match several rows the lowest `id` wins, so repeated requests
//! resolve the same way regardless of file order.

use tracing::debug;

use super::{
    ContentRow, DetailRow, FragmentRow, Module, ProductChildRow, Store, TemplateRow, ThemeRow,
    CONTENT, PRODUCT_IMAGES, PRODUCT_VARIANTS, TEMPLATES, THEMES,
};
use crate::error::AppResult;

/// A module detail row joined with its template (LEFT JOIN: the template may be absent)
/// and, for products, the ordered child collections.
#[derive(Debug, Clone)]
pub struct ModuleDetail {
    pub module: Module,
    pub row: DetailRow,
    pub template: Option<TemplateRow>,
    pub variants: Vec<ProductChildRow>,
    pub images: Vec<ProductChildRow>,
}

fn sort_children(rows: &mut [ProductChildRow]) {
    rows.sort_by_key(|r| (r.sort_order.unwrap_or(i64::MAX), r.id));
}

impl Store {
    pub async fn find_theme(&self, tenant: &str, slug: &str) -> AppResult<Option<ThemeRow>> {
        let themes: Vec<ThemeRow> = self.read_table(tenant, THEMES).await?;
        Ok(themes.into_iter().find(|t| t.slug == slug))
    }

    pub async fn find_template(&self, tenant: &str, filename: &str) -> AppResult<Option<TemplateRow>> {
        let rows: Vec<TemplateRow> = self.read_table(tenant, TEMPLATES).await?;
        Ok(rows.into_iter().filter(|t| t.filename == filename).min_by_key(|t| t.id))
    }

    pub async fn find_template_by_id(&self, tenant: &str, id: i64) -> AppResult<Option<TemplateRow>> {
        let rows: Vec<TemplateRow> = self.read_table(tenant, TEMPLATES).await?;
        Ok(rows.into_iter().find(|t| t.id == id))
    }

    pub async fn find_content_by_id(&self, tenant: &str, id: i64) -> AppResult<Option<ContentRow>> {
        let rows: Vec<ContentRow> = self.read_table(tenant, CONTENT).await?;
        Ok(rows.into_iter().find(|c| c.id == id))
    }

    /// Exact slug match, optionally restricted to one module.
    pub async fn find_content_by_slug(&self, tenant: &str, slug: &str, module: Option<Module>) -> AppResult<Option<ContentRow>> {
        let rows: Vec<ContentRow> = self.read_table(tenant, CONTENT).await?;
        let hit = rows
            .into_iter()
            .filter(|c| c.slug == slug && module.map(|m| c.module == m).unwrap_or(true))
            .min_by_key(|c| c.id);
        debug!(target: "storefront::storage", "find_content_by_slug: tenant='{}' slug='{}' module={:?} hit={:?}", tenant, slug, module, hit.as_ref().map(|c| c.id));
        Ok(hit)
    }

    /// Module-specific detail query for one content row.
    /// Returns `None` when no detail row exists or it is not public.
    pub async fn module_detail(&self, tenant: &str, content: &ContentRow) -> AppResult<Option<ModuleDetail>> {
        let table = content.module.detail_table();
        let rows: Vec<DetailRow> = self.read_table(tenant, table).await?;
        let Some(row) = rows
            .into_iter()
            .filter(|r| r.content_id == Some(content.id))
            .min_by_key(|r| r.id.unwrap_or(i64::MAX))
        else {
            return Ok(None);
        };
        if !row.is_public() {
            debug!(target: "storefront::storage", "module_detail: tenant='{}' content={} status={:?} not public", tenant, content.id, row.status);
            return Ok(None);
        }
        let template = match row.template_id {
            Some(id) => self.find_template_by_id(tenant, id).await?,
            None => None,
        };
        let mut detail = ModuleDetail { module: content.module, row, template, variants: Vec::new(), images: Vec::new() };
        if content.module == Module::Products {
            if let Some(product_id) = detail.row.id {
                detail.variants = self.product_children(tenant, PRODUCT_VARIANTS, product_id).await?;
                detail.images = self.product_children(tenant, PRODUCT_IMAGES, product_id).await?;
            }
        }
        Ok(Some(detail))
    }

    async fn product_children(&self, tenant: &str, table: &str, product_id: i64) -> AppResult<Vec<ProductChildRow>> {
        let rows: Vec<ProductChildRow> = self.read_table(tenant, table).await?;
        let mut out: Vec<ProductChildRow> = rows.into_iter().filter(|r| r.product_id == product_id).collect();
        sort_children(&mut out);
        Ok(out)
    }

    /// Public rows of one module joined with their detail rows, in content id order.
    pub async fn list_module(&self, tenant: &str, module: Module) -> AppResult<Vec<(ContentRow, DetailRow)>> {
        let content: Vec<ContentRow> = self.read_table(tenant, CONTENT).await?;
        let details: Vec<DetailRow> = self.read_table(tenant, module.detail_table()).await?;
        let mut out: Vec<(ContentRow, DetailRow)> = content
            .into_iter()
            .filter(|c| c.module == module)
            .filter_map(|c| {
                let d = details.iter().find(|d| d.content_id == Some(c.id) && d.is_public())?;
                Some((c, d.clone()))
            })
            .collect();
        out.sort_by_key(|(c, _)| c.id);
        Ok(out)
    }

    /// Fragment lookup by slug and content type (`blocks` / `widgets`).
    pub async fn find_fragment(&self, tenant: &str, slug: &str, content_type: &str) -> AppResult<Option<FragmentRow>> {
        let rows: Vec<FragmentRow> = self.read_table(tenant, super::BLOCKS).await?;
        Ok(rows
            .into_iter()
            .filter(|f| f.slug == slug && f.content_type == content_type)
            .min_by_key(|f| f.id.unwrap_or(i64::MAX)))
    }
}
