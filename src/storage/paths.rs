use std::path::PathBuf;

use super::Store;
use crate::error::{AppError, AppResult};

/// Tenant names are folder names: ASCII alphanumerics plus `.`, `-`, `_`, never `..`.
pub fn is_valid_tenant_name(tenant: &str) -> bool {
    !tenant.is_empty()
        && tenant != "."
        && !tenant.contains("..")
        && tenant.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

impl Store {
    pub(crate) fn tenant_dir(&self, tenant: &str) -> AppResult<PathBuf> {
        if !is_valid_tenant_name(tenant) {
            return Err(AppError::user("invalid_tenant".to_string(), format!("invalid tenant name '{}'", tenant)));
        }
        Ok(self.root.join(tenant))
    }

    pub(crate) fn table_path(&self, tenant: &str, table: &str) -> AppResult<PathBuf> {
        Ok(self.tenant_dir(tenant)?.join(format!("{}.json", table)))
    }
}
