/// Visitor state the access rules are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionContext {
    pub is_logged_in: bool,
    pub has_active_subscription: bool,
    pub plan_slug: Option<String>,
}
