use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::PermissionContext;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    /// Billing status as reported by the subscription service (`active`, `trialing`, `canceled`, ...).
    pub status: String,
    #[serde(default)]
    pub plan_slug: Option<String>,
}

/// The current visitor, attached to the request as an extension by the session layer.
/// A request without one is anonymous.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Visitor {
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub subscription: Option<Subscription>,
}

impl Visitor {
    pub fn anonymous() -> Self { Self::default() }

    pub fn is_logged_in(&self) -> bool { self.customer.is_some() }

    pub fn has_active_subscription(&self) -> bool {
        self.subscription
            .as_ref()
            .map(|s| s.status.eq_ignore_ascii_case("active") || s.status.eq_ignore_ascii_case("trialing"))
            .unwrap_or(false)
    }

    pub fn permission_context(&self) -> PermissionContext {
        PermissionContext {
            is_logged_in: self.is_logged_in(),
            has_active_subscription: self.has_active_subscription(),
            plan_slug: self.subscription.as_ref().and_then(|s| s.plan_slug.clone()),
        }
    }
}
