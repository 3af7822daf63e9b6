use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use super::PermissionContext;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthRule {
    #[default]
    Any,
    LoggedIn,
    LoggedOut,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionRule {
    #[default]
    Any,
    Required,
    None,
}

/// Explicit `null` decodes like a missing key.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Access rules attached to a content row or fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessRules {
    #[serde(default, deserialize_with = "null_as_default")]
    pub auth: AuthRule,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subscription: SubscriptionRule,
    /// Non-empty => an active subscription on one of these plan slugs is required.
    #[serde(default, deserialize_with = "null_as_default")]
    pub plans: Vec<String>,
}

/// Outcome of decoding a stored `access_rules` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRules {
    Unrestricted,
    Rules(AccessRules),
    Malformed(String),
}

/// Decode `access_rules` stored as an object or as a JSON-encoded string.
/// `null`, absent and empty strings mean no rules.
pub fn parse_access_rules(raw: Option<&Value>) -> ParsedRules {
    let value = match raw {
        None | Some(Value::Null) => return ParsedRules::Unrestricted,
        Some(Value::String(s)) if s.trim().is_empty() => return ParsedRules::Unrestricted,
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Null) => return ParsedRules::Unrestricted,
            Ok(v) => v,
            Err(e) => return ParsedRules::Malformed(e.to_string()),
        },
        Some(v) => v.clone(),
    };
    match serde_json::from_value::<AccessRules>(value) {
        Ok(rules) => ParsedRules::Rules(rules),
        Err(e) => ParsedRules::Malformed(e.to_string()),
    }
}

fn auth_allows(rule: AuthRule, ctx: &PermissionContext) -> bool {
    match rule {
        AuthRule::Any => true,
        AuthRule::LoggedIn => ctx.is_logged_in,
        AuthRule::LoggedOut => !ctx.is_logged_in,
    }
}

fn subscription_allows(rule: SubscriptionRule, ctx: &PermissionContext) -> bool {
    match rule {
        SubscriptionRule::Any => true,
        SubscriptionRule::Required => ctx.has_active_subscription,
        SubscriptionRule::None => !ctx.has_active_subscription,
    }
}

fn plans_allow(plans: &[String], ctx: &PermissionContext) -> bool {
    if plans.is_empty() { return true; }
    ctx.has_active_subscription
        && ctx.plan_slug.as_ref().map(|p| plans.iter().any(|allowed| allowed == p)).unwrap_or(false)
}

/// Pure rule evaluation: every clause must pass; no rules always allows.
pub fn can_access(rules: Option<&AccessRules>, ctx: &PermissionContext) -> bool {
    let Some(rules) = rules else { return true; };
    auth_allows(rules.auth, ctx) && subscription_allows(rules.subscription, ctx) && plans_allow(&rules.plans, ctx)
}

/// Decode then evaluate a stored rules column. Malformed rules deny.
pub fn evaluate_access(raw: Option<&Value>, ctx: &PermissionContext) -> bool {
    match parse_access_rules(raw) {
        ParsedRules::Unrestricted => true,
        ParsedRules::Rules(rules) => can_access(Some(&rules), ctx),
        ParsedRules::Malformed(reason) => {
            warn!(target: "storefront::access", "malformed access_rules treated as deny: {}", reason);
            false
        }
    }
}

#[cfg(test)]
#[path = "authorizer_tests.rs"]
mod tests;
