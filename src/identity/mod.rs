//! Visitor identity and access-rule evaluation.
//! Authentication and session issuance happen upstream; this module only consumes the
//! resulting `Visitor` and evaluates content/fragment access rules against it.

mod visitor;
mod request_context;
mod authorizer;

pub use visitor::{Customer, Subscription, Visitor};
pub use request_context::PermissionContext;
pub use authorizer::{can_access, evaluate_access, parse_access_rules, AccessRules, AuthRule, ParsedRules, SubscriptionRule};
