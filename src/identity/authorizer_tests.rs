use super::*;
use serde_json::json;

const AUTHS: [AuthRule; 3] = [AuthRule::Any, AuthRule::LoggedIn, AuthRule::LoggedOut];
const SUBS: [SubscriptionRule; 3] = [SubscriptionRule::Any, SubscriptionRule::Required, SubscriptionRule::None];

fn contexts() -> Vec<PermissionContext> {
    let mut out = Vec::new();
    for logged_in in [false, true] {
        for active in [false, true] {
            for plan in [None, Some("pro"), Some("basic")] {
                out.push(PermissionContext {
                    is_logged_in: logged_in,
                    has_active_subscription: active,
                    plan_slug: plan.map(str::to_string),
                });
            }
        }
    }
    out
}

#[test]
fn no_rules_always_allows() {
    for ctx in contexts() {
        assert!(can_access(None, &ctx));
        assert!(evaluate_access(None, &ctx));
        assert!(evaluate_access(Some(&json!(null)), &ctx));
        assert!(evaluate_access(Some(&json!("")), &ctx));
    }
}

#[test]
fn result_is_the_and_of_three_independent_clauses() {
    let plan_lists: [Vec<String>; 3] = [vec![], vec!["pro".into()], vec!["basic".into(), "pro".into()]];
    for auth in AUTHS {
        for sub in SUBS {
            for plans in plan_lists.iter() {
                for ctx in contexts() {
                    let expect_auth = match auth {
                        AuthRule::Any => true,
                        AuthRule::LoggedIn => ctx.is_logged_in,
                        AuthRule::LoggedOut => !ctx.is_logged_in,
                    };
                    let expect_sub = match sub {
                        SubscriptionRule::Any => true,
                        SubscriptionRule::Required => ctx.has_active_subscription,
                        SubscriptionRule::None => !ctx.has_active_subscription,
                    };
                    let expect_plan = plans.is_empty()
                        || (ctx.has_active_subscription
                            && ctx.plan_slug.as_ref().is_some_and(|p| plans.contains(p)));
                    let rules = AccessRules { auth, subscription: sub, plans: plans.clone() };
                    assert_eq!(
                        can_access(Some(&rules), &ctx),
                        expect_auth && expect_sub && expect_plan,
                        "rules={:?} ctx={:?}", rules, ctx
                    );
                }
            }
        }
    }
}

#[test]
fn plan_allow_list_needs_an_active_subscription() {
    let rules = AccessRules { plans: vec!["pro".into()], ..Default::default() };
    let lapsed = PermissionContext { is_logged_in: true, has_active_subscription: false, plan_slug: Some("pro".into()) };
    assert!(!can_access(Some(&rules), &lapsed));
    let active = PermissionContext { has_active_subscription: true, ..lapsed };
    assert!(can_access(Some(&rules), &active));
}

#[test]
fn parses_objects_and_encoded_strings() {
    let from_obj = parse_access_rules(Some(&json!({"subscription": "required"})));
    assert_eq!(from_obj, ParsedRules::Rules(AccessRules { subscription: SubscriptionRule::Required, ..Default::default() }));
    let from_str = parse_access_rules(Some(&json!("{\"auth\":\"logged_in\",\"plans\":[\"gold\"]}")));
    assert_eq!(from_str, ParsedRules::Rules(AccessRules { auth: AuthRule::LoggedIn, plans: vec!["gold".into()], ..Default::default() }));
    assert_eq!(parse_access_rules(Some(&json!({}))), ParsedRules::Rules(AccessRules::default()));
}

#[test]
fn malformed_rules_fail_closed() {
    let anyone = PermissionContext { is_logged_in: true, has_active_subscription: true, plan_slug: Some("pro".into()) };
    assert!(matches!(parse_access_rules(Some(&json!({"auth": "admins"}))), ParsedRules::Malformed(_)));
    assert!(!evaluate_access(Some(&json!({"auth": "admins"})), &anyone));
    assert!(!evaluate_access(Some(&json!("{broken")), &anyone));
    assert!(!evaluate_access(Some(&json!(42)), &anyone));
}

#[test]
fn null_fields_read_as_their_defaults() {
    let open = json!({"auth": "any", "subscription": "any", "plans": null});
    assert_eq!(parse_access_rules(Some(&open)), ParsedRules::Rules(AccessRules::default()));
    let all_null = json!("{\"auth\":null,\"subscription\":null,\"plans\":null}");
    assert_eq!(parse_access_rules(Some(&all_null)), ParsedRules::Rules(AccessRules::default()));
    for ctx in contexts() {
        assert!(evaluate_access(Some(&open), &ctx));
    }

    let gated = json!({"auth": null, "subscription": "required", "plans": null});
    let subscriber = PermissionContext { is_logged_in: true, has_active_subscription: true, plan_slug: Some("pro".into()) };
    assert!(evaluate_access(Some(&gated), &subscriber));
    assert!(!evaluate_access(Some(&gated), &PermissionContext::default()));
}
