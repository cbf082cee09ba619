use crate::models::profile::Role;
use crate::models::tenant::SubscriptionStatus;

pub const LOGIN_PATH: &str = "/login";
pub const APP_HOME: &str = "/app";
pub const DASHBOARD_HOME: &str = "/dashboard";
pub const BILLING_PATH: &str = "/dashboard/billing";
pub const BLOCKED_PATH: &str = "/blocked";
pub const ONBOARDING_PATH: &str = "/onboarding";

/// What the shell should do for the current navigation. Exactly one
/// decision is produced per evaluation; nothing is persisted between
/// evaluations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Loading,
    Redirect(String),
    Allow,
}

/// Snapshot of the authenticated profile, as far as the gate cares.
#[derive(Debug, Clone)]
pub struct IdentitySnapshot {
    pub role: Role,
    pub cref: Option<String>,
}

/// Snapshot of the tenant's billing state. `subscription_status` is `None`
/// when the tenant row exists but carries no recognizable status.
#[derive(Debug, Clone)]
pub struct TenantSnapshot {
    pub subscription_status: Option<SubscriptionStatus>,
}

pub struct GateContext<'a> {
    /// Identity context still resolving (token refresh in flight).
    pub identity_loading: bool,
    /// Tenant context still resolving.
    pub tenant_loading: bool,
    pub identity: Option<&'a IdentitySnapshot>,
    pub tenant: Option<&'a TenantSnapshot>,
    pub path: &'a str,
    pub allowed_roles: &'a [Role],
}

fn role_home(role: Role) -> &'static str {
    match role {
        Role::Client => APP_HOME,
        Role::Coach | Role::Admin => DASHBOARD_HOME,
    }
}

/// Evaluate the gate for one navigation. Rules are checked in priority
/// order; the first match wins.
pub fn evaluate(ctx: &GateContext) -> Decision {
    // 1. Identity context not yet resolved.
    if ctx.identity_loading {
        return Decision::Loading;
    }

    // 2. No identity: to login, preserving the originating location.
    let identity = match ctx.identity {
        Some(i) => i,
        None => return Decision::Redirect(format!("{LOGIN_PATH}?from={}", ctx.path)),
    };

    // 3. Role outside the allowed set: send to the role's home.
    if !ctx.allowed_roles.contains(&identity.role) {
        return Decision::Redirect(role_home(identity.role).to_string());
    }

    // 4. Athletes never browse coach paths.
    if identity.role == Role::Client && !ctx.path.starts_with(APP_HOME) {
        return Decision::Redirect(APP_HOME.to_string());
    }

    // 5. Coach paywall.
    if identity.role == Role::Coach {
        if let Some(decision) = coach_paywall(ctx, identity) {
            return decision;
        }
    }

    Decision::Allow
}

fn coach_paywall(ctx: &GateContext, identity: &IdentitySnapshot) -> Option<Decision> {
    let on_billing = ctx.path.starts_with(BILLING_PATH);
    let on_blocked = ctx.path.starts_with(BLOCKED_PATH);
    let on_onboarding = ctx.path.starts_with(ONBOARDING_PATH);

    // 5a. Tenant unresolved: wait rather than false-redirect, except on the
    // pages a half-resolved coach is allowed to sit on.
    if ctx.tenant_loading && !on_onboarding && !on_billing && !on_blocked {
        return Some(Decision::Loading);
    }

    // 5b. Absent status is treated as pending. Explicit rule, not a
    // coalescing accident.
    let status = ctx
        .tenant
        .and_then(|t| t.subscription_status)
        .unwrap_or(SubscriptionStatus::Pending);

    // 5c. Unpaid tenants: pending goes to billing (payment instructions),
    // everything else to the blocked page. The "already there" checks keep
    // this loop-free.
    if !status.grants_access() && !on_billing {
        if status == SubscriptionStatus::Pending {
            return Some(Decision::Redirect(BILLING_PATH.to_string()));
        }
        if !on_blocked {
            return Some(Decision::Redirect(BLOCKED_PATH.to_string()));
        }
        return None;
    }

    // 5d. Billing resolved: enforce profile completeness.
    if status.grants_access() {
        let cref_missing = identity
            .cref
            .as_deref()
            .map_or(true, |c| c.trim().is_empty());
        if cref_missing && !on_onboarding {
            return Some(Decision::Redirect(ONBOARDING_PATH.to_string()));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const COACH_ROUTES: &[Role] = &[Role::Coach, Role::Admin];
    const ALL_ROUTES: &[Role] = &[Role::Admin, Role::Coach, Role::Client];

    fn coach(cref: Option<&str>) -> IdentitySnapshot {
        IdentitySnapshot {
            role: Role::Coach,
            cref: cref.map(String::from),
        }
    }

    fn athlete() -> IdentitySnapshot {
        IdentitySnapshot {
            role: Role::Client,
            cref: None,
        }
    }

    fn tenant(status: Option<SubscriptionStatus>) -> TenantSnapshot {
        TenantSnapshot {
            subscription_status: status,
        }
    }

    fn ctx<'a>(
        identity: Option<&'a IdentitySnapshot>,
        tenant: Option<&'a TenantSnapshot>,
        path: &'a str,
        allowed: &'a [Role],
    ) -> GateContext<'a> {
        GateContext {
            identity_loading: false,
            tenant_loading: false,
            identity,
            tenant,
            path,
            allowed_roles: allowed,
        }
    }

    #[test]
    fn identity_loading_wins_over_everything() {
        let mut c = ctx(None, None, "/dashboard", COACH_ROUTES);
        c.identity_loading = true;
        assert_eq!(evaluate(&c), Decision::Loading);
    }

    #[test]
    fn unauthenticated_redirects_to_login_preserving_origin() {
        let c = ctx(None, None, "/dashboard/clients", COACH_ROUTES);
        assert_eq!(
            evaluate(&c),
            Decision::Redirect("/login?from=/dashboard/clients".into())
        );
    }

    #[test]
    fn athlete_on_coach_route_goes_to_app_home() {
        let id = athlete();
        let c = ctx(Some(&id), None, "/dashboard", COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Redirect(APP_HOME.into()));
    }

    #[test]
    fn athlete_is_forced_to_app_even_when_role_is_allowed() {
        let id = athlete();
        let c = ctx(Some(&id), None, "/dashboard", ALL_ROUTES);
        assert_eq!(evaluate(&c), Decision::Redirect(APP_HOME.into()));
    }

    #[test]
    fn athlete_inside_app_is_allowed() {
        let id = athlete();
        let c = ctx(Some(&id), None, "/app/workouts", ALL_ROUTES);
        assert_eq!(evaluate(&c), Decision::Allow);
    }

    #[test]
    fn coach_on_athlete_route_goes_to_dashboard() {
        let id = coach(Some("012345-G/SP"));
        let c = ctx(Some(&id), None, "/app", &[Role::Client]);
        assert_eq!(evaluate(&c), Decision::Redirect(DASHBOARD_HOME.into()));
    }

    #[test]
    fn coach_with_unresolved_tenant_waits() {
        let id = coach(Some("012345-G/SP"));
        let mut c = ctx(Some(&id), None, "/dashboard", COACH_ROUTES);
        c.tenant_loading = true;
        assert_eq!(evaluate(&c), Decision::Loading);
    }

    #[test]
    fn coach_with_unresolved_tenant_does_not_wait_on_billing() {
        let id = coach(Some("012345-G/SP"));
        let mut c = ctx(Some(&id), None, BILLING_PATH, COACH_ROUTES);
        c.tenant_loading = true;
        assert_eq!(evaluate(&c), Decision::Allow);
    }

    #[test]
    fn pending_coach_is_sent_to_billing_not_blocked() {
        let id = coach(Some("012345-G/SP"));
        let t = tenant(Some(SubscriptionStatus::Pending));
        let c = ctx(Some(&id), Some(&t), "/dashboard/clients", COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Redirect(BILLING_PATH.into()));
    }

    #[test]
    fn pending_coach_already_on_billing_is_allowed() {
        let id = coach(Some("012345-G/SP"));
        let t = tenant(Some(SubscriptionStatus::Pending));
        let c = ctx(Some(&id), Some(&t), BILLING_PATH, COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Allow);
    }

    #[test]
    fn missing_status_defaults_to_pending() {
        let id = coach(Some("012345-G/SP"));
        let t = tenant(None);
        let c = ctx(Some(&id), Some(&t), "/dashboard", COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Redirect(BILLING_PATH.into()));
    }

    #[test]
    fn past_due_coach_is_blocked() {
        let id = coach(Some("012345-G/SP"));
        let t = tenant(Some(SubscriptionStatus::PastDue));
        let c = ctx(Some(&id), Some(&t), "/dashboard", COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Redirect(BLOCKED_PATH.into()));
    }

    #[test]
    fn past_due_coach_already_on_blocked_is_allowed() {
        let id = coach(Some("012345-G/SP"));
        let t = tenant(Some(SubscriptionStatus::PastDue));
        let c = ctx(Some(&id), Some(&t), BLOCKED_PATH, COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Allow);
    }

    #[test]
    fn canceled_coach_on_billing_is_allowed_to_stay() {
        let id = coach(Some("012345-G/SP"));
        let t = tenant(Some(SubscriptionStatus::Canceled));
        let c = ctx(Some(&id), Some(&t), BILLING_PATH, COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Allow);
    }

    #[test]
    fn active_coach_without_cref_goes_to_onboarding() {
        let id = coach(None);
        let t = tenant(Some(SubscriptionStatus::Active));
        let c = ctx(Some(&id), Some(&t), "/dashboard", COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Redirect(ONBOARDING_PATH.into()));
    }

    #[test]
    fn blank_cref_counts_as_missing() {
        let id = coach(Some("   "));
        let t = tenant(Some(SubscriptionStatus::Trialing));
        let c = ctx(Some(&id), Some(&t), "/dashboard", COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Redirect(ONBOARDING_PATH.into()));
    }

    #[test]
    fn payment_gate_comes_before_onboarding_gate() {
        // Pending and no cref: billing first, onboarding only once paid.
        let id = coach(None);
        let t = tenant(Some(SubscriptionStatus::Pending));
        let c = ctx(Some(&id), Some(&t), "/dashboard", COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Redirect(BILLING_PATH.into()));
    }

    #[test]
    fn active_coach_on_onboarding_with_missing_cref_is_allowed() {
        let id = coach(None);
        let t = tenant(Some(SubscriptionStatus::Active));
        let c = ctx(Some(&id), Some(&t), ONBOARDING_PATH, COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Allow);
    }

    #[test]
    fn active_coach_with_cref_is_allowed() {
        let id = coach(Some("012345-G/SP"));
        let t = tenant(Some(SubscriptionStatus::Active));
        let c = ctx(Some(&id), Some(&t), "/dashboard/clients", COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Allow);
    }

    #[test]
    fn admin_skips_the_paywall() {
        let id = IdentitySnapshot {
            role: Role::Admin,
            cref: None,
        };
        let c = ctx(Some(&id), None, "/dashboard", COACH_ROUTES);
        assert_eq!(evaluate(&c), Decision::Allow);
    }
}
