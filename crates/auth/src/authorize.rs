use serde::Serialize;
use thiserror::Error;

use crate::permissions::GrantBasis;
use crate::roles::RoleRegistry;
use crate::session::Session;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("You must be logged in to {action}. Required permission: {permission}")]
    NotAuthenticated { permission: String, action: String },

    #[error("You do not have permission to {action}. Required permission: {permission}")]
    Forbidden { permission: String, action: String },
}

/// Why a permission check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NotAuthenticated,
    UnknownRole,
    MissingPermission,
}

/// Outcome of evaluating one permission for one (optional) session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Granted(GrantBasis),
    Denied(DenialKind),
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted(_))
    }
}

/// Resolve `permission` for `session` against `registry`.
///
/// - No IO
/// - No panics
/// - Pure function of (session role, permission, registry)
pub fn evaluate(registry: &RoleRegistry, session: Option<&Session>, permission: &str) -> Decision {
    let Some(session) = session else {
        return Decision::Denied(DenialKind::NotAuthenticated);
    };
    let Some(role) = registry.get(session.role.as_str()) else {
        return Decision::Denied(DenialKind::UnknownRole);
    };
    match role.resolve(permission) {
        Some(basis) => Decision::Granted(basis),
        None => Decision::Denied(DenialKind::MissingPermission),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Route gating
// ─────────────────────────────────────────────────────────────────────────────

/// Protected views of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Requires `view:dashboard` and the role's dashboard-access flag.
    Dashboard,
    /// Requires `audit:full`.
    AuditLog,
}

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page";
pub const DASHBOARD_DENIED_MESSAGE: &str = "Your role does not have access to the dashboard";
pub const AUDIT_DENIED_MESSAGE: &str = "Full audit access is required to view the audit log";

/// Decide whether `session` may open `route`; `Err` carries the login-page message.
pub fn check_route(
    registry: &RoleRegistry,
    session: Option<&Session>,
    route: Route,
) -> Result<(), &'static str> {
    let Some(session) = session else {
        return Err(LOGIN_REQUIRED_MESSAGE);
    };

    match route {
        Route::Dashboard => {
            let allowed = evaluate(registry, Some(session), "view:dashboard").is_granted()
                && registry.dashboard_access(session.role.as_str());
            if allowed { Ok(()) } else { Err(DASHBOARD_DENIED_MESSAGE) }
        }
        Route::AuditLog => {
            if evaluate(registry, Some(session), "audit:full").is_granted() {
                Ok(())
            } else {
                Err(AUDIT_DENIED_MESSAGE)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// Answers "why was this allowed/denied?" for diagnostics and the console.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    pub user_id: Option<String>,
    pub role: Option<String>,
    pub effective_permissions: Vec<String>,
    pub basis: Option<GrantBasis>,
    pub denial: Option<DenialKind>,
    pub suggestions: Vec<String>,
}

pub fn explain_authorization(
    registry: &RoleRegistry,
    session: Option<&Session>,
    permission: &str,
) -> AuthorizationExplanation {
    let decision = evaluate(registry, session, permission);
    let role = session.and_then(|s| registry.get(s.role.as_str()));

    let mut effective_permissions: Vec<String> = role
        .map(|r| r.permissions.iter().map(|p| p.as_str().to_string()).collect())
        .unwrap_or_default();
    effective_permissions.sort();

    let (granted, reason, basis, denial) = match decision {
        Decision::Granted(basis) => {
            let reason = match basis {
                GrantBasis::Wildcard => "Role holds the wildcard permission '*'".to_string(),
                GrantBasis::Exact => format!("Role holds '{permission}' explicitly"),
                GrantBasis::Category => format!(
                    "Role holds the category wildcard '{}:*'",
                    crate::permissions::category_of(permission)
                ),
            };
            (true, reason, Some(basis), None)
        }
        Decision::Denied(kind) => {
            let reason = match kind {
                DenialKind::NotAuthenticated => "No active session".to_string(),
                DenialKind::UnknownRole => format!(
                    "Session role '{}' is not defined; it has no permissions",
                    session.map(|s| s.role.as_str()).unwrap_or_default()
                ),
                DenialKind::MissingPermission => format!(
                    "Role does not hold '{permission}'. Current permissions: {effective_permissions:?}"
                ),
            };
            (false, reason, None, Some(kind))
        }
    };

    let suggestions = if granted {
        Vec::new()
    } else {
        let granting: Vec<&str> = registry
            .roles()
            .filter(|r| r.grants(permission))
            .map(|r| r.id.as_str())
            .collect();
        let mut suggestions = vec![format!("Log in with a role that grants '{permission}'")];
        if !granting.is_empty() {
            suggestions.push(format!("Roles granting this permission: {granting:?}"));
        }
        suggestions
    };

    AuthorizationExplanation {
        required_permission: permission.to_string(),
        granted,
        reason,
        user_id: session.map(|s| s.username.clone()),
        role: session.map(|s| s.role.as_str().to_string()),
        effective_permissions,
        basis,
        denial,
        suggestions,
    }
}
