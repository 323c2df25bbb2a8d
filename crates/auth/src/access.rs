//! The access-control context handed to every UI collaborator.

use chrono::Duration;
use serde_json::{Value as JsonValue, json};
use tracing::{debug, info, warn};

use vitrine_core::{Clock, KeyValueStore, SystemClock};

use crate::audit::{ANONYMOUS_ROLE, ANONYMOUS_USER, AuditEntry, AuditLog, AuditQuery};
use crate::authorize::{
    AuthorizationExplanation, AuthzError, Decision, DenialKind, Route, check_route, evaluate,
    explain_authorization,
};
use crate::config::AccessControlConfig;
use crate::export::{ExportError, ExportFormat, render};
use crate::navigation::LoginRedirect;
use crate::roles::{Role, RoleId, RoleRegistry};
use crate::session::{RestoreOutcome, Session, SessionStatus, SessionStore};

/// Reason recorded when a session outlives its lifetime.
pub const SESSION_EXPIRED_REASON: &str = "Session expired";

/// Location used until the UI reports one.
pub const DEFAULT_LOCATION: &str = "/";

/// What `load_session` found at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionRestore {
    /// Nothing was persisted.
    Absent,
    /// The persisted payload was unreadable and has been cleared.
    Corrupt,
    /// A valid session is active again.
    Restored(Session),
    /// The persisted session had expired and was logged out.
    Expired(LoginRedirect),
}

/// Result of the periodic session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    NoSession,
    Valid { remaining: Duration },
    /// Show the "session expiring soon" notice. Emitted once per session.
    ExpiringSoon { remaining: Duration },
    /// The session expired and was logged out; navigate to login.
    Expired(LoginRedirect),
}

/// Role, permission, session and audit engine for one single-actor context.
///
/// Owns its storage port and clock. There is no global instance: create one
/// at startup and pass it to whatever needs to gate or audit.
pub struct AccessControl<S, C = SystemClock> {
    store: S,
    clock: C,
    registry: RoleRegistry,
    config: AccessControlConfig,
    sessions: SessionStore,
    audit: AuditLog,
    location: String,
}

impl<S: KeyValueStore> AccessControl<S, SystemClock> {
    /// Reference roles, default configuration, system clock.
    pub fn new(store: S) -> Self {
        Self::with_parts(store, SystemClock, RoleRegistry::reference(), AccessControlConfig::default())
    }
}

impl<S: KeyValueStore, C: Clock> AccessControl<S, C> {
    /// Assemble a context. The persisted audit log is read immediately; the
    /// session is only restored by [`AccessControl::load_session`].
    pub fn with_parts(store: S, clock: C, registry: RoleRegistry, config: AccessControlConfig) -> Self {
        let audit = AuditLog::load(&store, config.audit_capacity);
        Self {
            store,
            clock,
            registry,
            config,
            sessions: SessionStore::new(),
            audit,
            location: DEFAULT_LOCATION.to_string(),
        }
    }

    // ── sessions ────────────────────────────────────────────────────────────

    /// Start a new session, replacing any current one.
    pub fn create_session(
        &mut self,
        username: impl Into<String>,
        role: impl Into<RoleId>,
        name: impl Into<String>,
        two_factor: bool,
    ) -> Session {
        let session = Session::new(username, role.into(), name, two_factor, self.clock.now());

        if let Some(previous) = self.sessions.current() {
            debug!(previous = %previous.session_id, "replacing active session");
        }

        let session = self.sessions.replace(&mut self.store, session).clone();
        info!(
            session_id = %session.session_id,
            user = %session.username,
            role = %session.role,
            "session created"
        );

        self.append_audit(
            "session_created",
            json!({
                "userId": session.username,
                "role": session.role,
                "twoFactor": session.two_factor,
            }),
        );

        session
    }

    /// Restore the persisted session. Call once at startup.
    pub fn load_session(&mut self) -> SessionRestore {
        match self.sessions.restore(&mut self.store) {
            RestoreOutcome::Absent => return SessionRestore::Absent,
            RestoreOutcome::Corrupt => return SessionRestore::Corrupt,
            RestoreOutcome::Restored => {}
        }

        let Some(session) = self.sessions.current().cloned() else {
            return SessionRestore::Absent;
        };

        self.append_audit(
            "session_loaded",
            json!({ "userId": session.username, "role": session.role }),
        );

        if session.is_expired(self.clock.now(), self.config.session_ttl) {
            info!(session_id = %session.session_id, "persisted session has expired");
            return SessionRestore::Expired(self.logout(SESSION_EXPIRED_REASON));
        }

        SessionRestore::Restored(session)
    }

    /// Drop the session without auditing.
    pub fn clear_session(&mut self) {
        self.sessions.clear(&mut self.store);
    }

    /// Audit the logout, clear the session and hand back the login redirect.
    pub fn logout(&mut self, reason: &str) -> LoginRedirect {
        self.append_audit("user_logout", json!({ "reason": reason }));

        if let Some(session) = self.sessions.current() {
            info!(session_id = %session.session_id, user = %session.username, reason, "logged out");
        }
        self.clear_session();

        let redirect = LoginRedirect::new(reason, self.location.clone());
        redirect.persist(&mut self.store);
        redirect
    }

    /// Periodic expiry check; the host calls this every `config().check_interval`.
    pub fn check_session(&mut self) -> SessionCheck {
        match self.sessions.status(self.clock.now(), &self.config) {
            SessionStatus::NoSession => SessionCheck::NoSession,
            SessionStatus::Valid { remaining } => SessionCheck::Valid { remaining },
            SessionStatus::ExpiringSoon { remaining } => {
                info!(remaining_secs = remaining.num_seconds(), "session expiring soon");
                SessionCheck::ExpiringSoon { remaining }
            }
            SessionStatus::Expired => SessionCheck::Expired(self.logout(SESSION_EXPIRED_REASON)),
        }
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.sessions.current()
    }

    pub fn is_authenticated(&self) -> bool {
        self.sessions.current().is_some()
    }

    /// Role definition of the current session, if both exist.
    pub fn current_role(&self) -> Option<&Role> {
        self.sessions
            .current()
            .and_then(|s| self.registry.get(s.role.as_str()))
    }

    pub fn time_remaining(&self) -> Option<Duration> {
        self.sessions
            .current()
            .map(|s| s.remaining(self.clock.now(), self.config.session_ttl))
    }

    /// Consume a pending login redirect (login page side).
    pub fn take_login_redirect(&mut self) -> Option<LoginRedirect> {
        LoginRedirect::take(&mut self.store)
    }

    // ── permissions ─────────────────────────────────────────────────────────

    pub fn has_permission(&self, permission: &str) -> bool {
        let decision = evaluate(&self.registry, self.sessions.current(), permission);
        debug!(permission, ?decision, "permission check");
        decision.is_granted()
    }

    /// Gate an action. On denial the attempt is audited and the error's
    /// display text is the message to show the user.
    pub fn require_permission(&mut self, permission: &str, action: &str) -> Result<(), AuthzError> {
        let decision = evaluate(&self.registry, self.sessions.current(), permission);
        let Decision::Denied(kind) = decision else {
            return Ok(());
        };

        let user_id = self.actor().0;
        warn!(permission, action, user = %user_id, ?kind, "permission denied");
        self.append_audit(
            "permission_denied",
            json!({ "permission": permission, "action": action, "userId": user_id }),
        );

        let (permission, action) = (permission.to_string(), action.to_string());
        Err(match kind {
            DenialKind::NotAuthenticated => AuthzError::NotAuthenticated { permission, action },
            DenialKind::UnknownRole | DenialKind::MissingPermission => {
                AuthzError::Forbidden { permission, action }
            }
        })
    }

    pub fn explain(&self, permission: &str) -> AuthorizationExplanation {
        explain_authorization(&self.registry, self.sessions.current(), permission)
    }

    /// Gate a protected view. On failure the redirect keys are written.
    pub fn authorize_route(&mut self, route: Route) -> Result<(), LoginRedirect> {
        match check_route(&self.registry, self.sessions.current(), route) {
            Ok(()) => Ok(()),
            Err(message) => {
                debug!(?route, message, "route access denied");
                let redirect = LoginRedirect::new(message, self.location.clone());
                redirect.persist(&mut self.store);
                Err(redirect)
            }
        }
    }

    pub fn authorize_dashboard(&mut self) -> Result<(), LoginRedirect> {
        self.authorize_route(Route::Dashboard)
    }

    pub fn authorize_audit_view(&mut self) -> Result<(), LoginRedirect> {
        self.authorize_route(Route::AuditLog)
    }

    // ── audit ───────────────────────────────────────────────────────────────

    /// Record `event` as the current actor at the current location.
    pub fn append_audit(&mut self, event: &str, data: JsonValue) -> AuditEntry {
        let (user_id, user_role) = self.actor();
        let entry = AuditEntry::new(event, user_id, user_role, self.location.clone(), data, self.clock.now());

        let evicted = self.audit.push(entry.clone());
        if evicted > 0 {
            debug!(evicted, capacity = self.audit.capacity(), "audit log truncated");
        }
        self.audit.persist(&mut self.store);

        entry
    }

    pub fn query_audit(&self, filter: &AuditQuery) -> Vec<AuditEntry> {
        self.audit.query(filter)
    }

    /// Render matching entries, then audit the export itself.
    ///
    /// The `audit_log_exported` entry is appended after the snapshot and is
    /// therefore never part of the output it describes.
    pub fn export_audit(&mut self, format: ExportFormat, filter: &AuditQuery) -> Result<String, ExportError> {
        let snapshot = self.audit.query(filter);
        let rendered = render(&snapshot, format)?;

        info!(%format, entries = snapshot.len(), "audit log exported");
        self.append_audit(
            "audit_log_exported",
            json!({ "format": format.as_str(), "entryCount": snapshot.len() }),
        );

        Ok(rendered)
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    // ── context ─────────────────────────────────────────────────────────────

    /// Record where the UI currently is; stamped on audit entries and redirects.
    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = location.into();
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AccessControlConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn actor(&self) -> (String, String) {
        match self.sessions.current() {
            Some(s) => (s.username.clone(), s.role.as_str().to_string()),
            None => (ANONYMOUS_USER.to_string(), ANONYMOUS_ROLE.to_string()),
        }
    }
}
