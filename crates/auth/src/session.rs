//! Session model and its persisted lifecycle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vitrine_core::{KeyValueStore, SessionId};

use crate::config::AccessControlConfig;
use crate::roles::RoleId;

/// Storage key of the persisted session.
pub const SESSION_KEY: &str = "auth-session";

/// The single currently authenticated actor.
///
/// `two_factor` is recorded and persisted but never consulted by any
/// authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub username: String,
    pub role: RoleId,
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: SessionId,
    #[serde(default)]
    pub two_factor: bool,
}

impl Session {
    pub fn new(
        username: impl Into<String>,
        role: RoleId,
        name: impl Into<String>,
        two_factor: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            username: username.into(),
            role,
            name: name.into(),
            timestamp: now,
            session_id: SessionId::new(),
            two_factor,
        }
    }

    /// Saturates at the end of the representable calendar.
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.timestamp
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Remaining validity; negative once the session has expired.
    pub fn remaining(&self, now: DateTime<Utc>, ttl: Duration) -> Duration {
        self.expires_at(ttl) - now
    }

    /// Expired once strictly more than `ttl` has elapsed since creation.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.timestamp > ttl
    }
}

/// Result of a periodic session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    NoSession,
    Valid { remaining: Duration },
    /// Remaining validity entered the warning window. Reported once per session.
    ExpiringSoon { remaining: Duration },
    Expired,
}

/// What `restore` found in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RestoreOutcome {
    Absent,
    Corrupt,
    Restored,
}

/// Owner of "who is acting now".
#[derive(Debug, Default)]
pub struct SessionStore {
    current: Option<Session>,
    warned: Option<SessionId>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Install `session` as the active one and persist it.
    pub(crate) fn replace<S: KeyValueStore>(&mut self, store: &mut S, session: Session) -> &Session {
        match serde_json::to_string(&session) {
            Ok(raw) => {
                if let Err(err) = store.set(SESSION_KEY, raw) {
                    warn!(error = %err, "failed to persist session; continuing in memory");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize session; continuing in memory"),
        }

        self.warned = None;
        self.current.insert(session)
    }

    /// Load the persisted session. Corrupt payloads are cleared.
    pub(crate) fn restore<S: KeyValueStore>(&mut self, store: &mut S) -> RestoreOutcome {
        let raw = match store.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return RestoreOutcome::Absent,
            Err(err) => {
                warn!(error = %err, "failed to read persisted session");
                return RestoreOutcome::Absent;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => {
                info!(
                    session_id = %session.session_id,
                    user = %session.username,
                    role = %session.role,
                    "restored persisted session"
                );
                self.warned = None;
                self.current = Some(session);
                RestoreOutcome::Restored
            }
            Err(err) => {
                warn!(error = %err, "persisted session is corrupt; clearing it");
                self.clear(store);
                RestoreOutcome::Corrupt
            }
        }
    }

    /// Drop in-memory and persisted state.
    pub(crate) fn clear<S: KeyValueStore>(&mut self, store: &mut S) {
        self.current = None;
        self.warned = None;
        if let Err(err) = store.remove(SESSION_KEY) {
            warn!(error = %err, "failed to remove persisted session");
        }
    }

    pub(crate) fn status(&mut self, now: DateTime<Utc>, config: &AccessControlConfig) -> SessionStatus {
        let Some(session) = self.current.as_ref() else {
            return SessionStatus::NoSession;
        };

        if session.is_expired(now, config.session_ttl) {
            return SessionStatus::Expired;
        }

        let remaining = session.remaining(now, config.session_ttl);
        let (lower, upper) = config.warning_window;
        let in_window = remaining > lower && remaining < upper;

        if in_window && self.warned != Some(session.session_id) {
            self.warned = Some(session.session_id);
            SessionStatus::ExpiringSoon { remaining }
        } else {
            SessionStatus::Valid { remaining }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vitrine_core::InMemoryStore;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 8, 0, 0).unwrap()
    }

    fn session_at(ts: DateTime<Utc>) -> Session {
        Session::new("alice", RoleId::new("curator"), "Alice", false, ts)
    }

    #[test]
    fn expiry_is_strictly_after_ttl() {
        let ttl = Duration::hours(24);
        let s = session_at(t0());

        assert!(!s.is_expired(t0() + ttl, ttl));
        assert!(s.is_expired(t0() + ttl + Duration::milliseconds(1), ttl));
        assert_eq!(s.remaining(t0() + Duration::hours(23), ttl), Duration::hours(1));
    }

    #[test]
    fn huge_ttl_saturates_instead_of_overflowing() {
        let ttl = Duration::try_seconds(9_000_000_000_000).unwrap();
        let s = session_at(t0());

        assert_eq!(s.expires_at(ttl), DateTime::<Utc>::MAX_UTC);
        assert!(!s.is_expired(t0() + Duration::days(365), ttl));
        assert!(s.remaining(t0(), ttl) > Duration::days(365 * 1000));
    }

    #[test]
    fn persisted_shape_uses_camel_case_and_defaults_two_factor() {
        let raw = r#"{
            "username": "bob",
            "role": "board",
            "name": "Bob",
            "timestamp": "2024-05-10T08:00:00Z",
            "sessionId": "01890a5d-ac96-774b-bcce-b302099a8057"
        }"#;
        let session: Session = serde_json::from_str(raw).unwrap();
        assert_eq!(session.role.as_str(), "board");
        assert!(!session.two_factor);

        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("sessionId").is_some());
        assert_eq!(json["twoFactor"], false);
    }

    #[test]
    fn restore_clears_corrupt_payload() {
        let mut store = InMemoryStore::new();
        store.set(SESSION_KEY, "{not json".to_string()).unwrap();

        let mut sessions = SessionStore::new();
        assert_eq!(sessions.restore(&mut store), RestoreOutcome::Corrupt);
        assert!(sessions.current().is_none());
        assert!(!store.contains_key(SESSION_KEY));
    }

    #[test]
    fn restore_round_trips_replace() {
        let mut store = InMemoryStore::new();
        let mut sessions = SessionStore::new();
        let original = sessions.replace(&mut store, session_at(t0())).clone();

        let mut fresh = SessionStore::new();
        assert_eq!(fresh.restore(&mut store), RestoreOutcome::Restored);
        assert_eq!(fresh.current(), Some(&original));
    }

    #[test]
    fn warning_fires_once_inside_window() {
        let config = AccessControlConfig::default();
        let mut store = InMemoryStore::new();
        let mut sessions = SessionStore::new();
        sessions.replace(&mut store, session_at(t0()));

        let expiry = t0() + config.session_ttl;

        assert!(matches!(
            sessions.status(expiry - Duration::minutes(10), &config),
            SessionStatus::Valid { .. }
        ));
        assert_eq!(
            sessions.status(expiry - Duration::seconds(270), &config),
            SessionStatus::ExpiringSoon { remaining: Duration::seconds(270) }
        );
        assert!(matches!(
            sessions.status(expiry - Duration::seconds(250), &config),
            SessionStatus::Valid { .. }
        ));
        // Bounds are exclusive.
        let mut other = SessionStore::new();
        other.replace(&mut store, session_at(t0()));
        assert!(matches!(
            other.status(expiry - Duration::minutes(5), &config),
            SessionStatus::Valid { .. }
        ));
        assert!(matches!(
            other.status(expiry - Duration::minutes(4), &config),
            SessionStatus::Valid { .. }
        ));
        assert_eq!(
            other.status(expiry + Duration::seconds(1), &config),
            SessionStatus::Expired
        );
    }

    #[test]
    fn no_session_status() {
        let mut sessions = SessionStore::new();
        assert_eq!(
            sessions.status(t0(), &AccessControlConfig::default()),
            SessionStatus::NoSession
        );
    }
}
