//! Append-only, size-bounded audit trail.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use vitrine_core::{AuditEntryId, KeyValueStore};

/// Storage key of the persisted audit log.
pub const AUDIT_KEY: &str = "audit-log";

/// User id recorded when no session is active.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Role recorded when no session is active.
pub const ANONYMOUS_ROLE: &str = "guest";

/// Immutable record of a security-relevant event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub user_id: String,
    pub user_role: String,
    /// Opaque UI location the event happened at.
    pub path: String,
    pub data: JsonValue,
}

impl AuditEntry {
    pub fn new(
        event: impl Into<String>,
        user_id: impl Into<String>,
        user_role: impl Into<String>,
        path: impl Into<String>,
        data: JsonValue,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            timestamp,
            event: event.into(),
            user_id: user_id.into(),
            user_role: user_role.into(),
            path: path.into(),
            data,
        }
    }
}

/// Filters for [`AuditLog::query`]. Unset fields match everything; set fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub user_id: Option<String>,
    pub event: Option<String>,
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub end: Option<DateTime<Utc>>,
}

impl AuditQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.user_id.as_deref().is_none_or(|u| entry.user_id == u)
            && self.event.as_deref().is_none_or(|e| entry.event == e)
            && self.start.is_none_or(|s| entry.timestamp >= s)
            && self.end.is_none_or(|e| entry.timestamp <= e)
    }
}

/// Ordered audit sequence capped at `capacity`, oldest evicted first.
#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: VecDeque<AuditEntry>,
    capacity: usize,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    /// Load the persisted log. Unreadable or corrupt data yields an empty log.
    pub fn load<S: KeyValueStore>(store: &S, capacity: usize) -> Self {
        let mut log = Self::new(capacity);

        let raw = match store.get(AUDIT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return log,
            Err(err) => {
                warn!(error = %err, "failed to read persisted audit log; starting empty");
                return log;
            }
        };

        match serde_json::from_str::<Vec<AuditEntry>>(&raw) {
            Ok(entries) => {
                log.entries = entries.into();
                log.evict_overflow();
            }
            Err(err) => warn!(error = %err, "persisted audit log is corrupt; starting empty"),
        }

        log
    }

    /// Write the full sequence to `store`. Failures are logged, not raised.
    pub fn persist<S: KeyValueStore>(&self, store: &mut S) {
        let result = serde_json::to_string(&self.entries)
            .map_err(vitrine_core::StorageError::from)
            .and_then(|raw| store.set(AUDIT_KEY, raw));

        if let Err(err) = result {
            warn!(error = %err, "failed to persist audit log; continuing in memory");
        }
    }

    /// Append `entry`, returning how many old entries were evicted.
    pub fn push(&mut self, entry: AuditEntry) -> usize {
        self.entries.push_back(entry);
        self.evict_overflow()
    }

    fn evict_overflow(&mut self) -> usize {
        let overflow = self.entries.len().saturating_sub(self.capacity);
        self.entries.drain(..overflow);
        overflow
    }

    /// Matching entries, newest first. Ties keep later insertions first.
    pub fn query(&self, filter: &AuditQuery) -> Vec<AuditEntry> {
        let mut matched: Vec<AuditEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matched
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
