//! Tunables for the access-control context.

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use tracing::warn;

/// Upper bound on retained audit entries.
pub const MAX_AUDIT_CAPACITY: usize = 1000;

/// Access-control configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessControlConfig {
    /// Absolute session lifetime measured from session creation.
    pub session_ttl: Duration,
    /// Remaining-validity window (exclusive bounds) that triggers the expiry warning.
    pub warning_window: (Duration, Duration),
    /// Maximum number of retained audit entries.
    pub audit_capacity: usize,
    /// How often the host should call `check_session`.
    pub check_interval: StdDuration,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(24),
            warning_window: (Duration::minutes(4), Duration::minutes(5)),
            audit_capacity: MAX_AUDIT_CAPACITY,
            check_interval: StdDuration::from_secs(60),
        }
    }
}

impl AccessControlConfig {
    /// Defaults overridden by `VITRINE_*` environment variables.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(ttl) = seconds(&lookup, "VITRINE_SESSION_TTL_SECS") {
            config.session_ttl = ttl;
        }
        if let Some(lower) = seconds(&lookup, "VITRINE_WARNING_LOWER_SECS") {
            config.warning_window.0 = lower;
        }
        if let Some(upper) = seconds(&lookup, "VITRINE_WARNING_UPPER_SECS") {
            config.warning_window.1 = upper;
        }
        if let Some(capacity) = parsed::<usize>(&lookup, "VITRINE_AUDIT_CAPACITY") {
            if (1..=MAX_AUDIT_CAPACITY).contains(&capacity) {
                config.audit_capacity = capacity;
            } else {
                warn!(capacity, max = MAX_AUDIT_CAPACITY, "ignoring out-of-range audit capacity");
            }
        }
        if let Some(secs) = parsed::<u64>(&lookup, "VITRINE_CHECK_INTERVAL_SECS") {
            config.check_interval = StdDuration::from_secs(secs);
        }

        config
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_warning_window(mut self, lower: Duration, upper: Duration) -> Self {
        self.warning_window = (lower, upper);
        self
    }

    /// Clamped to `1..=MAX_AUDIT_CAPACITY`.
    pub fn with_audit_capacity(mut self, capacity: usize) -> Self {
        self.audit_capacity = capacity.clamp(1, MAX_AUDIT_CAPACITY);
        self
    }

    pub fn with_check_interval(mut self, interval: StdDuration) -> Self {
        self.check_interval = interval;
        self
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}

fn seconds(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let secs = parsed::<i64>(lookup, key)?;
    if secs < 0 {
        warn!(key, secs, "ignoring negative duration");
        return None;
    }
    let duration = Duration::try_seconds(secs)
        .filter(|d| Utc::now().checked_add_signed(*d).is_some());
    if duration.is_none() {
        warn!(key, secs, "ignoring out-of-range duration");
    }
    duration
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_reference_constants() {
        let config = AccessControlConfig::default();
        assert_eq!(config.session_ttl, Duration::hours(24));
        assert_eq!(config.warning_window, (Duration::minutes(4), Duration::minutes(5)));
        assert_eq!(config.audit_capacity, 1000);
        assert_eq!(config.check_interval, StdDuration::from_secs(60));
    }

    #[test]
    fn lookup_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("VITRINE_SESSION_TTL_SECS", "3600"),
            ("VITRINE_AUDIT_CAPACITY", "lots"),
            ("VITRINE_WARNING_UPPER_SECS", "9000000000000"),
            ("VITRINE_WARNING_LOWER_SECS", "-5"),
            ("VITRINE_CHECK_INTERVAL_SECS", " 15 "),
        ]);
        let config = AccessControlConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.session_ttl, Duration::hours(1));
        assert_eq!(config.audit_capacity, 1000);
        assert_eq!(config.warning_window.0, Duration::minutes(4));
        assert_eq!(config.warning_window.1, Duration::minutes(5));
        assert_eq!(config.check_interval, StdDuration::from_secs(15));

        for capacity in ["0", "1001", "50000"] {
            let vars: HashMap<&str, &str> = HashMap::from([("VITRINE_AUDIT_CAPACITY", capacity)]);
            let config = AccessControlConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
            assert_eq!(config.audit_capacity, MAX_AUDIT_CAPACITY, "capacity {capacity}");
        }

        let vars: HashMap<&str, &str> = HashMap::from([("VITRINE_AUDIT_CAPACITY", "250")]);
        let config = AccessControlConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.audit_capacity, 250);
    }

    #[test]
    fn ttl_beyond_calendar_range_is_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([("VITRINE_SESSION_TTL_SECS", "9000000000000")]);
        let config = AccessControlConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.session_ttl, Duration::hours(24));
    }

    #[test]
    fn builders_set_fields_and_clamp_capacity() {
        let config = AccessControlConfig::default()
            .with_warning_window(Duration::minutes(1), Duration::minutes(2))
            .with_check_interval(StdDuration::from_secs(5))
            .with_audit_capacity(0);
        assert_eq!(config.warning_window, (Duration::minutes(1), Duration::minutes(2)));
        assert_eq!(config.check_interval, StdDuration::from_secs(5));
        assert_eq!(config.audit_capacity, 1);

        let config = AccessControlConfig::default().with_audit_capacity(5000);
        assert_eq!(config.audit_capacity, MAX_AUDIT_CAPACITY);
    }
}
