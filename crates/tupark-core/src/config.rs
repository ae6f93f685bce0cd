use std::time::Duration;

use serde::Deserialize;

use crate::auth::lockout::LockoutPolicy;
use crate::error::TuparkError;

const DEFAULT_PARKING_SLOTS: &str = "A1,A2,A3,A4,A5,B1,B2,B3,B4,B5";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL (e.g. sqlite://tupark.db, mysql://...)
    pub database_url: String,

    /// Secret used to sign administrator session tokens
    pub jwt_secret: String,

    /// Session token lifetime in minutes (default: 15)
    pub session_ttl_minutes: u64,

    /// Server host (default: 127.0.0.1)
    pub server_host: String,

    /// Server port (default: 3000)
    pub server_port: u16,

    /// Environment: development, production, test
    pub environment: String,

    /// Slot numbers guaranteed to exist at startup
    pub parking_slots: Vec<String>,

    pub security: SecurityConfig,
}

/// Login lockout, audit retention and request throttling knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Consecutive failures from one address before it is locked out
    pub lockout_max_attempts: u32,
    pub lockout_duration_secs: u64,
    /// Maximum number of addresses the login guard tracks at once
    pub attempt_cache_capacity: usize,
    /// Retention cap of the activity log
    pub audit_max_entries: u64,
    pub enable_rate_limit: bool,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    /// Honour `X-Forwarded-For` / `X-Real-IP` when resolving the client address.
    /// Only enable behind a reverse proxy that overwrites these headers.
    pub trust_proxy_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        SecurityConfig {
            lockout_max_attempts: 3,
            lockout_duration_secs: 300,
            attempt_cache_capacity: 10_000,
            audit_max_entries: crate::audit::DEFAULT_MAX_ENTRIES,
            enable_rate_limit: true,
            rate_limit_max_requests: 500,
            rate_limit_window_secs: 60,
            trust_proxy_headers: false,
        }
    }
}

impl SecurityConfig {
    /// Lockout policy for the login guard.
    pub fn lockout_policy(&self) -> LockoutPolicy {
        LockoutPolicy::new(
            self.lockout_max_attempts,
            Duration::from_secs(self.lockout_duration_secs),
        )
    }

    fn validate(&self) -> Result<(), TuparkError> {
        if self.lockout_max_attempts == 0 {
            return Err(TuparkError::Validation(
                "LOCKOUT_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if self.attempt_cache_capacity == 0 {
            return Err(TuparkError::Validation(
                "ATTEMPT_CACHE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.audit_max_entries == 0 {
            return Err(TuparkError::Validation(
                "AUDIT_MAX_ENTRIES must be at least 1".to_string(),
            ));
        }
        if self.enable_rate_limit
            && (self.rate_limit_max_requests == 0 || self.rate_limit_window_secs == 0)
        {
            return Err(TuparkError::Validation(
                "Rate limit requires a non-zero request count and window".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> Result<Self, TuparkError> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults; values that would
    /// disable a safety mechanism (zero thresholds, zero capacity) are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TuparkError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SecurityConfig::default();
        let security = SecurityConfig {
            lockout_max_attempts: parse_or(&lookup, "LOCKOUT_MAX_ATTEMPTS", defaults.lockout_max_attempts),
            lockout_duration_secs: parse_or(&lookup, "LOCKOUT_DURATION_SECS", defaults.lockout_duration_secs),
            attempt_cache_capacity: parse_or(&lookup, "ATTEMPT_CACHE_CAPACITY", defaults.attempt_cache_capacity),
            audit_max_entries: parse_or(&lookup, "AUDIT_MAX_ENTRIES", defaults.audit_max_entries),
            enable_rate_limit: flag_or(&lookup, "ENABLE_RATE_LIMIT", defaults.enable_rate_limit),
            rate_limit_max_requests: parse_or(&lookup, "RATE_LIMIT_MAX_REQUESTS", defaults.rate_limit_max_requests),
            rate_limit_window_secs: parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window_secs),
            trust_proxy_headers: flag_or(&lookup, "TRUST_PROXY_HEADERS", defaults.trust_proxy_headers),
        };
        security.validate()?;

        let parking_slots = lookup("PARKING_SLOTS")
            .unwrap_or_else(|| DEFAULT_PARKING_SLOTS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Config {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://tupark.db?mode=rwc".to_string()),
            jwt_secret: lookup("JWT_SECRET")
                .unwrap_or_else(|| "tupark-dev-secret-change-me".to_string()),
            session_ttl_minutes: parse_or(&lookup, "SESSION_TTL_MINUTES", 15),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parse_or(&lookup, "SERVER_PORT", 3000),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            parking_slots,
            security,
        })
    }

    /// Check if running in development mode.
    pub fn is_dev(&self) -> bool {
        self.environment == "development"
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

fn flag_or<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();

        assert_eq!(config.database_url, "sqlite://tupark.db?mode=rwc");
        assert_eq!(config.session_ttl_minutes, 15);
        assert_eq!(config.server_addr(), "127.0.0.1:3000");
        assert!(config.is_dev());
        assert_eq!(config.parking_slots.len(), 10);
        assert_eq!(config.security.lockout_max_attempts, 3);
        assert_eq!(config.security.lockout_duration_secs, 300);
        assert_eq!(config.security.audit_max_entries, 100);
        assert!(!config.security.trust_proxy_headers);
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVER_PORT", "8080"),
            ("LOCKOUT_MAX_ATTEMPTS", "5"),
            ("AUDIT_MAX_ENTRIES", "not-a-number"),
            ("ENABLE_RATE_LIMIT", "no"),
            ("PARKING_SLOTS", " P1, ,P2 "),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.security.lockout_max_attempts, 5);
        assert_eq!(config.security.audit_max_entries, 100);
        assert!(!config.security.enable_rate_limit);
        assert_eq!(config.parking_slots, vec!["P1".to_string(), "P2".to_string()]);
    }

    #[test]
    fn test_rejects_zero_threshold() {
        let err = Config::from_lookup(lookup_from(&[("LOCKOUT_MAX_ATTEMPTS", "0")])).unwrap_err();
        assert!(matches!(err, TuparkError::Validation(_)));

        let err = Config::from_lookup(lookup_from(&[("AUDIT_MAX_ENTRIES", "0")])).unwrap_err();
        assert!(matches!(err, TuparkError::Validation(_)));
    }

    #[test]
    fn test_lockout_policy_from_config() {
        let policy = SecurityConfig::default().lockout_policy();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.lockout_duration(), Duration::from_secs(300));
    }
}
