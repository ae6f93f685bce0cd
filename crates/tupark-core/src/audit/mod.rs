//! Append-only activity log with a fixed retention cap.
//!
//! Every append is followed by a prune that keeps only the newest
//! `max_entries` rows by insertion id, so the log never grows past the cap
//! between operations. Appends are best effort: a failing store is reported
//! through `tracing` and never fails the action being audited.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::TuparkError;

pub mod store;

pub use store::{AuditStore, DbAuditStore, InMemoryAuditStore};

/// Default retention cap.
pub const DEFAULT_MAX_ENTRIES: u64 = 100;

/// Actor recorded when nobody is authenticated or no username was supplied.
pub const UNKNOWN_ACTOR: &str = "Unknown";

/// Category of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Login,
    LoginFailed,
    LoginBlocked,
    Logout,
    SessionTimeout,
    OccupySpot,
    ReleaseSpot,
    DeleteReport,
    LoginOauth,
}

impl AuditAction {
    pub const ALL: [AuditAction; 9] = [
        AuditAction::Login,
        AuditAction::LoginFailed,
        AuditAction::LoginBlocked,
        AuditAction::Logout,
        AuditAction::SessionTimeout,
        AuditAction::OccupySpot,
        AuditAction::ReleaseSpot,
        AuditAction::DeleteReport,
        AuditAction::LoginOauth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "LOGIN",
            AuditAction::LoginFailed => "LOGIN_FAILED",
            AuditAction::LoginBlocked => "LOGIN_BLOCKED",
            AuditAction::Logout => "LOGOUT",
            AuditAction::SessionTimeout => "SESSION_TIMEOUT",
            AuditAction::OccupySpot => "OCCUPY_SPOT",
            AuditAction::ReleaseSpot => "RELEASE_SPOT",
            AuditAction::DeleteReport => "DELETE_REPORT",
            AuditAction::LoginOauth => "LOGIN_OAUTH",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = TuparkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| TuparkError::Internal(format!("Unknown audit action '{}'", s)))
    }
}

/// An entry waiting to be written. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub actor: String,
    pub action: AuditAction,
    pub details: String,
    pub ip_address: String,
}

impl NewAuditEntry {
    /// An empty actor is recorded as [`UNKNOWN_ACTOR`].
    pub fn new(
        actor: impl Into<String>,
        action: AuditAction,
        details: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Self {
        let actor = actor.into();
        let actor = if actor.trim().is_empty() {
            UNKNOWN_ACTOR.to_string()
        } else {
            actor
        };
        NewAuditEntry {
            actor,
            action,
            details: details.into(),
            ip_address: ip_address.into(),
        }
    }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuditEntry {
    /// Monotonic insertion id
    pub id: i64,
    pub actor: String,
    pub action: AuditAction,
    pub details: String,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
}

/// How [`AuditLog::append`] relates to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppendMode {
    /// Write on a background task; the caller continues immediately.
    #[default]
    Detached,
    /// Await the write (and retention pass) before returning.
    WaitForCompletion,
}

/// The activity log.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
    max_entries: u64,
}

impl AuditLog {
    /// A cap of zero is treated as one.
    pub fn new(store: Arc<dyn AuditStore>, max_entries: u64) -> Self {
        AuditLog {
            store,
            max_entries: max_entries.max(1),
        }
    }

    /// Log kept in process memory.
    pub fn in_memory(max_entries: u64) -> Self {
        AuditLog::new(Arc::new(InMemoryAuditStore::new()), max_entries)
    }

    /// Log persisted in the `activity_logs` table.
    pub fn database(db: DatabaseConnection, max_entries: u64) -> Self {
        AuditLog::new(Arc::new(DbAuditStore::new(db)), max_entries)
    }

    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    /// Record an entry without ever failing the caller.
    pub async fn append(&self, entry: NewAuditEntry, mode: AppendMode) {
        match mode {
            AppendMode::Detached => {
                let log = self.clone();
                tokio::spawn(async move { log.record_or_report(entry).await });
            }
            AppendMode::WaitForCompletion => self.record_or_report(entry).await,
        }
    }

    /// Write an entry and enforce retention, surfacing insert failures.
    ///
    /// A failed prune after a successful insert is only logged; the next
    /// append prunes again.
    pub async fn record(&self, entry: NewAuditEntry) -> Result<AuditEntry, TuparkError> {
        let written = self.store.insert(entry).await?;
        if let Err(e) = self.enforce_retention().await {
            tracing::error!(error = %e, "Audit log cleanup failed");
        }
        Ok(written)
    }

    /// Delete everything but the newest `max_entries` entries. Idempotent.
    pub async fn enforce_retention(&self) -> Result<u64, TuparkError> {
        let removed = self.store.prune(self.max_entries).await?;
        if removed > 0 {
            tracing::debug!(removed, keep = self.max_entries, "Pruned audit log");
        }
        Ok(removed)
    }

    /// Retained entries, most recent first.
    pub async fn list_recent(&self) -> Result<Vec<AuditEntry>, TuparkError> {
        self.store.list_recent().await
    }

    async fn record_or_report(&self, entry: NewAuditEntry) {
        let action = entry.action;
        let actor = entry.actor.clone();
        if let Err(e) = self.record(entry).await {
            tracing::error!(
                error = %e,
                action = %action,
                actor = %actor,
                "Failed to write audit entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_codes_round_trip() {
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!("DROP_TABLE".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_action_serializes_as_code() {
        let json = serde_json::to_string(&AuditAction::LoginOauth).unwrap();
        assert_eq!(json, "\"LOGIN_OAUTH\"");
    }

    #[test]
    fn test_blank_actor_becomes_unknown() {
        let entry = NewAuditEntry::new("  ", AuditAction::LoginFailed, "x", "1.2.3.4");
        assert_eq!(entry.actor, UNKNOWN_ACTOR);
    }
}
