use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tokio::sync::RwLock;

use super::{AuditEntry, NewAuditEntry};
use crate::error::TuparkError;
use crate::models::activity_log::{self, Entity as ActivityLog};

/// Persistence backend for the activity log.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Write an entry, assigning its id and timestamp.
    async fn insert(&self, entry: NewAuditEntry) -> Result<AuditEntry, TuparkError>;

    /// Delete all but the newest `keep` entries by id. Returns the number deleted.
    async fn prune(&self, keep: u64) -> Result<u64, TuparkError>;

    /// All entries, newest first.
    async fn list_recent(&self) -> Result<Vec<AuditEntry>, TuparkError>;
}

// ═══ In-memory backend ═══

#[derive(Default)]
struct MemoryLog {
    next_id: i64,
    /// Oldest first.
    entries: VecDeque<AuditEntry>,
}

/// Audit store kept in process memory (development and tests).
#[derive(Default)]
pub struct InMemoryAuditStore {
    log: RwLock<MemoryLog>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.log.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn insert(&self, entry: NewAuditEntry) -> Result<AuditEntry, TuparkError> {
        let mut log = self.log.write().await;
        log.next_id += 1;
        let written = AuditEntry {
            id: log.next_id,
            actor: entry.actor,
            action: entry.action,
            details: entry.details,
            ip_address: entry.ip_address,
            timestamp: Utc::now(),
        };
        log.entries.push_back(written.clone());
        Ok(written)
    }

    async fn prune(&self, keep: u64) -> Result<u64, TuparkError> {
        let mut log = self.log.write().await;
        let keep = usize::try_from(keep).unwrap_or(usize::MAX);
        let excess = log.entries.len().saturating_sub(keep);
        log.entries.drain(..excess);
        Ok(excess as u64)
    }

    async fn list_recent(&self) -> Result<Vec<AuditEntry>, TuparkError> {
        let log = self.log.read().await;
        Ok(log.entries.iter().rev().cloned().collect())
    }
}

// ═══ Database backend ═══

/// Audit store backed by the `activity_logs` table.
#[derive(Clone)]
pub struct DbAuditStore {
    db: DatabaseConnection,
}

impl DbAuditStore {
    pub fn new(db: DatabaseConnection) -> Self {
        DbAuditStore { db }
    }
}

fn unavailable(e: DbErr) -> TuparkError {
    TuparkError::StoreUnavailable(e.to_string())
}

fn to_entry(model: activity_log::Model) -> Result<AuditEntry, TuparkError> {
    Ok(AuditEntry {
        id: i64::from(model.id),
        actor: model.username,
        action: model.action.parse()?,
        details: model.details,
        ip_address: model.ip_address,
        timestamp: model.timestamp.and_utc(),
    })
}

#[async_trait]
impl AuditStore for DbAuditStore {
    async fn insert(&self, entry: NewAuditEntry) -> Result<AuditEntry, TuparkError> {
        let row = activity_log::ActiveModel {
            username: Set(entry.actor),
            action: Set(entry.action.as_str().to_string()),
            details: Set(entry.details),
            ip_address: Set(entry.ip_address),
            timestamp: Set(Utc::now().naive_utc()),
            ..Default::default()
        };
        let model = row.insert(&self.db).await.map_err(unavailable)?;
        to_entry(model)
    }

    async fn prune(&self, keep: u64) -> Result<u64, TuparkError> {
        // The newest row that falls outside the window; it and everything
        // older is deleted.
        let boundary = ActivityLog::find()
            .order_by_desc(activity_log::Column::Id)
            .offset(keep)
            .limit(1)
            .one(&self.db)
            .await
            .map_err(unavailable)?;

        let Some(boundary) = boundary else {
            return Ok(0);
        };

        let result = ActivityLog::delete_many()
            .filter(activity_log::Column::Id.lte(boundary.id))
            .exec(&self.db)
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected)
    }

    async fn list_recent(&self) -> Result<Vec<AuditEntry>, TuparkError> {
        ActivityLog::find()
            .order_by_desc(activity_log::Column::Id)
            .all(&self.db)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(to_entry)
            .collect()
    }
}
