use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tupark_core::audit::{AuditStore, InMemoryAuditStore};
use tupark_core::migrations::Migrator;
use tupark_core::{
    AppendMode, AuditAction, AuditEntry, AuditLog, NewAuditEntry, TestApp, TuparkError,
};

fn entry(n: usize) -> NewAuditEntry {
    NewAuditEntry::new(
        "admin",
        AuditAction::OccupySpot,
        format!("Parked ABC-{:03} at A1", n),
        "10.0.0.1",
    )
}

async fn memory_db() -> DatabaseConnection {
    let db = tupark_core::db::connect(&TestApp::base_config())
        .await
        .expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    db
}

async fn wait_for_entries(log: &AuditLog, count: usize) -> Vec<AuditEntry> {
    for _ in 0..200 {
        let entries = log.list_recent().await.unwrap();
        if entries.len() >= count {
            return entries;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("audit log never reached {} entries", count);
}

#[tokio::test]
async fn test_retention_keeps_newest_hundred_in_memory() {
    let log = AuditLog::in_memory(100);
    for n in 1..=105 {
        log.append(entry(n), AppendMode::WaitForCompletion).await;
    }

    let entries = log.list_recent().await.unwrap();
    assert_eq!(entries.len(), 100);
    assert_eq!(entries.first().unwrap().id, 105);
    assert_eq!(entries.last().unwrap().id, 6);
    let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, (6..=105).rev().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_retention_keeps_newest_hundred_in_database() {
    let db = memory_db().await;
    let log = AuditLog::database(db, 100);
    for n in 1..=105 {
        log.record(entry(n)).await.unwrap();
    }

    let entries = log.list_recent().await.unwrap();
    assert_eq!(entries.len(), 100);
    let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, (6..=105).rev().collect::<Vec<_>>());
    assert_eq!(entries[0].action, AuditAction::OccupySpot);
    assert_eq!(entries[0].details, "Parked ABC-105 at A1");
}

#[tokio::test]
async fn test_store_never_exceeds_cap_after_append() {
    let log = AuditLog::in_memory(3);
    for n in 1..=10 {
        log.append(entry(n), AppendMode::WaitForCompletion).await;
        assert!(log.list_recent().await.unwrap().len() <= 3);
    }
}

#[tokio::test]
async fn test_enforce_retention_is_idempotent() {
    let store = Arc::new(InMemoryAuditStore::new());
    for n in 1..=5 {
        store.insert(entry(n)).await.unwrap();
    }
    let log = AuditLog::new(store.clone(), 2);

    assert_eq!(log.enforce_retention().await.unwrap(), 3);
    let first: Vec<i64> = log.list_recent().await.unwrap().iter().map(|e| e.id).collect();
    assert_eq!(log.enforce_retention().await.unwrap(), 0);
    let second: Vec<i64> = log.list_recent().await.unwrap().iter().map(|e| e.id).collect();

    assert_eq!(first, vec![5, 4]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_database_prune_is_idempotent() {
    let db = memory_db().await;
    let log = AuditLog::database(db, 2);
    for n in 1..=4 {
        log.record(entry(n)).await.unwrap();
    }

    assert_eq!(log.enforce_retention().await.unwrap(), 0);
    let ids: Vec<i64> = log.list_recent().await.unwrap().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![4, 3]);
}

#[tokio::test]
async fn test_detached_append_eventually_lands() {
    let log = AuditLog::in_memory(100);
    log.append(
        NewAuditEntry::new("", AuditAction::LoginBlocked, "Blocked login attempt", "1.2.3.4"),
        AppendMode::default(),
    )
    .await;

    let entries = wait_for_entries(&log, 1).await;
    assert_eq!(entries[0].actor, "Unknown");
    assert_eq!(entries[0].action, AuditAction::LoginBlocked);
    assert_eq!(entries[0].ip_address, "1.2.3.4");
}

/// Store whose every operation fails.
struct BrokenStore;

#[async_trait]
impl AuditStore for BrokenStore {
    async fn insert(&self, _entry: NewAuditEntry) -> Result<AuditEntry, TuparkError> {
        Err(TuparkError::StoreUnavailable("connection refused".into()))
    }

    async fn prune(&self, _keep: u64) -> Result<u64, TuparkError> {
        Err(TuparkError::StoreUnavailable("connection refused".into()))
    }

    async fn list_recent(&self) -> Result<Vec<AuditEntry>, TuparkError> {
        Err(TuparkError::StoreUnavailable("connection refused".into()))
    }
}

#[tokio::test]
async fn test_append_swallows_store_failures() {
    let log = AuditLog::new(Arc::new(BrokenStore), 100);

    log.append(entry(1), AppendMode::WaitForCompletion).await;
    log.append(entry(2), AppendMode::Detached).await;

    assert!(matches!(
        log.record(entry(3)).await,
        Err(TuparkError::StoreUnavailable(_))
    ));
    assert!(matches!(
        log.list_recent().await,
        Err(TuparkError::StoreUnavailable(_))
    ));
}

/// Store that accepts writes but cannot prune.
#[derive(Default)]
struct UnprunableStore {
    inner: InMemoryAuditStore,
    prune_calls: AtomicUsize,
}

#[async_trait]
impl AuditStore for UnprunableStore {
    async fn insert(&self, entry: NewAuditEntry) -> Result<AuditEntry, TuparkError> {
        self.inner.insert(entry).await
    }

    async fn prune(&self, _keep: u64) -> Result<u64, TuparkError> {
        self.prune_calls.fetch_add(1, Ordering::SeqCst);
        Err(TuparkError::StoreUnavailable("lock timeout".into()))
    }

    async fn list_recent(&self) -> Result<Vec<AuditEntry>, TuparkError> {
        self.inner.list_recent().await
    }
}

#[tokio::test]
async fn test_failed_prune_does_not_fail_record() {
    let store = Arc::new(UnprunableStore::default());
    let log = AuditLog::new(store.clone(), 1);

    let written = log.record(entry(1)).await.unwrap();
    log.record(entry(2)).await.unwrap();

    assert_eq!(written.id, 1);
    assert_eq!(store.prune_calls.load(Ordering::SeqCst), 2);
    assert_eq!(log.list_recent().await.unwrap().len(), 2);
}
