use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use tupark_core::auth::{CredentialVerifier, LockoutPolicy};
use tupark_core::clock::{Clock, ManualClock};
use tupark_core::{
    AuditAction, AuditEntry, AuditLog, Identity, LoginGuard, LoginOutcome, LoginService,
    TuparkError,
};

struct FixedVerifier {
    username: &'static str,
    password: &'static str,
}

#[async_trait]
impl CredentialVerifier for FixedVerifier {
    async fn verify(&self, username: &str, password: &str) -> Result<bool, TuparkError> {
        Ok(username == self.username && password == self.password)
    }
}

struct FailingVerifier;

#[async_trait]
impl CredentialVerifier for FailingVerifier {
    async fn verify(&self, _username: &str, _password: &str) -> Result<bool, TuparkError> {
        Err(TuparkError::StoreUnavailable("user store down".into()))
    }
}

struct Harness {
    service: LoginService,
    clock: Arc<ManualClock>,
    audit: AuditLog,
    guard: Arc<LoginGuard>,
}

fn harness(verifier: Arc<dyn CredentialVerifier>) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let audit = AuditLog::in_memory(100);
    let guard = Arc::new(LoginGuard::in_memory(LockoutPolicy::default(), 64));
    let service = LoginService::new(guard.clone(), verifier, audit.clone(), clock.clone());
    Harness {
        service,
        clock,
        audit,
        guard,
    }
}

fn admin_verifier() -> Arc<dyn CredentialVerifier> {
    Arc::new(FixedVerifier {
        username: "admin",
        password: "tupark123",
    })
}

fn source() -> Identity {
    Identity::parse("192.168.1.20").unwrap()
}

async fn wait_for_actions(audit: &AuditLog, count: usize) -> Vec<AuditEntry> {
    for _ in 0..200 {
        let entries = audit.list_recent().await.unwrap();
        if entries.len() >= count {
            return entries;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("audit log never reached {} entries", count);
}

#[tokio::test]
async fn test_lockout_after_three_failures() {
    let h = harness(admin_verifier());
    let who = source();

    let first = h.service.attempt(&who, "admin", "wrong").await.unwrap();
    assert_eq!(first, LoginOutcome::Invalid { remaining: 2 });
    assert_eq!(first.message(), "Invalid Account. 2 attempts remaining.");

    let second = h.service.attempt(&who, "admin", "wrong").await.unwrap();
    assert_eq!(second, LoginOutcome::Invalid { remaining: 1 });

    let third = h.service.attempt(&who, "admin", "wrong").await.unwrap();
    assert_eq!(
        third.message(),
        "Too many failed attempts. You are BLOCKED for 5 minutes."
    );

    h.clock.advance(TimeDelta::seconds(1));
    let fourth = h.service.attempt(&who, "admin", "tupark123").await.unwrap();
    assert_eq!(
        fourth,
        LoginOutcome::Locked {
            retry_after: Duration::from_secs(299)
        }
    );
    assert_eq!(
        fourth.message(),
        "Account Locked. Too many failed attempts. Try again in 4m 59s."
    );

    let entries = wait_for_actions(&h.audit, 4).await;
    let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert_eq!(
        actions.iter().filter(|a| **a == AuditAction::LoginFailed).count(),
        3
    );
    assert!(actions.contains(&AuditAction::LoginBlocked));
    assert!(!actions.contains(&AuditAction::Login));
}

#[tokio::test]
async fn test_success_resets_the_streak() {
    let h = harness(admin_verifier());
    let who = source();

    h.service.attempt(&who, "admin", "wrong").await.unwrap();
    h.service.attempt(&who, "admin", "wrong").await.unwrap();

    let ok = h.service.attempt(&who, "admin", "tupark123").await.unwrap();
    assert!(ok.is_success());
    assert!(h.guard.state(&who).is_none());

    let next = h.service.attempt(&who, "admin", "wrong").await.unwrap();
    assert_eq!(next, LoginOutcome::Invalid { remaining: 2 });
}

#[tokio::test]
async fn test_expired_lockout_admits_then_relocks() {
    let h = harness(admin_verifier());
    let who = source();
    for _ in 0..3 {
        h.service.attempt(&who, "admin", "wrong").await.unwrap();
    }

    h.clock.advance(TimeDelta::minutes(5));
    let retry = h.service.attempt(&who, "admin", "wrong").await.unwrap();
    assert!(matches!(retry, LoginOutcome::Blocked { .. }));

    h.clock.advance(TimeDelta::minutes(5));
    let ok = h.service.attempt(&who, "admin", "tupark123").await.unwrap();
    assert!(ok.is_success());
}

#[tokio::test]
async fn test_blocked_attempt_records_unknown_actor() {
    let h = harness(admin_verifier());
    let who = source();
    for _ in 0..3 {
        h.service.attempt(&who, "", "wrong").await.unwrap();
    }
    h.service.attempt(&who, "", "wrong").await.unwrap();

    let entries = wait_for_actions(&h.audit, 4).await;
    let blocked = entries
        .iter()
        .find(|e| e.action == AuditAction::LoginBlocked)
        .expect("blocked entry");
    assert_eq!(blocked.actor, "Unknown");
    assert_eq!(blocked.details, "Blocked login attempt");
    assert_eq!(blocked.ip_address, "192.168.1.20");
}

#[tokio::test]
async fn test_verifier_error_is_not_a_failure() {
    let h = harness(Arc::new(FailingVerifier));
    let who = source();

    let err = h.service.attempt(&who, "admin", "x").await.unwrap_err();
    assert!(matches!(err, TuparkError::StoreUnavailable(_)));
    assert!(h.guard.state(&who).is_none());
}

#[tokio::test]
async fn test_sources_are_tracked_independently() {
    let h = harness(admin_verifier());
    let attacker = Identity::parse("203.0.113.9").unwrap();
    for _ in 0..3 {
        h.service.attempt(&attacker, "admin", "guess").await.unwrap();
    }

    let ok = h.service.attempt(&source(), "admin", "tupark123").await.unwrap();
    assert!(ok.is_success());
}

#[tokio::test]
async fn test_oauth_login_is_audited_before_returning() {
    let h = harness(admin_verifier());
    let who = source();
    for _ in 0..3 {
        h.service.attempt(&who, "admin", "wrong").await.unwrap();
    }

    h.service.record_oauth_login("admin@tup.edu.ph", &who).await;

    let entries = h.audit.list_recent().await.unwrap();
    assert!(
        entries
            .iter()
            .any(|e| e.action == AuditAction::LoginOauth && e.actor == "admin@tup.edu.ph")
    );
    assert!(h.guard.state(&who).unwrap().is_locked_at(h.clock.now()));
}
