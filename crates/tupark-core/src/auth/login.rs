use std::sync::Arc;
use std::time::Duration;

use crate::audit::{AppendMode, AuditAction, AuditLog, NewAuditEntry};
use crate::clock::Clock;
use crate::error::TuparkError;

use super::credentials::CredentialVerifier;
use super::identity::Identity;
use super::lockout::{
    blocked_message, locked_message, remaining_message, Admission, FailureOutcome, LoginGuard,
};

/// Result of one login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success { username: String },
    /// Wrong credentials, still below the threshold.
    Invalid { remaining: u32 },
    /// Wrong credentials; this attempt triggered a lockout.
    Blocked { lockout: Duration },
    /// The source was already locked out; credentials were not checked.
    Locked { retry_after: Duration },
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success { .. })
    }

    /// User-facing message.
    pub fn message(&self) -> String {
        match self {
            LoginOutcome::Success { .. } => "Login successful".to_string(),
            LoginOutcome::Invalid { remaining } => remaining_message(*remaining),
            LoginOutcome::Blocked { lockout } => blocked_message(*lockout),
            LoginOutcome::Locked { retry_after } => locked_message(*retry_after),
        }
    }
}

/// Runs the administrator login flow: admission, credential check, guard
/// update and audit trail.
#[derive(Clone)]
pub struct LoginService {
    guard: Arc<LoginGuard>,
    verifier: Arc<dyn CredentialVerifier>,
    audit: AuditLog,
    clock: Arc<dyn Clock>,
}

impl LoginService {
    pub fn new(
        guard: Arc<LoginGuard>,
        verifier: Arc<dyn CredentialVerifier>,
        audit: AuditLog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        LoginService {
            guard,
            verifier,
            audit,
            clock,
        }
    }

    pub fn guard(&self) -> &LoginGuard {
        &self.guard
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Attempt a login from `identity`.
    ///
    /// A verifier error is returned as-is and does not count as a failure.
    pub async fn attempt(
        &self,
        identity: &Identity,
        username: &str,
        password: &str,
    ) -> Result<LoginOutcome, TuparkError> {
        let now = self.clock.now();

        if let Admission::Denied { retry_after } = self.guard.check_admission(identity, now) {
            tracing::warn!(identity = %identity, retry_after = retry_after.as_secs(), "Login attempt while locked out");
            self.audit
                .append(
                    NewAuditEntry::new(
                        username,
                        AuditAction::LoginBlocked,
                        "Blocked login attempt",
                        identity.as_str(),
                    ),
                    AppendMode::Detached,
                )
                .await;
            return Ok(LoginOutcome::Locked { retry_after });
        }

        if self.verifier.verify(username, password).await? {
            self.guard.record_success(identity);
            tracing::info!(username, identity = %identity, "Administrator logged in");
            self.audit
                .append(
                    NewAuditEntry::new(
                        username,
                        AuditAction::Login,
                        "Admin logged in successfully",
                        identity.as_str(),
                    ),
                    AppendMode::Detached,
                )
                .await;
            return Ok(LoginOutcome::Success {
                username: username.to_string(),
            });
        }

        self.audit
            .append(
                NewAuditEntry::new(
                    username,
                    AuditAction::LoginFailed,
                    "Failed login attempt",
                    identity.as_str(),
                ),
                AppendMode::Detached,
            )
            .await;

        Ok(match self.guard.record_failure(identity, now) {
            FailureOutcome::Tracking { remaining, .. } => LoginOutcome::Invalid { remaining },
            FailureOutcome::Locked { duration, .. } => LoginOutcome::Blocked { lockout: duration },
        })
    }

    pub async fn record_logout(&self, username: &str, identity: &Identity) {
        self.audit
            .append(
                NewAuditEntry::new(
                    username,
                    AuditAction::Logout,
                    "Admin logged out",
                    identity.as_str(),
                ),
                AppendMode::Detached,
            )
            .await;
    }

    pub async fn record_session_timeout(&self, username: &str, identity: &Identity) {
        self.audit
            .append(
                NewAuditEntry::new(
                    username,
                    AuditAction::SessionTimeout,
                    "System auto-logout due to inactivity",
                    identity.as_str(),
                ),
                AppendMode::Detached,
            )
            .await;
    }

    /// Audit a federated login. The entry is written before this returns so
    /// a following redirect never races the log. Guard state is left alone.
    pub async fn record_oauth_login(&self, username: &str, identity: &Identity) {
        self.audit
            .append(
                NewAuditEntry::new(
                    username,
                    AuditAction::LoginOauth,
                    "Admin logged in via OAuth",
                    identity.as_str(),
                ),
                AppendMode::WaitForCompletion,
            )
            .await;
    }
}
