//! Per-address login lockout.
//!
//! Each source identity moves through `Unknown -> Tracking(count) ->
//! Locked(until)`. Only a successful login returns it to `Unknown`. When a
//! lockout simply runs out, admission is granted again but the failure count
//! is left at the threshold, so the next failure locks the address again
//! straight away.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::attempt_store::{AttemptState, AttemptStore, BoundedAttemptStore};
use super::identity::Identity;

/// Threshold and duration of a lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        LockoutPolicy::new(3, Duration::from_secs(5 * 60))
    }
}

impl LockoutPolicy {
    /// A threshold of zero is treated as one.
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        LockoutPolicy {
            max_attempts: max_attempts.max(1),
            lockout_duration,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn lockout_duration(&self) -> Duration {
        self.lockout_duration
    }

    fn lock_until(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.lockout_duration)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Whether a login attempt may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Locked out; `retry_after` is rounded up to whole seconds.
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }

    /// The lockout message for a denied attempt.
    pub fn message(&self) -> Option<String> {
        match self {
            Admission::Admitted => None,
            Admission::Denied { retry_after } => Some(locked_message(*retry_after)),
        }
    }
}

/// Result of recording a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still below the threshold.
    Tracking { failures: u32, remaining: u32 },
    /// This failure reached the threshold and started a lockout.
    Locked {
        failures: u32,
        until: DateTime<Utc>,
        duration: Duration,
    },
}

impl FailureOutcome {
    pub fn failures(&self) -> u32 {
        match self {
            FailureOutcome::Tracking { failures, .. } | FailureOutcome::Locked { failures, .. } => {
                *failures
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, FailureOutcome::Locked { .. })
    }

    pub fn message(&self) -> String {
        match self {
            FailureOutcome::Tracking { remaining, .. } => remaining_message(*remaining),
            FailureOutcome::Locked { duration, .. } => blocked_message(*duration),
        }
    }
}

/// `"Account Locked. Too many failed attempts. Try again in {m}m {s}s."`
pub fn locked_message(retry_after: Duration) -> String {
    let secs = retry_after.as_secs();
    format!(
        "Account Locked. Too many failed attempts. Try again in {}m {}s.",
        secs / 60,
        secs % 60
    )
}

/// `"Invalid Account. {remaining} attempts remaining."`
pub fn remaining_message(remaining: u32) -> String {
    format!("Invalid Account. {} attempts remaining.", remaining)
}

/// `"Too many failed attempts. You are BLOCKED for 5 minutes."`
pub fn blocked_message(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (count, unit) = if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    let span = if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    };
    format!("Too many failed attempts. You are BLOCKED for {}.", span)
}

/// Gate for login attempts keyed by source identity.
pub struct LoginGuard {
    policy: LockoutPolicy,
    store: Arc<dyn AttemptStore>,
}

impl LoginGuard {
    pub fn new(policy: LockoutPolicy, store: Arc<dyn AttemptStore>) -> Self {
        LoginGuard { policy, store }
    }

    /// Guard backed by a [`BoundedAttemptStore`] of the given capacity.
    pub fn in_memory(policy: LockoutPolicy, capacity: usize) -> Self {
        LoginGuard::new(policy, Arc::new(BoundedAttemptStore::new(capacity)))
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Decide whether `identity` may attempt a login at `now`. Read-only.
    pub fn check_admission(&self, identity: &Identity, now: DateTime<Utc>) -> Admission {
        match self.store.get(identity).and_then(|state| state.locked_until) {
            Some(until) if until > now => Admission::Denied {
                retry_after: ceil_to_seconds(until - now),
            },
            _ => Admission::Admitted,
        }
    }

    /// Forget every failure and lockout for `identity`.
    pub fn record_success(&self, identity: &Identity) {
        if self.store.remove(identity) {
            tracing::debug!(identity = %identity, "Cleared login attempt state");
        }
    }

    /// Count a failed attempt, locking the identity when the threshold is reached.
    pub fn record_failure(&self, identity: &Identity, now: DateTime<Utc>) -> FailureOutcome {
        let policy = self.policy;
        let state: AttemptState = self.store.update(identity, now, &mut |state| {
            state.failure_count = state.failure_count.saturating_add(1);
            state.last_failure = now;
            if state.failure_count >= policy.max_attempts {
                state.locked_until = Some(policy.lock_until(now));
            }
        });

        match state.locked_until {
            Some(until) if state.failure_count >= policy.max_attempts => {
                tracing::warn!(
                    identity = %identity,
                    failures = state.failure_count,
                    locked_until = %until,
                    "Login source locked out"
                );
                FailureOutcome::Locked {
                    failures: state.failure_count,
                    until,
                    duration: policy.lockout_duration,
                }
            }
            _ => FailureOutcome::Tracking {
                failures: state.failure_count,
                remaining: policy.max_attempts - state.failure_count,
            },
        }
    }

    /// Tracked state for `identity`, if any.
    pub fn state(&self, identity: &Identity) -> Option<AttemptState> {
        self.store.get(identity)
    }

    /// Number of identities with tracked state.
    pub fn tracked_identities(&self) -> usize {
        self.store.len()
    }
}

fn ceil_to_seconds(delta: TimeDelta) -> Duration {
    let exact = delta.to_std().unwrap_or_default();
    Duration::from_secs(exact.as_secs() + u64::from(exact.subsec_nanos() > 0))
}
