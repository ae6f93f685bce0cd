pub mod attempt_store;
pub mod credentials;
pub mod identity;
pub mod jwt;
pub mod lockout;
pub mod login;
pub mod middleware;
pub mod rate_limit;

pub use attempt_store::{AttemptState, AttemptStore, BoundedAttemptStore};
pub use credentials::{create_admin, CredentialVerifier, DbCredentialVerifier};
pub use identity::Identity;
pub use jwt::{create_token, validate_token, Claims};
pub use lockout::{Admission, FailureOutcome, LockoutPolicy, LoginGuard};
pub use login::{LoginOutcome, LoginService};
pub use rate_limit::RateLimiter;
