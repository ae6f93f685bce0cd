pub mod app;
pub mod audit;
pub mod auth;
pub mod clock;
pub mod config;
pub mod controllers;
pub mod db;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod migrations;
pub mod models;
pub mod openapi;
pub mod parking;
pub mod response;
pub mod routing;
pub mod testing;

pub use app::App;
pub use audit::{AppendMode, AuditAction, AuditEntry, AuditLog, NewAuditEntry};
pub use auth::{Admission, FailureOutcome, Identity, LoginGuard, LoginOutcome, LoginService};
pub use config::{Config, SecurityConfig};
pub use error::TuparkError;
pub use response::ApiResponse;
pub use testing::{TestApp, TestClient, TestResponse};
