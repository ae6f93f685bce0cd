use std::sync::Arc;

use crate::audit::AuditLog;
use crate::auth::LoginService;
use crate::config::Config;
use crate::parking::ParkingService;

/// Shared application state available in all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub login: LoginService,
    pub audit: AuditLog,
    pub parking: ParkingService,
}

pub mod auth;
pub mod logs;
pub mod parking;
pub mod reports;
