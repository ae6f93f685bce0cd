use utoipa::OpenApi;

use crate::audit::{AuditAction, AuditEntry};
use crate::controllers::auth::{LoginRequest, LoginResponse};
use crate::parking::{ReportSubmission, ReportView, SpotStatus, SpotUpdate, SpotView};

/// OpenAPI documentation for TUPark.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "TUPark API",
        version = "0.1.0",
        description = "Parking facility administration with login lockout and an audit trail."
    ),
    paths(
        crate::controllers::auth::login,
        crate::controllers::auth::logout,
        crate::controllers::auth::session_timeout,
        crate::controllers::logs::list_logs,
        crate::controllers::parking::list_spots,
        crate::controllers::parking::update_spot,
        crate::controllers::reports::submit_report,
        crate::controllers::reports::list_reports,
        crate::controllers::reports::delete_report,
    ),
    components(
        schemas(
            LoginRequest,
            LoginResponse,
            AuditAction,
            AuditEntry,
            SpotStatus,
            SpotUpdate,
            SpotView,
            ReportSubmission,
            ReportView,
        )
    ),
    tags(
        (name = "auth", description = "Administrator sessions"),
        (name = "audit", description = "Activity log"),
        (name = "parking", description = "Slot occupancy"),
        (name = "reports", description = "Driver problem reports")
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add JWT Bearer security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
