use axum::{extract::State, routing::get, Router};

use crate::audit::AuditEntry;
use crate::error::TuparkError;
use crate::extractors::AdminUser;
use crate::response::ApiResponse;

use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/logs", get(list_logs))
}

/// Retained audit entries, most recent first.
#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Audit trail", body = ApiResponse<Vec<AuditEntry>>),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Audit store unavailable")
    ),
    tag = "audit",
    security(("bearer_auth" = []))
)]
pub async fn list_logs(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<ApiResponse<Vec<AuditEntry>>, TuparkError> {
    let entries = state.audit.list_recent().await?;
    Ok(ApiResponse::success(entries))
}
