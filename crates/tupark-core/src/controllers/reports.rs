use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Router,
};

use crate::error::TuparkError;
use crate::extractors::{AdminUser, ClientAddr, Json};
use crate::parking::{ReportSubmission, ReportView};
use crate::response::ApiResponse;

use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/submit-report", post(submit_report))
        .route("/api/admin/reports", get(list_reports))
        .route("/api/admin/reports/{id}", delete(delete_report))
}

/// File a problem report for a parked vehicle.
#[utoipa::path(
    post,
    path = "/api/submit-report",
    request_body = ReportSubmission,
    responses(
        (status = 200, description = "Report saved", body = ApiResponse<ReportView>),
        (status = 422, description = "Missing fields or vehicle not parked")
    ),
    tag = "reports"
)]
pub async fn submit_report(
    State(state): State<AppState>,
    Json(payload): Json<ReportSubmission>,
) -> Result<ApiResponse<ReportView>, TuparkError> {
    let report = state.parking.submit_report(payload).await?;
    Ok(ApiResponse::success(report))
}

#[utoipa::path(
    get,
    path = "/api/admin/reports",
    responses(
        (status = 200, description = "All reports, newest first", body = ApiResponse<Vec<ReportView>>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "reports",
    security(("bearer_auth" = []))
)]
pub async fn list_reports(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<ApiResponse<Vec<ReportView>>, TuparkError> {
    Ok(ApiResponse::success(state.parking.list_reports().await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/reports/{id}",
    params(("id" = i32, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown report")
    ),
    tag = "reports",
    security(("bearer_auth" = []))
)]
pub async fn delete_report(
    State(state): State<AppState>,
    AdminUser(username): AdminUser,
    ClientAddr(client): ClientAddr,
    Path(id): Path<i32>,
) -> Result<ApiResponse<()>, TuparkError> {
    state.parking.delete_report(id, &username, &client).await?;
    Ok(ApiResponse::ok())
}
