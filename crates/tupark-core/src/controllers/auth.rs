use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{create_token, LoginOutcome};
use crate::error::TuparkError;
use crate::extractors::{AdminUser, ClientAddr, Json};
use crate::response::ApiResponse;

use super::AppState;

// ── Request / Response types ──

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Administrator username
    #[serde(default)]
    pub admin_id: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub username: String,
    /// Token lifetime in minutes
    pub expires_in: u64,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/api/session-timeout", post(session_timeout))
}

// ── Handlers ──

/// Administrator login guarded by the per-address lockout.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials; body carries the remaining attempts"),
        (status = 429, description = "Address locked out")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ClientAddr(client): ClientAddr,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, TuparkError> {
    let outcome = state
        .login
        .attempt(&client, payload.admin_id.trim(), &payload.password)
        .await?;

    let response = match &outcome {
        LoginOutcome::Success { username } => {
            let ttl = state.config.session_ttl_minutes;
            let access_token = create_token(username, &state.config.jwt_secret, ttl)?;
            ApiResponse::success(LoginResponse {
                access_token,
                username: username.clone(),
                expires_in: ttl,
            })
            .with_message(outcome.message())
            .into_response()
        }
        LoginOutcome::Invalid { .. } => (
            StatusCode::UNAUTHORIZED,
            axum::Json(ApiResponse::<()>::failure(outcome.message())),
        )
            .into_response(),
        LoginOutcome::Blocked { lockout } => {
            too_many(outcome.message(), lockout.as_secs())
        }
        LoginOutcome::Locked { retry_after } => {
            too_many(outcome.message(), retry_after.as_secs())
        }
    };

    Ok(response)
}

fn too_many(message: String, retry_after: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        axum::Json(ApiResponse::<()>::failure(message)),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

/// Log out the current administrator.
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    AdminUser(username): AdminUser,
    ClientAddr(client): ClientAddr,
) -> ApiResponse<()> {
    state.login.record_logout(&username, &client).await;
    ApiResponse::ok().with_message("Logged out")
}

/// Record that the dashboard signed the administrator out for inactivity.
#[utoipa::path(
    post,
    path = "/api/session-timeout",
    responses(
        (status = 200, description = "Timeout recorded"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn session_timeout(
    State(state): State<AppState>,
    AdminUser(username): AdminUser,
    ClientAddr(client): ClientAddr,
) -> ApiResponse<()> {
    state.login.record_session_timeout(&username, &client).await;
    ApiResponse::ok()
}
