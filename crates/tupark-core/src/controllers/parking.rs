use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use crate::error::TuparkError;
use crate::extractors::{AdminUser, ClientAddr, Json};
use crate::parking::{SpotUpdate, SpotView};
use crate::response::ApiResponse;

use super::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/spots", get(list_spots))
        .route("/api/update-spot", post(update_spot))
}

#[utoipa::path(
    get,
    path = "/api/spots",
    responses(
        (status = 200, description = "All parking slots", body = ApiResponse<Vec<SpotView>>)
    ),
    tag = "parking"
)]
pub async fn list_spots(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<SpotView>>, TuparkError> {
    Ok(ApiResponse::success(state.parking.list_spots().await?))
}

/// Occupy or release a slot.
#[utoipa::path(
    post,
    path = "/api/update-spot",
    request_body = SpotUpdate,
    responses(
        (status = 200, description = "Slot updated", body = ApiResponse<SpotView>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown slot"),
        (status = 409, description = "Vehicle already parked elsewhere"),
        (status = 422, description = "Invalid plate or vehicle type")
    ),
    tag = "parking",
    security(("bearer_auth" = []))
)]
pub async fn update_spot(
    State(state): State<AppState>,
    AdminUser(username): AdminUser,
    ClientAddr(client): ClientAddr,
    Json(payload): Json<SpotUpdate>,
) -> Result<ApiResponse<SpotView>, TuparkError> {
    let spot = state
        .parking
        .update_spot(payload, &username, &client)
        .await?;
    Ok(ApiResponse::success(spot))
}
