use axum::Router;

use crate::controllers::{self, AppState};

/// Build every application route.
pub fn build_routes() -> Router<AppState> {
    Router::new()
        .merge(controllers::auth::routes())
        .merge(controllers::logs::routes())
        .merge(controllers::parking::routes())
        .merge(controllers::reports::routes())
}
