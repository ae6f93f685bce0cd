//! Request-level middleware.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tupark_core::auth::middleware::throttle;
//!
//! Router::new()
//!     .route("/api/spots", get(list_spots))
//!     .layer(axum::middleware::from_fn_with_state(limiter, throttle))
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::rate_limit::RateLimiter;
use crate::extractors::ClientAddr;
use crate::response::ApiResponse;

pub const THROTTLED_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// Reject clients that exceed the global per-address request budget.
pub async fn throttle(
    State(limiter): State<Arc<RateLimiter>>,
    ClientAddr(client): ClientAddr,
    req: Request,
    next: Next,
) -> Response {
    match limiter.check(client.as_str()) {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            tracing::warn!(client = %client, retry_after, "Request throttled");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                axum::Json(ApiResponse::<()>::failure(THROTTLED_MESSAGE)),
            )
                .into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
    }
}
