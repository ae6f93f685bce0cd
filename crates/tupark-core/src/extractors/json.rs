use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::TuparkError;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// JSON body extractor that rejects with the crate's error envelope.
///
/// Usage in handlers:
/// ```rust,ignore
/// async fn submit(Json(payload): Json<ReportSubmission>) -> impl IntoResponse {
///     // payload is deserialized from request body
/// }
/// ```
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = TuparkError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| TuparkError::BadRequest(format!("Failed to read body: {}", e)))?;

        let value: T = serde_json::from_slice(&bytes)
            .map_err(|e| TuparkError::Validation(format!("Invalid JSON: {}", e)))?;

        Ok(Json(value))
    }
}
