use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use rag_core::RagError;

/// Wraps `RagError` so handlers can use `?` and still get a uniform HTTP
/// mapping, done once here instead of per handler.
pub struct ApiError(pub RagError);

impl From<RagError> for ApiError {
    fn from(e: RagError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, component) = match &self.0 {
            RagError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.0.component()),
            RagError::UpstreamDms { .. } => (StatusCode::BAD_GATEWAY, self.0.component()),
            RagError::UpstreamVector { .. } => (StatusCode::BAD_GATEWAY, self.0.component()),
            RagError::UpstreamLlm { .. } => (StatusCode::BAD_GATEWAY, self.0.component()),
            RagError::UpstreamEmbedding { .. } => (StatusCode::BAD_GATEWAY, self.0.component()),
            RagError::Extraction { .. } => (StatusCode::UNPROCESSABLE_ENTITY, self.0.component()),
            RagError::Embedding(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.0.component()),
            RagError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.component()),
            RagError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.0.component()),
            RagError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.0.component()),
        };

        log::error!("request failed in component '{component}': {}", self.0);

        (
            status,
            Json(json!({
                "status": "error",
                "component": component,
                "error": self.0.to_string(),
            })),
        )
            .into_response()
    }
}
