//! A simple health check endpoint for the collector.

use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Reports the collector as healthy as long as it serves requests.
pub async fn handle() -> impl IntoResponse {
    StatusCode::OK
}
