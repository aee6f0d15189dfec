use axum::{
    http::{header, HeaderValue},
    response::IntoResponse,
};

/// Liveness probe. Does not touch the data source.
pub async fn health() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        "ok",
    )
}
