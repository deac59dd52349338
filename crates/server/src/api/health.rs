use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// `GET /status` -- liveness and build version. Not authenticated.
pub async fn status() -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}
