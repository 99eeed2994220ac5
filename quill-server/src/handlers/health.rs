use axum::Json;
use serde::Serialize;

/// Liveness payload returned by `/health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    let version = env!("CARGO_PKG_VERSION");
    Json(HealthResponse {
        status: "ok",
        version,
    })
}
