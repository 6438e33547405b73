use axum::{Json, extract::State};
use chrono::Utc;
use slotd_common::views::{HealthResponse, VersionInfo};

use crate::{context::ApiContext, error::ApiError};

#[utoipa::path(
    get,
    path = "/health",
    tags = ["health"],
    responses(
        (status = 200, description = "Service and database are reachable", body = HealthResponse)
    )
)]
pub async fn health(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    ctx.registry.ping().await?;

    Ok(Json(HealthResponse {
        status: "ok".into(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").into(),
    }))
}

#[utoipa::path(
    get,
    path = "/healthz",
    tags = ["health"],
    responses(
        (status = 200, description = "Liveness check", body = String, content_type = "text/plain")
    )
)]
pub async fn healthz() -> &'static str {
    "OK"
}

#[utoipa::path(
    get,
    path = "/version",
    tags = ["health"],
    responses((status = 200, description = "Build information", body = VersionInfo))
)]
pub async fn version() -> Json<VersionInfo> {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION").into(),
        commit: option_env!("SLOTD_BUILD_COMMIT").unwrap_or("unknown").into(),
        date: option_env!("SLOTD_BUILD_DATE").unwrap_or("unknown").into(),
    })
}
