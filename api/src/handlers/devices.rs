use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use slotd_common::{
    params::CreateDeviceParams,
    views::{ApiErrorResponse, Device},
};

use crate::{context::ApiContext, error::ApiError};

#[utoipa::path(
    post,
    path = "/api/devices",
    tags = ["devices"],
    request_body = CreateDeviceParams,
    responses(
        (status = 201, description = "Device admitted or refreshed", body = Device),
        (status = 403, description = "License limit reached", body = ApiErrorResponse),
    )
)]
pub async fn create_device(
    State(ctx): State<ApiContext>,
    payload: Result<Json<CreateDeviceParams>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    let Json(params) = payload?;
    let device = ctx
        .registry
        .activate(&params.agent_key, &params.ip, params.port)
        .await?;

    Ok((StatusCode::CREATED, Json(device)))
}

#[utoipa::path(
    get,
    path = "/api/devices/active",
    tags = ["devices"],
    responses(
        (status = 200, description = "Admitted devices, most recent first", body = Vec<Device>)
    )
)]
pub async fn list_active_devices(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(ctx.registry.list_active().await?))
}

#[utoipa::path(
    get,
    path = "/api/devices/{id}",
    tags = ["devices"],
    params(("id" = String, Path, description = "Device id")),
    responses(
        (status = 200, description = "Resolved device", body = Device),
        (status = 404, description = "No such device", body = ApiErrorResponse),
    )
)]
pub async fn get_device(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    Ok(Json(ctx.registry.get_device(&id).await?))
}
