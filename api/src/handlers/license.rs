use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use slotd_common::{
    params::{ActivateDeviceParams, BatchActivateParams, DeactivateDeviceParams},
    views::{
        ActivateDeviceResponse, ApiErrorResponse, BatchActivationResponse, BatchCapacityRejection,
        DeactivateDeviceResponse, LicenseStatus,
    },
};
use tracing::{info, instrument};

use crate::{context::ApiContext, error::ApiError};

#[utoipa::path(
    get,
    path = "/license/status",
    tags = ["license"],
    responses(
        (status = 200, description = "Slot usage of the installed license", body = LicenseStatus)
    )
)]
pub async fn license_status(
    State(ctx): State<ApiContext>,
) -> Result<Json<LicenseStatus>, ApiError> {
    Ok(Json(ctx.registry.status().await?))
}

#[utoipa::path(
    post,
    path = "/license/activate",
    tags = ["license"],
    request_body = ActivateDeviceParams,
    responses(
        (status = 200, description = "Device admitted or refreshed", body = ActivateDeviceResponse),
        (status = 400, description = "Missing agent key or address", body = ApiErrorResponse),
        (status = 403, description = "License limit reached", body = ApiErrorResponse),
    )
)]
#[instrument(skip(ctx, payload))]
pub async fn activate_device(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ActivateDeviceParams>, JsonRejection>,
) -> Result<Json<ActivateDeviceResponse>, ApiError> {
    let Json(params) = payload?;

    let device = ctx
        .registry
        .activate(&params.agent_key, &params.ip_address, params.port)
        .await?;

    info!(device_id = %device.id, "Device activated");

    Ok(Json(ActivateDeviceResponse {
        success: true,
        device,
        message: "Device activated successfully".into(),
    }))
}

#[utoipa::path(
    post,
    path = "/license/activate-batch",
    tags = ["license"],
    request_body = BatchActivateParams,
    responses(
        (
            status = 200,
            description = "Batch attempted; see per-entry results",
            body = BatchActivationResponse
        ),
        (status = 400, description = "Empty batch", body = ApiErrorResponse),
        (
            status = 409,
            description = "Not enough free slots for the batch",
            body = BatchCapacityRejection
        ),
    )
)]
#[instrument(skip(ctx, payload))]
pub async fn activate_batch(
    State(ctx): State<ApiContext>,
    payload: Result<Json<BatchActivateParams>, JsonRejection>,
) -> Result<Json<BatchActivationResponse>, ApiError> {
    let Json(params) = payload?;
    Ok(Json(ctx.registry.activate_batch(params.devices).await?))
}

#[utoipa::path(
    post,
    path = "/license/deactivate",
    tags = ["license"],
    request_body = DeactivateDeviceParams,
    responses(
        (status = 200, description = "Slot released", body = DeactivateDeviceResponse),
        (status = 400, description = "Missing device id", body = ApiErrorResponse),
        (status = 404, description = "No such device", body = ApiErrorResponse),
    )
)]
#[instrument(skip(ctx, payload))]
pub async fn deactivate_device(
    State(ctx): State<ApiContext>,
    payload: Result<Json<DeactivateDeviceParams>, JsonRejection>,
) -> Result<Json<DeactivateDeviceResponse>, ApiError> {
    let Json(params) = payload?;
    let device_id = ctx.registry.deactivate(&params.device_id).await?;

    info!(%device_id, "Device deactivated");

    Ok(Json(DeactivateDeviceResponse {
        success: true,
        message: "Device deactivated successfully".into(),
        device: device_id.into(),
    }))
}
