use axum::{Json, extract::State};
use slotd_common::views::DiscoveryGroup;

use crate::{context::ApiContext, error::ApiError};

/// HTTP service-discovery feed, one group per admitted device.
#[utoipa::path(
    get,
    path = "/sd/targets",
    tags = ["discovery"],
    responses((status = 200, description = "Scrape targets", body = Vec<DiscoveryGroup>))
)]
pub async fn sd_targets(
    State(ctx): State<ApiContext>,
) -> Result<Json<Vec<DiscoveryGroup>>, ApiError> {
    let targets = ctx.registry.list_targets().await?;
    Ok(Json(targets.into_iter().map(DiscoveryGroup::from).collect()))
}
