use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Device;

/// Response body for a single activation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivateDeviceResponse {
    pub success: bool,
    pub device: Device,
    pub message: String,
}

/// Response body for a deactivation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeactivateDeviceResponse {
    pub success: bool,
    pub message: String,

    /// The device id that was released.
    pub device: String,
}

/// Outcome of one entry of a batch activation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceActivationResult {
    /// The device id supplied by the caller, or the derived one if none was.
    pub device_id: String,
    pub ip_address: String,
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response body for a batch activation that passed the capacity check.
/// Individual entries may still have failed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchActivationResponse {
    pub ok: bool,
    pub success_count: usize,
    pub total_count: usize,
    pub results: Vec<DeviceActivationResult>,
    pub message: String,
}

/// Response body for a batch rejected before any admission was attempted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchCapacityRejection {
    pub ok: bool,
    pub reason: String,
    pub message: String,
    pub current_active: i64,
    pub max_devices: i64,
    pub requested: usize,
}
