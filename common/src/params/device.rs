use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for activating a single device.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivateDeviceParams {
    /// Optional caller-side identifier, echoed back in batch results.
    #[serde(default)]
    pub device_id: Option<String>,

    /// Stable identity of the agent.
    pub agent_key: String,

    /// Address the agent can be scraped on.
    pub ip_address: String,

    /// Scrape port. Zero or absent selects the default port.
    #[serde(default)]
    pub port: u16,
}

/// Request body for activating several devices at once.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BatchActivateParams {
    pub devices: Vec<ActivateDeviceParams>,
}

/// Request body for releasing a device's slot.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeactivateDeviceParams {
    pub device_id: String,
}

/// Request body for the device management endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateDeviceParams {
    pub agent_key: String,
    pub ip: String,

    #[serde(default)]
    pub port: u16,
}
