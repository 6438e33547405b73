use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Slot accounting for the installed license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LicenseStatus {
    /// Number of devices currently admitted.
    pub used_slots: i64,

    /// Ceiling granted by the active license, or zero without one.
    pub max_slots: i64,

    /// `max_slots - used_slots`, never negative.
    pub remaining_slots: i64,

    /// Status of the active license record, `inactive` when none exists.
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,

    /// Whether the local registry answered this request.
    pub is_online: bool,
}
