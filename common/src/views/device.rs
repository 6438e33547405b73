use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::identity::DeviceId;

/// A device currently holding a license slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Stable identifier derived from the agent key.
    pub id: DeviceId,

    /// Identity the agent presented when it was admitted.
    pub agent_key: String,

    /// Address the agent last reported.
    pub ip: String,

    /// Port the scrape system should use to reach the agent.
    pub port: u16,

    pub status: DeviceStatus,

    /// When the device was first admitted.
    pub created_at: DateTime<Utc>,

    /// When the device last refreshed its activation.
    pub updated_at: DateTime<Utc>,
}

/// Only admitted devices are ever materialized, so there is a single state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    #[default]
    Active,
}

/// A scrape target for a single device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Target {
    /// `address:port` of the device.
    pub address: String,
    pub labels: BTreeMap<String, String>,
}

/// One entry of the HTTP service-discovery feed.
///
/// Scrapers parse this shape directly: a `targets` array holding exactly one
/// address, and a `labels` map that is left out entirely when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DiscoveryGroup {
    pub targets: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl From<Target> for DiscoveryGroup {
    fn from(value: Target) -> Self {
        Self {
            targets: vec![value.address],
            labels: value.labels,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn discovery_group_has_single_target() {
        let group = DiscoveryGroup::from(Target {
            address: "10.0.0.1:9182".into(),
            labels: BTreeMap::from([("job".to_string(), "windows-agents".to_string())]),
        });

        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "targets": ["10.0.0.1:9182"],
                "labels": { "job": "windows-agents" },
            })
        );
    }

    #[test]
    fn discovery_group_omits_empty_labels() {
        let group = DiscoveryGroup::from(Target {
            address: "10.0.0.1:9100".into(),
            labels: BTreeMap::new(),
        });

        let json = serde_json::to_string(&group).unwrap();
        assert_eq!(json, r#"{"targets":["10.0.0.1:9100"]}"#);
    }

    #[test]
    fn device_serializes_camel_case() {
        let now = Utc::now();
        let device = Device {
            id: DeviceId::for_agent("a1"),
            agent_key: "a1".into(),
            ip: "10.0.0.1".into(),
            port: 9182,
            status: DeviceStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["id"], "device-a1");
        assert_eq!(json["agentKey"], "a1");
        assert_eq!(json["status"], "active");
        assert!(json.get("createdAt").is_some());
    }
}
