//! Read views over ledger state.
//!
//! Everything here is a pure function of an [`Activation`]: the same row
//! always projects to the same device and the same target, byte for byte.

use serde_json::Value;
use slotd_common::{
    DEFAULT_SCRAPE_PORT, Labels,
    identity::DeviceId,
    label_keys,
    views::{Device, DeviceStatus, Target},
};
use slotd_db::models::Activation;

/// Label bag written on admission.
pub fn admission_labels(agent_key: &str, port: u16, job_name: &str) -> Labels {
    Labels::from([
        (label_keys::PORT.to_string(), port.to_string()),
        (label_keys::JOB.to_string(), job_name.to_string()),
        (label_keys::AGENT_KEY.to_string(), agent_key.to_string()),
    ])
}

/// Scrape port stored in `labels`.
///
/// Accepts a JSON number or a numeric string. Anything else, including a
/// missing label or a value outside the port range, yields the default port.
pub fn decode_port(labels: &Value) -> u16 {
    let port = match labels.get(label_keys::PORT) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|p| u16::try_from(p).ok()),
        Some(Value::String(s)) => s.trim().parse::<u16>().ok(),
        _ => None,
    };

    port.filter(|p| *p != 0).unwrap_or(DEFAULT_SCRAPE_PORT)
}

pub fn to_device(activation: &Activation) -> Device {
    Device {
        id: DeviceId::for_agent(&activation.agent_key),
        agent_key: activation.agent_key.clone(),
        ip: activation.ip.clone(),
        port: decode_port(&activation.labels),
        status: DeviceStatus::Active,
        created_at: activation.activated_at,
        updated_at: activation.last_seen_at,
    }
}

pub fn to_target(activation: &Activation, job_name: &str) -> Target {
    let device_id = DeviceId::for_agent(&activation.agent_key);

    Target {
        address: format!("{}:{}", activation.ip, decode_port(&activation.labels)),
        labels: Labels::from([
            (label_keys::JOB.to_string(), job_name.to_string()),
            (label_keys::DEVICE_ID.to_string(), device_id.into()),
            (
                label_keys::AGENT_KEY.to_string(),
                activation.agent_key.clone(),
            ),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use slotd_common::views::DiscoveryGroup;

    use super::*;

    fn activation(agent_key: &str, labels: Value) -> Activation {
        let admitted = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let seen = Utc.with_ymd_and_hms(2025, 3, 1, 12, 5, 0).unwrap();
        Activation {
            agent_key: agent_key.into(),
            ip: "10.0.0.1".into(),
            labels,
            activation_sig: None,
            hardware_hash: None,
            activated_at: admitted,
            updated_at: admitted,
            last_seen_at: seen,
        }
    }

    #[test]
    fn port_from_string_label() {
        assert_eq!(decode_port(&json!({ "port": "9100" })), 9100);
    }

    #[test]
    fn port_from_numeric_label() {
        assert_eq!(decode_port(&json!({ "port": 9100 })), 9100);
        assert_eq!(decode_port(&json!({ "port": 9100.0 })), 9100);
    }

    #[test]
    fn port_defaults_when_missing_or_malformed() {
        for labels in [
            json!({}),
            Value::Null,
            json!({ "port": "abc" }),
            json!({ "port": "70000" }),
            json!({ "port": -1 }),
            json!({ "port": 0 }),
            json!({ "port": true }),
            json!(["port", "9100"]),
        ] {
            assert_eq!(decode_port(&labels), DEFAULT_SCRAPE_PORT, "{labels}");
        }
    }

    #[test]
    fn admission_labels_round_trip_through_port_decoding() {
        let labels = serde_json::to_value(admission_labels("a1", 9100, "lab")).unwrap();
        assert_eq!(labels["job"], "lab");
        assert_eq!(labels["__meta_agent_key"], "a1");
        assert_eq!(decode_port(&labels), 9100);
    }

    #[test]
    fn device_view_uses_activation_timestamps() {
        let a = activation("a1", json!({ "port": "9100" }));
        let device = to_device(&a);

        assert_eq!(device.id.as_str(), "device-a1");
        assert_eq!(device.id.agent_key(), "a1");
        assert_eq!(device.port, 9100);
        assert_eq!(device.status, DeviceStatus::Active);
        assert_eq!(device.created_at, a.activated_at);
        assert_eq!(device.updated_at, a.last_seen_at);
        assert_eq!(to_device(&a), device);
    }

    #[test]
    fn device_without_port_label_uses_default() {
        assert_eq!(to_device(&activation("a1", json!({}))).port, 9182);
    }

    #[test]
    fn target_is_stable() {
        let a = activation("a1", json!({ "port": "9100", "job": "ignored" }));
        let first = serde_json::to_vec(&to_target(&a, "windows-agents")).unwrap();
        let second = serde_json::to_vec(&to_target(&a, "windows-agents")).unwrap();
        assert_eq!(first, second);

        let group = DiscoveryGroup::from(to_target(&a, "windows-agents"));
        assert_eq!(
            serde_json::to_string(&group).unwrap(),
            r#"{"targets":["10.0.0.1:9100"],"labels":{"__meta_agent_key":"a1","__meta_device_id":"device-a1","job":"windows-agents"}}"#
        );
    }
}
