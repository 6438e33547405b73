use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use tracing::warn;

use crate::schema::activations;

/// A row of the `activations` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = activations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbActivation {
    pub agent_key: String,
    pub ip: String,

    /// Label bag serialized as a JSON object.
    pub labels: String,

    pub activation_sig: Option<String>,
    pub hardware_hash: Option<String>,
    pub activated_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_seen_at: NaiveDateTime,
}

/// A device admitted into the active set.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    /// Caller-chosen identity; unique across the active set.
    pub agent_key: String,

    /// Address reported on the most recent admission.
    pub ip: String,

    /// Label bag from the most recent admission. `Null` when the stored
    /// value could not be decoded.
    pub labels: Value,

    /// Carried through untouched, never validated here.
    pub activation_sig: Option<String>,
    pub hardware_hash: Option<String>,

    pub activated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl From<DbActivation> for Activation {
    fn from(value: DbActivation) -> Self {
        let labels = serde_json::from_str(&value.labels).unwrap_or_else(|e| {
            warn!(agent_key = %value.agent_key, error = %e, "Stored labels are not valid JSON");
            Value::Null
        });

        Self {
            agent_key: value.agent_key,
            ip: value.ip,
            labels,
            activation_sig: value.activation_sig,
            hardware_hash: value.hardware_hash,
            activated_at: super::utc(value.activated_at),
            updated_at: super::utc(value.updated_at),
            last_seen_at: super::utc(value.last_seen_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(labels: &str) -> DbActivation {
        let now = Utc::now().naive_utc();
        DbActivation {
            agent_key: "a1".into(),
            ip: "10.0.0.1".into(),
            labels: labels.into(),
            activation_sig: None,
            hardware_hash: Some("hw".into()),
            activated_at: now,
            updated_at: now,
            last_seen_at: now,
        }
    }

    #[test]
    fn decodes_stored_labels() {
        let activation = Activation::from(row(r#"{"port":"9100"}"#));
        assert_eq!(activation.labels["port"], "9100");
        assert_eq!(activation.hardware_hash.as_deref(), Some("hw"));
    }

    #[test]
    fn malformed_labels_degrade_to_null() {
        let activation = Activation::from(row("{not json"));
        assert_eq!(activation.labels, Value::Null);
        assert_eq!(activation.agent_key, "a1");
    }
}
