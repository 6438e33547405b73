use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use serde_json::{Value, json};
use slotd_common::Labels;

use crate::schema::audit_log;

pub const AUDIT_RESULT_SUCCESS: &str = "success";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Activate,
    Deactivate,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
        }
    }
}

/// An append-only record of one admission or removal.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub agent_key: Option<String>,
    pub ip: Option<String>,
    pub result: String,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn activation(
        agent_key: &str,
        ip: &str,
        labels: &Labels,
        is_new: bool,
        max_agents: i64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            action: AuditAction::Activate,
            agent_key: Some(agent_key.to_string()),
            ip: Some(ip.to_string()),
            result: AUDIT_RESULT_SUCCESS.into(),
            details: json!({
                "agent_key": agent_key,
                "ip": ip,
                "labels": labels,
                "is_new": is_new,
                "max_agents": max_agents,
            }),
            created_at: at,
        }
    }

    pub fn deactivation(agent_key: &str, at: DateTime<Utc>) -> Self {
        Self {
            action: AuditAction::Deactivate,
            agent_key: Some(agent_key.to_string()),
            ip: None,
            result: AUDIT_RESULT_SUCCESS.into(),
            details: json!({ "agent_key": agent_key }),
            created_at: at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_log)]
pub struct DbNewAuditEntry {
    pub action: String,
    pub agent_key: Option<String>,
    pub ip: Option<String>,
    pub result: String,
    pub details: String,
    pub created_at: NaiveDateTime,
}

impl From<AuditEntry> for DbNewAuditEntry {
    fn from(value: AuditEntry) -> Self {
        Self {
            action: value.action.as_str().into(),
            agent_key: value.agent_key,
            ip: value.ip,
            result: value.result,
            details: value.details.to_string(),
            created_at: value.created_at.naive_utc(),
        }
    }
}
