use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use slotd_common::views::LicenseStatus;

use crate::schema::license_info;

/// Status value marking the license record that governs admissions.
pub const LICENSE_STATUS_ACTIVE: &str = "active";

/// Status reported when no active license record exists.
pub const LICENSE_STATUS_INACTIVE: &str = "inactive";

/// A row of the `license_info` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = license_info)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DbLicense {
    pub id: i32,
    pub install_id: String,
    pub license_key: Option<String>,
    pub max_agents: i32,
    pub status: String,
    pub expires_at: Option<NaiveDateTime>,
    pub last_heartbeat_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = license_info)]
pub struct DbNewLicense {
    pub install_id: String,
    pub license_key: Option<String>,
    pub max_agents: i32,
    pub status: String,
    pub expires_at: Option<NaiveDateTime>,
    pub last_heartbeat_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A license record as provisioned by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseRecord {
    pub id: i32,
    pub install_id: String,
    pub license_key: Option<String>,
    pub max_agents: i32,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LicenseRecord {
    pub fn is_active(&self) -> bool {
        self.status == LICENSE_STATUS_ACTIVE
    }
}

impl From<DbLicense> for LicenseRecord {
    fn from(value: DbLicense) -> Self {
        Self {
            id: value.id,
            install_id: value.install_id,
            license_key: value.license_key,
            max_agents: value.max_agents,
            status: value.status,
            expires_at: value.expires_at.map(super::utc),
            last_heartbeat_at: value.last_heartbeat_at.map(super::utc),
            created_at: super::utc(value.created_at),
            updated_at: super::utc(value.updated_at),
        }
    }
}

/// Input for provisioning a license record.
#[derive(Debug, Clone)]
pub struct NewLicense {
    pub install_id: String,
    pub license_key: Option<String>,
    pub max_agents: i32,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewLicense {
    pub fn active(install_id: impl Into<String>, max_agents: i32) -> Self {
        Self {
            install_id: install_id.into(),
            license_key: None,
            max_agents,
            status: LICENSE_STATUS_ACTIVE.into(),
            expires_at: None,
        }
    }

    pub(crate) fn into_row(self, now: DateTime<Utc>) -> DbNewLicense {
        DbNewLicense {
            install_id: self.install_id,
            license_key: self.license_key,
            max_agents: self.max_agents,
            status: self.status,
            expires_at: self.expires_at.map(|t| t.naive_utc()),
            last_heartbeat_at: None,
            created_at: now.naive_utc(),
            updated_at: now.naive_utc(),
        }
    }
}

/// Slot usage as seen by a status read.
///
/// Unlike admission, this does not fall back to the configured ceiling: with
/// no active license the ceiling is reported as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseUsage {
    pub used_slots: i64,
    pub max_slots: i64,
    pub status: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
}

impl LicenseUsage {
    pub fn new(used_slots: i64, active_license: Option<&LicenseRecord>) -> Self {
        match active_license {
            Some(license) => Self {
                used_slots,
                max_slots: i64::from(license.max_agents),
                status: license.status.clone(),
                expires_at: license.expires_at,
                last_heartbeat_at: license.last_heartbeat_at,
            },
            None => Self {
                used_slots,
                max_slots: 0,
                status: LICENSE_STATUS_INACTIVE.into(),
                expires_at: None,
                last_heartbeat_at: None,
            },
        }
    }

    pub fn remaining_slots(&self) -> i64 {
        (self.max_slots - self.used_slots).max(0)
    }
}

impl From<LicenseUsage> for LicenseStatus {
    fn from(value: LicenseUsage) -> Self {
        Self {
            used_slots: value.used_slots,
            max_slots: value.max_slots,
            remaining_slots: value.remaining_slots(),
            status: value.status,
            expires_at: value.expires_at,
            last_heartbeat: value.last_heartbeat_at,
            is_online: true,
        }
    }
}
