use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use slotd_common::Labels;
use tracing::{info, warn};

use crate::{
    models::{Activation, AuditEntry, LicenseRecord, LicenseUsage, NewLicense},
    storage::{Ledger, LicenseStore, StoreError, ensure_capacity},
};

#[derive(Debug, Default)]
struct MemoryState {
    activations: HashMap<String, Activation>,
    licenses: Vec<LicenseRecord>,
    audit: Vec<AuditEntry>,
}

impl MemoryState {
    fn active_license(&self) -> Option<&LicenseRecord> {
        // Later records win ties, matching the id tiebreak of the SQL store.
        self.licenses
            .iter()
            .filter(|l| l.is_active())
            .max_by_key(|l| (l.created_at, l.id))
    }
}

/// Volatile ledger holding everything in process memory.
///
/// Every operation runs under a single lock, which gives the same
/// all-or-nothing guarantee as a store transaction. State is lost when the
/// process exits.
#[derive(Debug)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
    fallback_max_agents: i64,
}

impl MemoryLedger {
    pub fn new(fallback_max_agents: i64) -> Self {
        Self {
            state: Mutex::default(),
            fallback_max_agents,
        }
    }

    /// Snapshot of the audit trail, oldest first.
    pub fn audit_entries(&self) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(self.lock()?.audit.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Internal("memory ledger lock poisoned".into()))
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn admit(
        &self,
        agent_key: &str,
        ip: &str,
        labels: &Labels,
    ) -> Result<Activation, StoreError> {
        let label_value = serde_json::to_value(labels)?;
        let mut state = self.lock()?;

        let max_agents = state
            .active_license()
            .map(|l| i64::from(l.max_agents))
            .unwrap_or(self.fallback_max_agents);
        let active = state.activations.len() as i64;
        let now = Utc::now();

        let (activation, is_new) = match state.activations.get_mut(agent_key) {
            Some(existing) => {
                existing.ip = ip.to_string();
                existing.labels = label_value;
                existing.last_seen_at = now;
                (existing.clone(), false)
            }
            None => {
                if let Err(e) = ensure_capacity(active, max_agents) {
                    warn!(
                        %agent_key,
                        active,
                        max = max_agents,
                        "Admission rejected, license limit reached"
                    );
                    return Err(e);
                }

                let activation = Activation {
                    agent_key: agent_key.to_string(),
                    ip: ip.to_string(),
                    labels: label_value,
                    activation_sig: None,
                    hardware_hash: None,
                    activated_at: now,
                    updated_at: now,
                    last_seen_at: now,
                };
                state
                    .activations
                    .insert(agent_key.to_string(), activation.clone());
                (activation, true)
            }
        };

        state.audit.push(AuditEntry::activation(
            agent_key, ip, labels, is_new, max_agents, now,
        ));

        info!(%agent_key, %ip, is_new, max_agents, "Device admitted");

        Ok(activation)
    }

    async fn remove(&self, agent_key: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.activations.remove(agent_key).is_none() {
            return Err(StoreError::NotFound(agent_key.to_string()));
        }

        state
            .audit
            .push(AuditEntry::deactivation(agent_key, Utc::now()));

        info!(%agent_key, "Device removed");

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Activation>, StoreError> {
        let state = self.lock()?;
        let mut all: Vec<_> = state.activations.values().cloned().collect();
        all.sort_by(|a, b| {
            b.activated_at
                .cmp(&a.activated_at)
                .then_with(|| a.agent_key.cmp(&b.agent_key))
        });
        Ok(all)
    }

    async fn status(&self) -> Result<LicenseUsage, StoreError> {
        let state = self.lock()?;
        Ok(LicenseUsage::new(
            state.activations.len() as i64,
            state.active_license(),
        ))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl LicenseStore for MemoryLedger {
    async fn create_license(&self, license: NewLicense) -> Result<LicenseRecord, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let record = LicenseRecord {
            id: state.licenses.len() as i32 + 1,
            install_id: license.install_id,
            license_key: license.license_key,
            max_agents: license.max_agents,
            status: license.status,
            expires_at: license.expires_at,
            last_heartbeat_at: None,
            created_at: now,
            updated_at: now,
        };
        state.licenses.push(record.clone());
        Ok(record)
    }

    async fn list_licenses(&self) -> Result<Vec<LicenseRecord>, StoreError> {
        let state = self.lock()?;
        let mut all = state.licenses.clone();
        all.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(all)
    }
}
