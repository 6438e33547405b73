//! Use-case layer between the HTTP handlers and the ledger.

use std::{fmt, sync::Arc};

use slotd_common::{
    DEFAULT_SCRAPE_PORT,
    identity::DeviceId,
    params::ActivateDeviceParams,
    views::{BatchActivationResponse, Device, DeviceActivationResult, LicenseStatus, Target},
};
use slotd_db::storage::{Ledger, StoreError};
use thiserror::Error;
use tracing::{info, instrument, warn};

pub mod projector;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A new admission was refused because the ceiling is reached.
    #[error("license limit exceeded: {active}/{max}")]
    LimitExceeded { active: i64, max: i64 },

    /// A batch was refused as a whole before any admission was attempted.
    #[error(
        "adding {requested} devices would exceed the license limit ({current_active}/{max_devices} in use)"
    )]
    CapacityExceeded {
        current_active: i64,
        max_devices: i64,
        requested: usize,
    },

    #[error("device not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LimitExceeded { active, max } => Self::LimitExceeded { active, max },
            StoreError::NotFound(key) => Self::NotFound(key),
            other => Self::Store(other),
        }
    }
}

/// Maps caller-facing identifiers and requests onto ledger operations.
///
/// The service holds no state of its own; every call reads through to the
/// ledger.
pub struct RegistryService {
    ledger: Arc<dyn Ledger>,
    job_name: String,
}

impl fmt::Debug for RegistryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryService")
            .field("job_name", &self.job_name)
            .finish_non_exhaustive()
    }
}

impl RegistryService {
    pub fn new(ledger: Arc<dyn Ledger>, job_name: impl Into<String>) -> Self {
        Self {
            ledger,
            job_name: job_name.into(),
        }
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Admit a device, or refresh it when the agent is already active.
    #[instrument(skip(self))]
    pub async fn activate(
        &self,
        agent_key: &str,
        ip: &str,
        port: u16,
    ) -> Result<Device, RegistryError> {
        if agent_key.is_empty() || ip.is_empty() {
            return Err(RegistryError::InvalidRequest(
                "agentKey and ipAddress are required".into(),
            ));
        }

        let port = if port == 0 { DEFAULT_SCRAPE_PORT } else { port };
        let labels = projector::admission_labels(agent_key, port, &self.job_name);
        let activation = self.ledger.admit(agent_key, ip, &labels).await?;

        Ok(projector::to_device(&activation))
    }

    /// Admit several devices.
    ///
    /// The batch is refused as a whole when the free slots reported by the
    /// license status cannot cover it. That check is a snapshot: admissions
    /// racing with the batch may still cause individual entries to fail,
    /// which is reported per entry.
    #[instrument(skip(self, devices), fields(requested = devices.len()))]
    pub async fn activate_batch(
        &self,
        devices: Vec<ActivateDeviceParams>,
    ) -> Result<BatchActivationResponse, RegistryError> {
        if devices.is_empty() {
            return Err(RegistryError::InvalidRequest("no devices provided".into()));
        }

        let usage = self.ledger.status().await?;
        if usage.remaining_slots() < devices.len() as i64 {
            warn!(
                used = usage.used_slots,
                max = usage.max_slots,
                "Batch rejected, not enough free slots"
            );
            return Err(RegistryError::CapacityExceeded {
                current_active: usage.used_slots,
                max_devices: usage.max_slots,
                requested: devices.len(),
            });
        }

        let total_count = devices.len();
        let mut results = Vec::with_capacity(total_count);

        for params in devices {
            // Entries without an agent key have no derivable id; echo nothing.
            let device_id = match params.device_id.clone() {
                Some(id) => id,
                None if params.agent_key.is_empty() => String::new(),
                None => DeviceId::for_agent(&params.agent_key).into(),
            };

            let outcome = self
                .activate(&params.agent_key, &params.ip_address, params.port)
                .await;

            results.push(match outcome {
                Ok(device) => DeviceActivationResult {
                    device_id,
                    ip_address: params.ip_address,
                    success: true,
                    device: Some(device),
                    error: None,
                },
                Err(e) => DeviceActivationResult {
                    device_id,
                    ip_address: params.ip_address,
                    success: false,
                    device: None,
                    error: Some(match e {
                        RegistryError::LimitExceeded { .. } => "License limit reached".into(),
                        other => other.to_string(),
                    }),
                },
            });
        }

        let success_count = results.iter().filter(|r| r.success).count();
        info!(success_count, total_count, "Batch activation completed");

        Ok(BatchActivationResponse {
            ok: true,
            success_count,
            total_count,
            results,
            message: "Batch activation completed".into(),
        })
    }

    /// Release the slot held by `device_id`.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, device_id: &str) -> Result<DeviceId, RegistryError> {
        let id = self.resolve(device_id)?;

        self.ledger
            .remove(id.agent_key())
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => RegistryError::NotFound(device_id.to_string()),
                other => other.into(),
            })?;

        Ok(id)
    }

    pub async fn get_device(&self, device_id: &str) -> Result<Device, RegistryError> {
        let id = self.resolve(device_id)?;

        self.list_active()
            .await?
            .into_iter()
            .find(|device| device.id == id)
            .ok_or_else(|| RegistryError::NotFound(device_id.to_string()))
    }

    /// Every admitted device, most recently admitted first.
    pub async fn list_active(&self) -> Result<Vec<Device>, RegistryError> {
        let activations = self.ledger.list_all().await?;
        Ok(activations.iter().map(projector::to_device).collect())
    }

    pub async fn status(&self) -> Result<LicenseStatus, RegistryError> {
        Ok(self.ledger.status().await?.into())
    }

    /// Scrape targets for every admitted device, labelled with the
    /// configured job name.
    pub async fn list_targets(&self) -> Result<Vec<Target>, RegistryError> {
        let activations = self.ledger.list_all().await?;
        Ok(activations
            .iter()
            .map(|a| projector::to_target(a, &self.job_name))
            .collect())
    }

    pub async fn device_count(&self) -> Result<usize, RegistryError> {
        Ok(self.ledger.list_all().await?.len())
    }

    pub async fn ping(&self) -> Result<(), RegistryError> {
        Ok(self.ledger.ping().await?)
    }

    fn resolve(&self, device_id: &str) -> Result<DeviceId, RegistryError> {
        if device_id.is_empty() {
            return Err(RegistryError::InvalidRequest("deviceId is required".into()));
        }

        DeviceId::parse(device_id).ok_or_else(|| RegistryError::NotFound(device_id.to_string()))
    }
}
