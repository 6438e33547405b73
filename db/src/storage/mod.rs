use async_trait::async_trait;
use diesel_async::pooled_connection::PoolError;
use slotd_common::Labels;
use thiserror::Error;

use crate::models::{Activation, LicenseRecord, LicenseUsage, NewLicense};

pub mod memory;
pub mod sqlite;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Admitting a new identity would exceed the current ceiling.
    #[error("license limit exceeded: {active}/{max}")]
    LimitExceeded { active: i64, max: i64 },

    /// No activation exists for the given agent key.
    #[error("activation not found: {0}")]
    NotFound(String),

    #[error("Query Error: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection Error: {0}")]
    Pool(#[from] bb8::RunError<PoolError>),

    #[error("Pool Setup Error: {0}")]
    PoolSetup(#[from] PoolError),

    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Whether the failure is a business outcome rather than a store fault.
    pub fn is_business(&self) -> bool {
        matches!(self, Self::LimitExceeded { .. } | Self::NotFound(_))
    }

    /// Whether retrying the same operation later may succeed without any
    /// change in state.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Pool(bb8::RunError::TimedOut) => true,
            Self::Query(diesel::result::Error::DatabaseError(_, info)) => {
                let message = info.message();
                message.contains("locked") || message.contains("busy")
            }
            _ => false,
        }
    }
}

/// The admission contract shared by every ledger implementation.
///
/// Mutations are atomic: the ceiling check, the activation write and the
/// audit entry either all commit or none do.
#[async_trait]
pub trait Ledger: Send + Sync + 'static {
    /// Admit `agent_key` or refresh its existing activation.
    ///
    /// New identities are checked against the ceiling of the active license
    /// record, or the configured fallback when there is none. Refreshing a
    /// known identity never counts against the ceiling.
    async fn admit(
        &self,
        agent_key: &str,
        ip: &str,
        labels: &Labels,
    ) -> Result<Activation, StoreError>;

    /// Remove the activation for `agent_key`.
    async fn remove(&self, agent_key: &str) -> Result<(), StoreError>;

    /// Every activation, most recently admitted first.
    async fn list_all(&self) -> Result<Vec<Activation>, StoreError>;

    /// Slot usage against the active license record.
    async fn status(&self) -> Result<LicenseUsage, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// License records are provisioned out of band; the ledger only reads them.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    async fn create_license(&self, license: NewLicense) -> Result<LicenseRecord, StoreError>;

    /// All license records, newest first.
    async fn list_licenses(&self) -> Result<Vec<LicenseRecord>, StoreError>;
}

/// Reject a new admission when the active set is already at the ceiling.
pub(crate) fn ensure_capacity(active: i64, max: i64) -> Result<(), StoreError> {
    if active >= max {
        return Err(StoreError::LimitExceeded { active, max });
    }
    Ok(())
}
