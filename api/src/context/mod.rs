use std::sync::Arc;

use slotd_db::storage::Ledger;

use crate::{config::SlotdConfig, registry::RegistryService};

#[derive(Debug, Clone)]
pub struct ApiContext {
    pub config: SlotdConfig,
    pub registry: Arc<RegistryService>,
}

impl ApiContext {
    pub fn new(config: SlotdConfig, ledger: Arc<dyn Ledger>) -> Self {
        let registry = RegistryService::new(ledger, config.job_name.clone());
        Self {
            config,
            registry: Arc::new(registry),
        }
    }
}
