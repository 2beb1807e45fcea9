use anyhow::Result;
use prometheus_client::registry::Registry;

use crate::{config::Configuration, metrics::DashboardMetrics, registry::RegistryClient};

/// Shared by every request. Immutable after startup apart from metric counters.
pub struct DashboardState {
    pub config: Configuration,
    pub client: RegistryClient,
    pub(crate) metrics: DashboardMetrics,
    pub(crate) registry: Registry,
}

impl DashboardState {
    pub fn new(config: Configuration) -> Result<Self> {
        let mut registry = Registry::with_prefix("regdash");

        let client = RegistryClient::new(&config.registry, &mut registry)?;
        let metrics = DashboardMetrics::new(&mut registry);

        Ok(Self {
            config,
            client,
            metrics,
            registry,
        })
    }
}
