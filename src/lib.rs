use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, ServiceExt, extract::Request};
use tokio::task::JoinSet;
use tower::Layer;
use tracing::info;

use crate::dashboard::{RewriteUriLayer, RewriteUriService};

pub mod config;
mod dashboard;
mod error;
mod metrics;
pub mod registry;
pub mod report;
mod state;
#[cfg(test)]
mod tests;

pub use config::Configuration;
pub use dashboard::router;
pub use state::DashboardState;

pub(crate) fn service(state: Arc<DashboardState>) -> RewriteUriService<Router> {
    RewriteUriLayer.layer(router(state))
}

/// Starts the dashboard and metrics listeners. Both run until the returned
/// tasks are shut down.
pub async fn start(config: Configuration) -> Result<JoinSet<Result<()>>> {
    let state = Arc::new(DashboardState::new(config)?);
    info!(registry = %state.client.base_url(), "Starting dashboard");

    let mut tasks = JoinSet::new();

    crate::metrics::start_metrics(&mut tasks, state.clone())?;

    let listen_addr = format!(
        "{}:{}",
        state.config.dashboard.address, state.config.dashboard.port
    );
    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind dashboard to {listen_addr}"))?;

    info!("Serving dashboard on {listen_addr}");

    let app = service(state);
    tasks.spawn(async move {
        axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;
        Ok(())
    });

    Ok(tasks)
}
