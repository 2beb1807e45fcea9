use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use tokio::task::JoinSet;
use tracing::info;

use crate::state::DashboardState;

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
pub(crate) struct DeleteLabels {
    pub outcome: String,
}

pub(crate) struct DashboardMetrics {
    pub reports_built: Counter,
    pub deletes: Family<DeleteLabels, Counter>,
}

impl DashboardMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let reports_built = Counter::default();
        registry.register(
            "reports_built",
            "Number of full registry reports computed",
            reports_built.clone(),
        );

        let deletes = Family::<DeleteLabels, Counter>::default();
        registry.register(
            "deletes",
            "Number of image deletes by outcome",
            deletes.clone(),
        );

        Self {
            reports_built,
            deletes,
        }
    }

    pub fn delete(&self, outcome: &str) {
        self.deletes
            .get_or_create(&DeleteLabels {
                outcome: outcome.to_string(),
            })
            .inc();
    }
}

/// Axum handler that returns Prometheus metrics
async fn metrics_handler(State(state): State<Arc<DashboardState>>) -> Response {
    let mut buffer = String::new();

    if let Err(err) = encode(&mut buffer, &state.registry) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", err),
        )
            .into_response();
    }

    (
        axum::http::StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        buffer,
    )
        .into_response()
}

pub(crate) fn router(state: Arc<DashboardState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

pub(crate) fn start_metrics(
    tasks: &mut JoinSet<Result<()>>,
    state: Arc<DashboardState>,
) -> Result<()> {
    let app = router(state.clone());

    let listen_addr = format!(
        "{}:{}",
        state.config.prometheus.address, state.config.prometheus.port
    );

    tasks.spawn(async move {
        let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
        info!("Serving metrics on {listen_addr}");
        axum::serve(listener, app).await?;
        Ok(())
    });

    Ok(())
}
