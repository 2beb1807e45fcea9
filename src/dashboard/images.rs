use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Serialize;

use crate::{
    error::DashboardError,
    report::{Aggregator, ImageEntry},
    state::DashboardState,
};

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    registry: String,
    images: Vec<ImageEntry>,
    total_size: String,
    total_bytes: u64,
}

/// Full report, recomputed from the registry on every call.
pub(crate) async fn get(
    State(state): State<Arc<DashboardState>>,
) -> Result<Json<ImagesResponse>, DashboardError> {
    let report = Aggregator::new(&state.client).run().await?;
    state.metrics.reports_built.inc();

    Ok(Json(ImagesResponse {
        registry: state.config.registry_name(),
        total_size: report.total_size(),
        total_bytes: report.total_bytes,
        images: report.images,
    }))
}
