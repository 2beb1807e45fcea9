use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get},
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::state::DashboardState;

pub(crate) use middleware::{RewriteUriLayer, RewriteUriService};

mod delete;
mod health;
mod images;
mod middleware;

pub fn router(state: Arc<DashboardState>) -> Router {
    Router::new()
        .route("/api/images", get(images::get))
        .route("/delete/{repository}/{tag}", delete(delete::delete))
        .route("/health/liveness", get(health::liveness))
        .route("/health/readiness", get(health::readiness))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
