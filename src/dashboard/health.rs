use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::warn;

use crate::state::DashboardState;

pub(crate) async fn liveness() -> Response {
    (StatusCode::OK, Json(json!({ "status": "alive" }))).into_response()
}

/// Ready when the registry answers a catalog request.
pub(crate) async fn readiness(State(state): State<Arc<DashboardState>>) -> Response {
    let start = Instant::now();

    let (status, code) = match state.client.list_repositories().await {
        Ok(_) => ("ready", StatusCode::OK),
        Err(err) => {
            warn!(error = %err, "Readiness check failed");
            ("unready", StatusCode::SERVICE_UNAVAILABLE)
        }
    };

    let total_time_taken = start.elapsed().as_secs_f64();

    (
        code,
        Json(json!({
            "status": status,
            "total_time_taken": total_time_taken,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod test {
    use anyhow::Result;
    use axum::{body::Body, http::Request, http::StatusCode};
    use test_log::test;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    use crate::tests::{DashboardFixture, mount_catalog};

    #[test(tokio::test)]
    pub async fn alive() -> Result<()> {
        let fixture = DashboardFixture::new().await?;

        let (status, body) = fixture
            .json(
                Request::builder()
                    .uri("/health/liveness")
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "alive");

        Ok(())
    }

    #[test(tokio::test)]
    pub async fn ready() -> Result<()> {
        let fixture = DashboardFixture::new().await?;
        mount_catalog(&fixture.registry, &["foo"]).await;

        let (status, body) = fixture
            .json(
                Request::builder()
                    .uri("/health/readiness")
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
        assert!(body["total_time_taken"].as_f64().is_some());

        Ok(())
    }

    #[test(tokio::test)]
    pub async fn unready() -> Result<()> {
        let fixture = DashboardFixture::new().await?;

        Mock::given(method("GET"))
            .and(path("/v2/_catalog"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&fixture.registry)
            .await;

        let (status, body) = fixture
            .json(
                Request::builder()
                    .uri("/health/readiness")
                    .body(Body::empty())?,
            )
            .await?;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unready");

        Ok(())
    }
}
