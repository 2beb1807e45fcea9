use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, body::Body, http::Request, response::Response};
use http_body_util::BodyExt;
use prometheus_client::registry::Registry;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{
    config::{Configuration, RegistryConfig},
    dashboard::RewriteUriService,
    registry::{RegistryClient, headers::DOCKER_MANIFEST_V2},
    state::DashboardState,
};

pub(crate) fn configuration(server: &MockServer) -> Configuration {
    Configuration {
        registry: RegistryConfig {
            url: server.uri(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub(crate) fn client_for(server: &MockServer) -> RegistryClient {
    RegistryClient::new(&configuration(server).registry, &mut Registry::default())
        .expect("Client should build against a mock registry")
}

pub(crate) async fn mount_catalog(server: &MockServer, repositories: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/v2/_catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "repositories": repositories,
        })))
        .mount(server)
        .await;
}

pub(crate) async fn mount_tags(server: &MockServer, repository: &str, tags: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/v2/{repository}/tags/list")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": repository,
            "tags": tags,
        })))
        .mount(server)
        .await;
}

/// Serves a V2 manifest for `repository:tag`, but only to clients that ask for
/// the V2 media type.
pub(crate) async fn mount_manifest(
    server: &MockServer,
    repository: &str,
    tag: &str,
    digest: &str,
    layers: &[(&str, u64)],
) {
    let layers: Vec<Value> = layers
        .iter()
        .map(|(digest, size)| {
            json!({
                "mediaType": "application/vnd.docker.image.rootfs.diff.tar.gzip",
                "digest": digest,
                "size": size,
            })
        })
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("/v2/{repository}/manifests/{tag}")))
        .and(header("accept", DOCKER_MANIFEST_V2))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Docker-Content-Digest", digest)
                .set_body_json(json!({
                    "schemaVersion": 2,
                    "mediaType": DOCKER_MANIFEST_V2,
                    "layers": layers,
                })),
        )
        .mount(server)
        .await;
}

/// A dashboard wired to a fake registry.
pub(crate) struct DashboardFixture {
    pub registry: MockServer,
    pub state: Arc<DashboardState>,
    pub service: RewriteUriService<Router>,
}

impl DashboardFixture {
    pub async fn new() -> Result<DashboardFixture> {
        let registry = MockServer::start().await;
        let state = Arc::new(DashboardState::new(configuration(&registry))?);
        let service = crate::service(state.clone());

        Ok(DashboardFixture {
            registry,
            state,
            service,
        })
    }

    pub async fn request(&self, req: Request<Body>) -> Result<Response> {
        self.service
            .clone()
            .oneshot(req)
            .await
            .context("Failed to make test request")
    }

    /// Sends `req` and decodes the response body as JSON.
    pub async fn json(&self, req: Request<Body>) -> Result<(axum::http::StatusCode, Value)> {
        let res = self.request(req).await?;
        let status = res.status();
        let body = res.into_body().collect().await?.to_bytes();
        let value = serde_json::from_slice(&body).context("Response was not JSON")?;

        Ok((status, value))
    }
}
