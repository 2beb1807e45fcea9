use anyhow::{Context, Result};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;

use super::headers::{DOCKER_CONTENT_DIGEST, RequestHeaders};
use super::{Catalog, DeleteOutcome, Layer, Lookup, Manifest, ManifestBody, TagList};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("registry is unavailable: {0}")]
    RegistryUnavailable(#[source] reqwest::Error),
    #[error("registry answered {status} for {url}")]
    RegistryError { status: StatusCode, url: String },
    #[error("registry did not return a Docker-Content-Digest for {0}")]
    MissingDigest(String),
    #[error("registry sent a response that could not be decoded: {0}")]
    InvalidResponse(#[source] reqwest::Error),
}

impl ClientError {
    fn from_body(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::InvalidResponse(err)
        } else {
            ClientError::RegistryUnavailable(err)
        }
    }
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct RegistryRequestLabels {
    operation: String,
    status: String,
}

/// Talks to a single registry, whose base url is fixed at construction.
pub struct RegistryClient {
    base_url: String,
    client: reqwest::Client,
    headers: RequestHeaders,
    requests_total: Family<RegistryRequestLabels, Counter>,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig, registry: &mut Registry) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .context("Failed to build registry http client")?;

        let requests_total = Family::<RegistryRequestLabels, Counter>::default();
        registry.register(
            "registry_requests",
            "Number of requests sent to the upstream registry",
            requests_total.clone(),
        );

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
            headers: RequestHeaders::new(&config.user_agent)?,
            requests_total,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn record(&self, operation: &str, status: String) {
        self.requests_total
            .get_or_create(&RegistryRequestLabels {
                operation: operation.to_string(),
                status,
            })
            .inc();
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response, ClientError> {
        match request.send().await {
            Ok(resp) => {
                debug!(
                    operation,
                    url = %resp.url(),
                    status = resp.status().as_u16(),
                    "Registry request complete"
                );
                self.record(operation, resp.status().as_u16().to_string());
                Ok(resp)
            }
            Err(err) => {
                warn!(operation, error = %err, "Registry request failed");
                self.record(operation, "000".to_string());
                Err(ClientError::RegistryUnavailable(err))
            }
        }
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
        resp.json::<T>().await.map_err(ClientError::from_body)
    }

    fn unexpected(resp: &Response) -> ClientError {
        ClientError::RegistryError {
            status: resp.status(),
            url: resp.url().to_string(),
        }
    }

    fn manifest_url(&self, repository: &str, reference: &str) -> String {
        format!("{}/v2/{repository}/manifests/{reference}", self.base_url)
    }

    pub async fn list_repositories(&self) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/v2/_catalog", self.base_url);
        let resp = self
            .send(
                "catalog",
                self.client.get(&url).headers(self.headers.generic.clone()),
            )
            .await?;

        if !resp.status().is_success() {
            return Err(Self::unexpected(&resp));
        }

        let catalog: Catalog = Self::json(resp).await?;

        Ok(catalog.repositories.unwrap_or_default())
    }

    pub async fn list_tags(&self, repository: &str) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/v2/{repository}/tags/list", self.base_url);
        let resp = self
            .send(
                "tags",
                self.client.get(&url).headers(self.headers.generic.clone()),
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            info!(repository, "Repository not found while listing tags");
            return Ok(vec![]);
        }

        if !resp.status().is_success() {
            return Err(Self::unexpected(&resp));
        }

        let tags: TagList = Self::json(resp).await?;

        Ok(tags.tags.unwrap_or_default())
    }

    async fn fetch_manifest(
        &self,
        operation: &str,
        repository: &str,
        tag: &str,
    ) -> Result<Lookup<Response>, ClientError> {
        let url = self.manifest_url(repository, tag);
        let resp = self
            .send(
                operation,
                self.client.get(&url).headers(self.headers.manifest.clone()),
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            warn!(repository, tag, "Manifest not found");
            return Ok(Lookup::NotFound);
        }

        if !resp.status().is_success() {
            return Err(Self::unexpected(&resp));
        }

        Ok(Lookup::Found(resp))
    }

    fn content_digest(resp: &Response) -> Option<String> {
        resp.headers()
            .get(&DOCKER_CONTENT_DIGEST)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
    }

    pub async fn get_manifest(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Lookup<Manifest>, ClientError> {
        let resp = match self.fetch_manifest("manifest", repository, tag).await? {
            Lookup::Found(resp) => resp,
            Lookup::NotFound => return Ok(Lookup::NotFound),
        };

        let digest = Self::content_digest(&resp);
        let body: ManifestBody = Self::json(resp).await?;
        let layers: Vec<Layer> = body.layers.unwrap_or_default();

        Ok(Lookup::Found(Manifest { digest, layers }))
    }

    /// Canonical digest of `repository:tag`, as the registry reports it for the
    /// V2 manifest. This is the digest deletes must be addressed to.
    pub async fn resolve_digest(
        &self,
        repository: &str,
        tag: &str,
    ) -> Result<Lookup<String>, ClientError> {
        let resp = match self.fetch_manifest("digest", repository, tag).await? {
            Lookup::Found(resp) => resp,
            Lookup::NotFound => return Ok(Lookup::NotFound),
        };

        match Self::content_digest(&resp) {
            Some(digest) => {
                info!(repository, tag, digest = %digest, "Resolved manifest digest");
                Ok(Lookup::Found(digest))
            }
            None => Err(ClientError::MissingDigest(format!("{repository}:{tag}"))),
        }
    }

    pub async fn delete_manifest(
        &self,
        repository: &str,
        digest: &str,
    ) -> Result<DeleteOutcome, ClientError> {
        let url = self.manifest_url(repository, digest);
        let resp = self
            .send(
                "delete",
                self.client
                    .delete(&url)
                    .headers(self.headers.generic.clone()),
            )
            .await?;

        let outcome = match resp.status() {
            StatusCode::ACCEPTED => DeleteOutcome::Deleted,
            StatusCode::NOT_FOUND => DeleteOutcome::NotFound,
            status => DeleteOutcome::NotSupported { status },
        };

        info!(repository, digest, ?outcome, "Manifest delete finished");

        Ok(outcome)
    }
}
