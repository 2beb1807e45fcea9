//! Storage report for a whole registry.
//!
//! Layers are content addressed and shared between tags and repositories, so
//! summing every manifest would count a base image once per tag built on it.
//! A [`SizeLedger`] remembers which layer digests one report has already
//! counted; whichever tag is visited first is credited with the shared bytes.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::registry::{ClientError, Layer, Lookup, RegistryClient};

const GIB: f64 = (1u64 << 30) as f64;

pub fn format_size(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB)
}

/// Layer digests already counted during one report.
#[derive(Debug, Default)]
pub struct SizeLedger {
    seen: HashSet<String>,
}

impl SizeLedger {
    /// Bytes of `layers` not already counted, marking them as counted.
    pub fn count(&mut self, layers: &[Layer]) -> u64 {
        let mut total = 0;

        for layer in layers {
            if self.seen.insert(layer.digest.clone()) {
                total += layer.size;
            }
        }

        total
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageEntry {
    pub repository: String,
    pub tag: String,
    pub size: String,
    pub size_numeric: f64,
    pub size_bytes: u64,
}

impl ImageEntry {
    fn new(repository: String, tag: String, size_bytes: u64) -> Self {
        Self {
            repository,
            tag,
            size: format_size(size_bytes),
            size_numeric: size_bytes as f64 / GIB,
            size_bytes,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Report {
    pub images: Vec<ImageEntry>,
    pub total_bytes: u64,
}

impl Report {
    fn push(&mut self, repository: String, tag: String, size_bytes: u64) {
        self.total_bytes += size_bytes;
        self.images
            .push(ImageEntry::new(repository, tag, size_bytes));
    }

    pub fn total_size(&self) -> String {
        format_size(self.total_bytes)
    }
}

/// Walks catalog, tags and manifests once. Each aggregator owns its ledger, so
/// concurrent or repeated reports never suppress each other's layers.
pub struct Aggregator<'a> {
    client: &'a RegistryClient,
    ledger: SizeLedger,
    report: Report,
}

impl<'a> Aggregator<'a> {
    pub fn new(client: &'a RegistryClient) -> Self {
        Self {
            client,
            ledger: SizeLedger::default(),
            report: Report::default(),
        }
    }

    /// Only a failed catalog listing fails the report. Tag and manifest
    /// problems shrink the affected entries to nothing and are logged.
    pub async fn run(mut self) -> Result<Report, ClientError> {
        let repositories = self.client.list_repositories().await?;

        for repository in repositories {
            let tags = match self.client.list_tags(&repository).await {
                Ok(tags) => tags,
                Err(err) => {
                    warn!(%repository, error = %err, "Skipping repository, tags could not be listed");
                    continue;
                }
            };

            if tags.is_empty() {
                info!(%repository, "Repository has no tags");
                continue;
            }

            for tag in tags {
                let size = self.size_of(&repository, &tag).await;
                self.report.push(repository.clone(), tag, size);
            }
        }

        info!(
            images = self.report.images.len(),
            total_bytes = self.report.total_bytes,
            "Registry report complete"
        );

        Ok(self.report)
    }

    async fn size_of(&mut self, repository: &str, tag: &str) -> u64 {
        match self.client.get_manifest(repository, tag).await {
            Ok(Lookup::Found(manifest)) => self.ledger.count(&manifest.layers),
            Ok(Lookup::NotFound) => 0,
            Err(err) => {
                warn!(repository, tag, error = %err, "Could not size tag, reporting it as empty");
                0
            }
        }
    }
}
