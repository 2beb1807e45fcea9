//! Client for the container registry distribution API.
//!
//! Only the handful of endpoints the dashboard needs are covered: the
//! catalog, tag lists, image manifests and manifest deletion.

use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};

mod client;
pub(crate) mod headers;

pub use client::{ClientError, RegistryClient};

/// Result of a read where the registry may legitimately report absence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// The registry refused the delete, usually because deletes are disabled
    /// or it is running read-only.
    NotSupported { status: StatusCode },
}

// Registries sometimes send `null` where a field is unknown.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Layer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub digest: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Value of the `Docker-Content-Digest` header, when the registry sent one.
    pub digest: Option<String>,
    pub layers: Vec<Layer>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Catalog {
    #[serde(default)]
    pub repositories: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TagList {
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ManifestBody {
    #[serde(default)]
    pub layers: Option<Vec<Layer>>,
}
