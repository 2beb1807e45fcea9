use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::registry::ClientError;

pub(crate) enum DashboardError {
    ImageNotFound { repository: String, tag: String },
    DeleteNotFound {},
    DeleteNotSupported {},
    DigestMissing {},
    Registry(ClientError),
}

fn format_error(e: &dyn std::error::Error) -> String {
    let mut s = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        s.push_str(&format!("\nCaused by: {}", cause));
        source = cause.source();
    }
    s
}

pub(crate) fn simple_error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        match self {
            Self::ImageNotFound { repository, tag } => simple_error(
                StatusCode::NOT_FOUND,
                &format!("Repository {repository} with tag {tag} not found"),
            ),
            Self::DeleteNotFound {} => {
                simple_error(StatusCode::NOT_FOUND, "Image not found for deletion")
            }
            Self::DeleteNotSupported {} => simple_error(
                StatusCode::METHOD_NOT_ALLOWED,
                "Deletion is not supported by the registry",
            ),
            Self::DigestMissing {} => simple_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve image digest",
            ),
            Self::Registry(err) => {
                warn!(error = %format_error(&err), "Registry call failed");
                simple_error(StatusCode::BAD_GATEWAY, &err.to_string())
            }
        }
    }
}

impl From<ClientError> for DashboardError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::MissingDigest(reference) => {
                error!(reference = %reference, "Failed to retrieve image digest");
                Self::DigestMissing {}
            }
            err => Self::Registry(err),
        }
    }
}
