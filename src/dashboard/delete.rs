use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    error::DashboardError,
    registry::{DeleteOutcome, Lookup},
    state::DashboardState,
};

#[derive(Debug, Deserialize)]
pub struct ImageDeleteRequest {
    repository: String,
    tag: String,
}

/// Deletes `repository:tag` by resolving it to its manifest digest first,
/// registries only accept digest addressed deletes.
pub(crate) async fn delete(
    Path(ImageDeleteRequest { repository, tag }): Path<ImageDeleteRequest>,
    State(state): State<Arc<DashboardState>>,
) -> Result<Json<Value>, DashboardError> {
    info!(%repository, %tag, "Received request to delete image");

    let digest = match state.client.resolve_digest(&repository, &tag).await? {
        Lookup::Found(digest) => digest,
        Lookup::NotFound => {
            state.metrics.delete("not_found");
            return Err(DashboardError::ImageNotFound { repository, tag });
        }
    };

    match state.client.delete_manifest(&repository, &digest).await? {
        DeleteOutcome::Deleted => {
            info!(%repository, %tag, %digest, "Image deleted");
            state.metrics.delete("deleted");
            Ok(Json(json!({
                "message": format!("Image {repository}:{tag} deleted successfully")
            })))
        }
        DeleteOutcome::NotFound => {
            warn!(%repository, %tag, %digest, "Manifest vanished before it could be deleted");
            state.metrics.delete("not_found");
            Err(DashboardError::DeleteNotFound {})
        }
        DeleteOutcome::NotSupported { status } => {
            warn!(
                %repository,
                %tag,
                status = status.as_u16(),
                "Registry refused to delete manifest"
            );
            state.metrics.delete("not_supported");
            Err(DashboardError::DeleteNotSupported {})
        }
    }
}
