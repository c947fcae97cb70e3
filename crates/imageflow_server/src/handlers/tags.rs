//! Tag registry endpoints.

use crate::error::HttpError;
use crate::{naming, AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use imageflow_core::models::tag::{BatchTagsRequest, CreateTagRequest, RenameTagRequest};
use imageflow_core::models::TagSummary;
use serde_json::{json, Value};

/// `GET /api/tags`
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Value>, HttpError> {
    let tags = state.db.images.list_tags().await?;
    Ok(Json(json!({ "success": true, "tags": tags })))
}

/// `POST /api/tags`
pub async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<CreateTagRequest>,
) -> Result<Json<Value>, HttpError> {
    let name = naming::sanitize_tag_name(&request.name)
        .ok_or_else(|| HttpError::bad_request("Tag name is required"))?;
    let name = state.db.images.create_tag(&name).await?;
    tracing::info!("Created tag {}", name);
    Ok(Json(json!({
        "success": true,
        "tag": TagSummary { name, count: 0 },
    })))
}

/// `PUT /api/tags/:name`
///
/// Reports the renamed tag's current count when it is registered, otherwise
/// the number of images moved.
pub async fn rename_tag(
    State(state): State<AppState>,
    Path(old_name): Path<String>,
    Json(request): Json<RenameTagRequest>,
) -> Result<Json<Value>, HttpError> {
    let new_name = naming::sanitize_tag_name(&request.new_name)
        .ok_or_else(|| HttpError::bad_request("New tag name is required"))?;
    if old_name == new_name {
        return Err(HttpError::bad_request(
            "New name must be different from old name",
        ));
    }

    let policy = state.db.images.rename_policy();
    let (new_name, affected) = state
        .db
        .images
        .rename_tag(&old_name, &new_name, policy)
        .await
        .map_err(|err| HttpError::not_found_as(err, "Tag not found"))?;
    tracing::info!(
        "Renamed tag {} to {} ({} images, {} policy)",
        old_name,
        new_name,
        affected,
        policy
    );

    let tag = state
        .db
        .images
        .list_tags()
        .await?
        .into_iter()
        .find(|tag| tag.name == new_name)
        .unwrap_or(TagSummary {
            name: new_name,
            count: affected,
        });
    Ok(Json(json!({ "success": true, "tag": tag })))
}

/// `DELETE /api/tags/:name`
pub async fn delete_tag(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, HttpError> {
    let affected = state
        .db
        .images
        .delete_tag(&name)
        .await
        .map_err(|err| HttpError::not_found_as(err, "Tag not found"))?;
    tracing::info!("Deleted tag {} from {} images", name, affected);
    Ok(Json(json!({
        "success": true,
        "message": "Tag deleted",
        "affectedImages": affected,
    })))
}

/// `POST /api/tags/batch`
pub async fn batch_tags(
    State(state): State<AppState>,
    Json(request): Json<BatchTagsRequest>,
) -> Result<Json<Value>, HttpError> {
    if request.image_ids.is_empty() {
        return Err(HttpError::bad_request("imageIds array is required"));
    }
    let add = sanitize_list(&request.add_tags);
    let remove = sanitize_list(&request.remove_tags);
    if add.is_empty() && remove.is_empty() {
        return Err(HttpError::bad_request(
            "Either addTags or removeTags must be provided",
        ));
    }

    let updated = state
        .db
        .images
        .batch_update_tags(&request.image_ids, &add, &remove)
        .await?;
    tracing::info!(
        "Batch tag update touched {} of {} images",
        updated,
        request.image_ids.len()
    );
    Ok(Json(json!({ "success": true, "updatedCount": updated })))
}

fn sanitize_list(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter_map(|tag| naming::sanitize_tag_name(tag))
        .collect()
}
