//! Image listing, detail, update and delete endpoints.

use super::normalize::{expiry_after, list_filters, EXPIRY_OUT_OF_RANGE};
use crate::error::HttpError;
use crate::sweep::purge_image;
use crate::urls::{ImageUrls, UrlBuilder};
use crate::{naming, AppState};
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use imageflow_core::models::image::{ListQuery, UpdateImageRequest};
use imageflow_core::models::{timestamp, ImagePatch, ImageRecord};
use serde::Serialize;
use serde_json::{json, Value};

/// A record as returned by the API, with its public URLs.
#[derive(Debug, Serialize)]
pub struct ImageView {
    #[serde(flatten)]
    pub record: ImageRecord,
    pub urls: ImageUrls,
}

impl ImageView {
    pub fn new(record: ImageRecord, urls: &UrlBuilder) -> Self {
        let image_urls = urls.image_urls(&record);
        Self {
            record,
            urls: image_urls,
        }
    }
}

fn require_image_id(id: &str) -> Result<(), HttpError> {
    if naming::is_valid_image_id(id) {
        Ok(())
    } else {
        Err(HttpError::bad_request("Invalid image ID"))
    }
}

/// `GET /api/images`
pub async fn list_images(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, HttpError> {
    let filters = list_filters(&query);
    let page = state.db.images.list_images(&filters).await?;
    let urls = UrlBuilder::for_request(&state.config, &headers);
    let total_pages = page.total_pages(filters.limit);
    let images: Vec<ImageView> = page
        .images
        .into_iter()
        .map(|record| ImageView::new(record, &urls))
        .collect();

    Ok(Json(json!({
        "success": true,
        "images": images,
        "page": filters.page,
        "limit": filters.limit,
        "total": page.total,
        "totalPages": total_pages,
    })))
}

/// `GET /api/images/:id`
pub async fn get_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, HttpError> {
    require_image_id(&id)?;
    let record = state
        .db
        .images
        .get_image(&id)
        .await?
        .ok_or_else(|| HttpError::not_found("Image not found"))?;
    let urls = UrlBuilder::for_request(&state.config, &headers);
    Ok(Json(json!({
        "success": true,
        "image": ImageView::new(record, &urls),
    })))
}

/// `PUT /api/images/:id`
///
/// `expiryMinutes > 0` sets a new expiry from now; any other value clears it.
pub async fn update_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<UpdateImageRequest>,
) -> Result<Json<Value>, HttpError> {
    require_image_id(&id)?;
    let expiry_time = match request.expiry_minutes {
        Some(minutes) if minutes > 0 => Some(Some(
            expiry_after(timestamp::now(), minutes)
                .ok_or_else(|| HttpError::bad_request(EXPIRY_OUT_OF_RANGE))?,
        )),
        Some(_) => Some(None),
        None => None,
    };
    let patch = ImagePatch {
        tags: request.tags.map(|tags| tags.into_tags()),
        expiry_time,
    };
    let record = state
        .db
        .images
        .update_image(&id, patch)
        .await
        .map_err(|err| HttpError::not_found_as(err, "Image not found"))?;
    tracing::info!("Updated image {}", id);

    let urls = UrlBuilder::for_request(&state.config, &headers);
    Ok(Json(json!({
        "success": true,
        "image": ImageView::new(record, &urls),
    })))
}

/// `DELETE /api/images/:id`
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, HttpError> {
    require_image_id(&id)?;
    purge_image(&state.db.images, state.blobs.as_ref(), &id)
        .await
        .map_err(|err| HttpError::not_found_as(err, "Image not found"))?;
    tracing::info!("Deleted image {}", id);
    Ok(Json(json!({ "success": true, "message": "Image deleted" })))
}
