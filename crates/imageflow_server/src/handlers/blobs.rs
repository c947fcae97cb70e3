//! Public blob passthrough under `/r2/*`.

use crate::blob::{BlobError, BlobStore};
use crate::error::HttpError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};

const IMMUTABLE_CACHE: &str = "public, max-age=31536000";

/// `GET /r2/*path`
pub async fn serve_blob(
    State(state): State<AppState>,
    path: Option<Path<String>>,
) -> Result<Response, HttpError> {
    let key = path
        .map(|Path(key)| key.trim_start_matches('/').to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| HttpError::bad_request("Path required"))?;

    let blob = match state.blobs.get(&key).await {
        Ok(Some(blob)) => blob,
        Ok(None) | Err(BlobError::InvalidKey(_)) => return Err(HttpError::not_found("Not found")),
        Err(err) => return Err(err.into()),
    };
    let content_type = HeaderValue::from_str(&blob.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE)),
        ],
        blob.data,
    )
        .into_response())
}
