//! Multipart upload endpoint.

use super::images::ImageView;
use super::normalize::{expiry_after, normalize_optional, EXPIRY_OUT_OF_RANGE};
use crate::blob::BlobStore;
use crate::error::HttpError;
use crate::probe;
use crate::urls::{ImageUrls, UrlBuilder};
use crate::{naming, AppError, AppState};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use imageflow_core::db::settings::load_upload_settings;
use imageflow_core::models::settings::UploadSettings;
use imageflow_core::models::{timestamp, ImageRecord, Orientation, VariantSizes};
use serde::Serialize;
use serde_json::{json, Value};

/// Per-file outcome, reported in request order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    /// Empty when the file was rejected.
    pub id: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<ImageUrls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<VariantSizes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UploadResult {
    fn stored(view: ImageView) -> Self {
        let record = view.record;
        Self {
            id: record.id,
            status: "success",
            urls: Some(view.urls),
            orientation: Some(record.orientation),
            tags: Some(record.tags),
            sizes: Some(record.sizes),
            expiry_time: record.expiry_time.as_ref().map(timestamp::format),
            error: None,
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            status: "error",
            urls: None,
            orientation: None,
            tags: None,
            sizes: None,
            expiry_time: None,
            error: Some(error.into()),
        }
    }
}

struct UploadFile {
    name: String,
    data: Bytes,
}

#[derive(Default)]
struct UploadForm {
    files: Vec<UploadFile>,
    tags: Vec<String>,
    expiry_minutes: Option<i64>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, HttpError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| HttpError::bad_request(format!("Invalid multipart body: {}", err)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "images" | "images[]" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(|err| {
                    HttpError::bad_request(format!("Failed to read {}: {}", file_name, err))
                })?;
                form.files.push(UploadFile {
                    name: file_name,
                    data,
                });
            }
            "tags" => {
                let raw = field.text().await.map_err(|err| {
                    HttpError::bad_request(format!("Invalid tags field: {}", err))
                })?;
                form.tags = naming::parse_tags(Some(raw.as_str()));
            }
            "expiryMinutes" => {
                let raw = field.text().await.map_err(|err| {
                    HttpError::bad_request(format!("Invalid expiryMinutes field: {}", err))
                })?;
                form.expiry_minutes = normalize_optional(Some(raw.as_str()))
                    .and_then(|value| value.parse::<i64>().ok())
                    .filter(|minutes| *minutes > 0);
            }
            other => tracing::debug!("Ignoring multipart field '{}'", other),
        }
    }
    Ok(form)
}

fn is_supported(settings: &UploadSettings, record_format: &str) -> bool {
    settings
        .supported_formats
        .iter()
        .any(|format| format.eq_ignore_ascii_case(record_format))
}

async fn store_upload(
    state: &AppState,
    settings: &UploadSettings,
    urls: &UrlBuilder,
    form: &UploadForm,
    file: &UploadFile,
) -> Result<UploadResult, AppError> {
    if file.data.len() > settings.max_file_size {
        return Ok(UploadResult::rejected(format!(
            "File too large (max {} bytes)",
            settings.max_file_size
        )));
    }
    let Some(probed) = probe::probe(&file.data) else {
        return Ok(UploadResult::rejected("Unsupported image format"));
    };
    if !is_supported(settings, probed.format.as_str()) {
        return Ok(UploadResult::rejected(format!(
            "Format {} is not accepted",
            probed.format
        )));
    }

    let mut record = ImageRecord::new(file.name.clone(), probed.format, probed.width, probed.height);
    record.set_tags(form.tags.iter().cloned());
    if let Some(minutes) = form.expiry_minutes {
        let Some(expiry) = expiry_after(record.upload_time, minutes) else {
            return Ok(UploadResult::rejected(EXPIRY_OUT_OF_RANGE));
        };
        record.expiry_time = Some(expiry);
    }
    record.sizes.original = file.data.len() as u64;

    state
        .blobs
        .put(&record.paths.original, file.data.clone())
        .await?;
    let original_key = record.paths.original.clone();
    let record = match state.db.images.save_image(record).await {
        Ok(record) => record,
        Err(err) => {
            if let Err(cleanup_err) = state.blobs.delete(&original_key).await {
                tracing::warn!("Failed to remove orphaned blob {}: {}", original_key, cleanup_err);
            }
            return Err(err);
        }
    };
    Ok(UploadResult::stored(ImageView::new(record, urls)))
}

/// `POST /api/upload`
///
/// Accepts `images[]` file parts plus optional `tags` (comma-separated) and
/// `expiryMinutes`. Each file is processed independently.
pub async fn upload_images(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<Value>, HttpError> {
    let form = read_form(multipart).await?;
    if form.files.is_empty() {
        return Err(HttpError::bad_request("No images provided"));
    }
    if let Some(minutes) = form.expiry_minutes {
        if expiry_after(timestamp::now(), minutes).is_none() {
            return Err(HttpError::bad_request(EXPIRY_OUT_OF_RANGE));
        }
    }

    let settings =
        load_upload_settings(state.db.kv.as_ref(), UploadSettings::from_config(&state.config))
            .await;
    if form.files.len() > settings.max_upload_count {
        return Err(HttpError::bad_request(format!(
            "Too many files (max {})",
            settings.max_upload_count
        )));
    }

    let urls = UrlBuilder::for_request(&state.config, &headers);
    let mut results = Vec::with_capacity(form.files.len());
    for file in &form.files {
        let result = match store_upload(&state, &settings, &urls, &form, file).await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!("Upload of {} failed: {}", file.name, err);
                UploadResult::rejected("Failed to store image")
            }
        };
        if let Some(error) = &result.error {
            tracing::info!("Rejected upload {}: {}", file.name, error);
        } else {
            tracing::info!("Stored upload {} as {}", file.name, result.id);
        }
        results.push(result);
    }

    Ok(Json(json!({ "success": true, "results": results })))
}
