//! Health, key validation, settings and manual cleanup endpoints.

use crate::error::HttpError;
use crate::sweep::run_expiry_sweep;
use crate::AppState;
use axum::{extract::State, Json};
use imageflow_core::db::settings::load_upload_settings;
use imageflow_core::models::settings::UploadSettings;
use serde_json::{json, Value};

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "storage": state.db.kv.backend_name(),
        "blobs": state.blobs.backend_name(),
    }))
}

/// `POST /api/validate-api-key`
///
/// Reaching the handler means the auth layer accepted the key.
pub async fn validate_api_key() -> Json<Value> {
    Json(json!({ "success": true, "valid": true }))
}

/// `GET /api/config`
pub async fn get_config(State(state): State<AppState>) -> Json<Value> {
    let settings =
        load_upload_settings(state.db.kv.as_ref(), UploadSettings::from_config(&state.config))
            .await;
    Json(json!({ "success": true, "config": settings }))
}

/// `POST /api/cleanup`
pub async fn cleanup(State(state): State<AppState>) -> Result<Json<Value>, HttpError> {
    let report = run_expiry_sweep(
        &state.db,
        state.blobs.as_ref(),
        state.config.cleanup_item_timeout(),
    )
    .await?;
    tracing::info!(
        deleted = report.deleted,
        failed = report.failed,
        "Manual cleanup finished"
    );
    Ok(Json(json!({
        "success": true,
        "deletedCount": report.deleted,
        "failedCount": report.failed,
    })))
}
