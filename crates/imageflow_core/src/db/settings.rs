//! Upload settings with an optional stored override under `config`.

use super::{get_json, keys, KvStore};
use crate::models::settings::UploadSettings;

/// Load the stored settings override, falling back to `defaults`.
///
/// A missing, unreadable or malformed override is never an error; the
/// defaults are returned and the failure is logged.
pub async fn load_upload_settings(kv: &dyn KvStore, defaults: UploadSettings) -> UploadSettings {
    match get_json::<UploadSettings>(kv, keys::SETTINGS).await {
        Ok(Some(settings)) => settings,
        Ok(None) => defaults,
        Err(err) => {
            tracing::warn!("Ignoring stored upload settings: {}", err);
            defaults
        }
    }
}
