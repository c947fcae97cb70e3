//! Shared normalization helpers for query-string fields.

use crate::{DEFAULT_PAGE, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use chrono::{DateTime, Duration, Utc};
use imageflow_core::models::{ListFilters, Orientation};
use imageflow_core::models::image::ListQuery;
use imageflow_core::naming;

/// Empty or whitespace-only values are treated as absent.
pub(super) fn normalize_optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|raw| !raw.is_empty())
}

/// Parse a positive integer, falling back to `default` for anything else.
pub(super) fn parse_positive(value: Option<&str>, default: usize) -> usize {
    normalize_optional(value)
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Unknown orientation values are ignored rather than rejected.
pub(super) fn parse_orientation(value: Option<&str>) -> Option<Orientation> {
    normalize_optional(value).and_then(|raw| raw.parse().ok())
}

pub(super) const EXPIRY_OUT_OF_RANGE: &str = "expiryMinutes out of range";

/// `minutes` after `from`, or `None` when the result is not representable.
pub(super) fn expiry_after(from: DateTime<Utc>, minutes: i64) -> Option<DateTime<Utc>> {
    Duration::try_minutes(minutes).and_then(|delta| from.checked_add_signed(delta))
}

pub(super) fn list_filters(query: &ListQuery) -> ListFilters {
    ListFilters {
        page: parse_positive(query.page.as_deref(), DEFAULT_PAGE),
        limit: parse_positive(query.limit.as_deref(), DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
        // A name that sanitizes to nothing still filters and matches no list.
        tag: normalize_optional(query.tag.as_deref())
            .map(|raw| naming::sanitize_tag_name(raw).unwrap_or_else(|| raw.to_string())),
        orientation: parse_orientation(query.orientation.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_filters_apply_defaults_and_caps() {
        let filters = list_filters(&ListQuery::default());
        assert_eq!(filters, ListFilters::default());

        let filters = list_filters(&ListQuery {
            page: Some("3".to_string()),
            limit: Some("500".to_string()),
            tag: Some("  Blue Sky ".to_string()),
            orientation: Some("Portrait".to_string()),
        });
        assert_eq!(filters.page, 3);
        assert_eq!(filters.limit, MAX_PAGE_LIMIT);
        assert_eq!(filters.tag.as_deref(), Some("blue-sky"));
        assert_eq!(filters.orientation, Some(Orientation::Portrait));
    }

    #[test]
    fn invalid_values_fall_back_silently() {
        let filters = list_filters(&ListQuery {
            page: Some("zero".to_string()),
            limit: Some("0".to_string()),
            tag: Some("   ".to_string()),
            orientation: Some("square".to_string()),
        });
        assert_eq!(filters.page, DEFAULT_PAGE);
        assert_eq!(filters.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(filters.tag, None);
        assert_eq!(filters.orientation, None);
    }

    #[test]
    fn unusable_tag_is_kept_as_a_filter() {
        let filters = list_filters(&ListQuery {
            tag: Some(" !!! ".to_string()),
            ..ListQuery::default()
        });
        assert_eq!(filters.tag.as_deref(), Some("!!!"));
    }

    #[test]
    fn expiry_after_rejects_overflow() {
        let now = Utc::now();
        assert_eq!(expiry_after(now, 30), Some(now + Duration::minutes(30)));
        assert_eq!(expiry_after(now, 1_000_000_000_000), None);
        assert_eq!(expiry_after(now, i64::MAX), None);
    }
}
