//! Small helpers shared by the core modules and the CLI.

use chrono::{SecondsFormat, Utc};

/// Trimmed text, or `None` when absent or blank.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

pub fn is_http_url(value: &str) -> bool {
    ["http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme))
}

/// Unix seconds
pub fn unix_timestamp_now() -> i64 {
    Utc::now().timestamp()
}

/// Unix milliseconds
pub fn unix_timestamp_millis_now() -> i64 {
    Utc::now().timestamp_millis()
}

/// UTC ISO-8601 with millisecond precision, e.g. `2024-05-01T08:30:00.000Z`.
pub fn iso_timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some(" \t\n".to_owned())), None);
        assert_eq!(
            normalize_text_option(Some("  calm  ".to_owned())).as_deref(),
            Some("calm")
        );
    }

    #[test]
    fn only_http_schemes_count_as_urls() {
        assert!(is_http_url("http://localhost:54321"));
        assert!(is_http_url("https://demo.supabase.co"));
        assert!(!is_http_url("ftp://demo.supabase.co"));
        assert!(!is_http_url("demo.supabase.co"));
    }

    #[test]
    fn iso_timestamp_has_millis_and_utc_suffix() {
        let now = iso_timestamp_now();
        assert!(now.ends_with('Z'));
        assert_eq!(now.len(), "2024-05-01T08:30:00.000Z".len());
    }
}
