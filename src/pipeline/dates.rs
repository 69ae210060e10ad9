//! Canonical `DD/MM/YYYY` date rendering for extracted metadata.
//!
//! Rules, first match wins:
//! 1. already `DD/MM/YYYY` → unchanged
//! 2. `YYYY-MM-DD` → components rearranged as written, no calendar check
//! 3. any other recognised date representation that is a valid calendar date
//! 4. otherwise the input is returned untouched
//!
//! Canonicalization never fails and is idempotent.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::extraction::ExtractionResult;

/// Output format of every canonicalized date.
pub const CANONICAL_DATE_FORMAT: &str = "%d/%m/%Y";

/// Key fragments (lowercase) that mark a key-value pair as holding a date.
pub const DATE_KEY_MARKERS: &[&str] = &["date", "issued", "expiry", "valid"];

static CANONICAL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid regex"));

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid regex"));

static ORDINAL_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").expect("valid regex"));

const NUMERIC_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%m-%Y",
    "%d-%b-%Y",
];

const TEXTUAL_FORMATS: &[&str] = &["%d %B %Y", "%B %d %Y", "%d %b %Y", "%b %d %Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Years outside this range are treated as misreads rather than dates.
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1900..=2199;

/// Convert a date-like string to `DD/MM/YYYY`, or return it unchanged.
pub fn canonicalize_date(input: &str) -> String {
    if CANONICAL_DATE.is_match(input) {
        return input.to_string();
    }

    let trimmed = input.trim();

    if let Some(caps) = ISO_DATE.captures(trimmed) {
        return format!("{}/{}/{}", &caps[3], &caps[2], &caps[1]);
    }

    match parse_generic_date(trimmed) {
        Some(date) => date.format(CANONICAL_DATE_FORMAT).to_string(),
        None => input.to_string(),
    }
}

/// Best-effort parse of the common written date forms.
fn parse_generic_date(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }

    let parsed = DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc2822(text)
                .map(|dt| dt.date_naive())
                .ok()
        })
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NUMERIC_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        })
        .or_else(|| {
            let textual = normalize_textual(text);
            TEXTUAL_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&textual, fmt).ok())
        })?;

    PLAUSIBLE_YEARS.contains(&parsed.year()).then_some(parsed)
}

/// "15th January, 2023" → "15 January 2023".
fn normalize_textual(text: &str) -> String {
    let without_ordinals = ORDINAL_SUFFIX.replace_all(text, "$1");
    without_ordinals
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether a key-value pair key names a date-bearing field.
pub fn is_date_key(key: &str) -> bool {
    let lower = key.to_lowercase();
    DATE_KEY_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Canonicalize `issueDate`, `expiryDate` and every date-keyed pair in place.
/// No other field is touched.
pub fn canonicalize_extraction_dates(result: &mut ExtractionResult) {
    let metadata = &mut result.metadata;
    for field in [&mut metadata.issue_date, &mut metadata.expiry_date] {
        if let Some(value) = field.as_mut() {
            *value = canonicalize_date(value);
        }
    }

    for pair in result
        .key_value_pairs
        .iter_mut()
        .filter(|pair| is_date_key(&pair.key))
    {
        pair.value = canonicalize_date(&pair.value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::extraction::{DocumentMetadata, KeyValuePair};

    #[test]
    fn iso_date_rearranged() {
        assert_eq!(canonicalize_date("2023-01-15"), "15/01/2023");
    }

    #[test]
    fn canonical_date_unchanged() {
        assert_eq!(canonicalize_date("15/01/2023"), "15/01/2023");
        assert_eq!(canonicalize_date(" 15/01/2023 "), "15/01/2023");
    }

    #[test]
    fn canonical_shape_is_not_calendar_checked() {
        assert_eq!(canonicalize_date("31/02/2023"), "31/02/2023");
        assert_eq!(canonicalize_date(" 31/02/2023 "), " 31/02/2023 ");
    }

    #[test]
    fn non_date_unchanged() {
        assert_eq!(canonicalize_date("not a date"), "not a date");
        assert_eq!(canonicalize_date(""), "");
        assert_eq!(canonicalize_date("  Permanent "), "  Permanent ");
    }

    #[test]
    fn iso_components_not_calendar_checked() {
        assert_eq!(canonicalize_date("2023-02-30"), "30/02/2023");
    }

    #[test]
    fn textual_dates() {
        assert_eq!(canonicalize_date("15 January 2023"), "15/01/2023");
        assert_eq!(canonicalize_date("15 Jan 2023"), "15/01/2023");
        assert_eq!(canonicalize_date("January 15, 2023"), "15/01/2023");
        assert_eq!(canonicalize_date("15th March 2024"), "15/03/2024");
        assert_eq!(canonicalize_date("1st Sep 2025"), "01/09/2025");
    }

    #[test]
    fn numeric_variants() {
        assert_eq!(canonicalize_date("2023/01/15"), "15/01/2023");
        assert_eq!(canonicalize_date("5/1/2023"), "05/01/2023");
        assert_eq!(canonicalize_date("1/15/2023"), "15/01/2023");
        assert_eq!(canonicalize_date("15.01.2023"), "15/01/2023");
        assert_eq!(canonicalize_date("15-01-2023"), "15/01/2023");
        assert_eq!(canonicalize_date("15-Jan-2023"), "15/01/2023");
    }

    #[test]
    fn datetimes_use_written_calendar_date() {
        assert_eq!(canonicalize_date("2023-01-15T10:30:00Z"), "15/01/2023");
        assert_eq!(canonicalize_date("2023-01-15T23:30:00-05:00"), "15/01/2023");
        assert_eq!(canonicalize_date("2023-01-15 08:00:00"), "15/01/2023");
    }

    #[test]
    fn invalid_calendar_dates_unchanged() {
        assert_eq!(canonicalize_date("31.02.2023"), "31.02.2023");
        assert_eq!(canonicalize_date("32 January 2023"), "32 January 2023");
    }

    #[test]
    fn implausible_years_unchanged() {
        assert_eq!(canonicalize_date("15/01/23"), "15/01/23");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let samples = [
            "2023-01-15",
            "15/01/2023",
            "not a date",
            "15 January 2023",
            "1/15/2023",
            "2023-13-45",
            "31.02.2023",
            "",
            "  ",
            "[unclear: 1?/01/2023]",
            "2023-01-15T10:30:00Z",
        ];
        for sample in samples {
            let once = canonicalize_date(sample);
            assert_eq!(canonicalize_date(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn date_key_detection() {
        assert!(is_date_key("Date of Issue"));
        assert!(is_date_key("ISSUED ON"));
        assert!(is_date_key("Expiry"));
        assert!(is_date_key("Valid until"));
        assert!(is_date_key("Validity"));
        assert!(!is_date_key("Port of Registry"));
        assert!(!is_date_key("Gross Tonnage"));
    }

    #[test]
    fn applies_only_to_selected_fields() {
        let mut result = ExtractionResult {
            full_text: "Issued 2023-01-15".into(),
            metadata: DocumentMetadata {
                document_number: Some("2023-01-15".into()),
                issue_date: Some("2023-01-15".into()),
                expiry_date: Some("15 January 2028".into()),
                ..DocumentMetadata::default()
            },
            key_value_pairs: vec![
                KeyValuePair::new("Date of last annual survey", "2024-02-01"),
                KeyValuePair::new("Official Number", "2024-02-01"),
                KeyValuePair::new("Valid Until", "Permanent"),
            ],
        };

        canonicalize_extraction_dates(&mut result);

        assert_eq!(result.full_text, "Issued 2023-01-15");
        assert_eq!(result.metadata.document_number.as_deref(), Some("2023-01-15"));
        assert_eq!(result.metadata.issue_date.as_deref(), Some("15/01/2023"));
        assert_eq!(result.metadata.expiry_date.as_deref(), Some("15/01/2028"));
        assert_eq!(result.key_value_pairs[0].value, "01/02/2024");
        assert_eq!(result.key_value_pairs[1].value, "2024-02-01");
        assert_eq!(result.key_value_pairs[2].value, "Permanent");
    }
}
