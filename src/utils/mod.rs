//! Helpers shared by the catalog modules.

use bookstore_http::AppError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::json;

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Characters left verbatim in a URL path segment (RFC 3986 unreserved).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a value for use as one path segment, e.g. in `Location`.
pub fn path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Collects per-field validation failures for a request body.
#[derive(Debug, Default)]
pub struct FieldErrors {
    details: Vec<serde_json::Value>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a non-blank value of at most `max` characters.
    pub fn text(&mut self, field: &'static str, value: &str, max: usize) -> &mut Self {
        if value.trim().is_empty() {
            self.details.push(json!({ "field": field, "error": "required" }));
        } else if value.chars().count() > max {
            self.details.push(json!({
                "field": field,
                "error": "too_long",
                "max_length": max,
            }));
        }
        self
    }

    /// Require every entry of a name list to be non-blank.
    pub fn names(&mut self, field: &'static str, values: &[String]) -> &mut Self {
        if values.iter().any(|value| value.trim().is_empty()) {
            self.details.push(json!({ "field": field, "error": "blank_entry" }));
        }
        self
    }

    pub fn finish(&mut self, message: &str) -> Result<(), AppError> {
        if self.details.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(std::mem::take(&mut self.details), message))
        }
    }
}
