//! MIME type constants and file-extension lookup.

use std::path::Path;

pub const ANY: &str = "*/*";
pub const JSON: &str = "application/json";
pub const XML: &str = "application/xml";
pub const CSV: &str = "text/csv";
pub const FORM_URL_ENCODED: &str = "application/x-www-form-urlencoded";
pub const PLAIN_TEXT_UTF8: &str = "text/plain; charset=utf-8";
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Resolve a MIME type from the extension of `file_name`.
///
/// Returns `None` when the name has no extension or the extension is unknown.
pub fn mime_type_for(file_name: &str) -> Option<String> {
    Path::new(file_name).extension()?;
    mime_guess::from_path(file_name).first().map(|mime| mime.to_string())
}
