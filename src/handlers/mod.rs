// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod quiz;
pub mod results;

use axum::http::{HeaderName, header};

/// Wraps CSV text as a file download.
pub(crate) fn csv_download(filename: &str, body: String) -> ([(HeaderName, String); 2], String) {
    let safe: String = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", safe)),
        ],
        body,
    )
}
