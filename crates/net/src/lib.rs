#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for relval
//!
//! This crate handles the HTTP side of catalog fetching: a pooled client
//! with retry logic and helpers that turn non-success statuses into
//! `NetworkError`s.

mod client;

pub use client::{NetClient, NetConfig};

use relval_errors::{Error, NetworkError};
use relval_events::{EventEmitter, EventSender};
use url::Url;

/// Fetch text content from a URL
///
/// # Errors
///
/// Returns an error if the HTTP request fails, the server returns an error status,
/// or the response body cannot be decoded as text.
pub async fn fetch_text(client: &NetClient, url: &str, tx: &EventSender) -> Result<String, Error> {
    parse_url(url)?;
    tx.emit_debug(format!("Fetching text from {url}"));

    let response = client.get(url).await?;

    if !response.status().is_success() {
        return Err(NetworkError::HttpError {
            status: response.status().as_u16(),
            message: response.status().to_string(),
        }
        .into());
    }

    response
        .text()
        .await
        .map_err(|e| NetworkError::InvalidBody(e.to_string()).into())
}

/// Parse and validate a URL
///
/// # Errors
///
/// Returns an error if the URL string is malformed or invalid according to RFC 3986.
pub fn parse_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")).into())
}

/// Append a path to a base URL, tolerating a trailing slash on the base
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
