//! Source fetching: local files or `http(s)://` URLs.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::io::ErrorKind;

use tracing::debug;

use crate::error::LoadError;

/// Returns `true` when `source` should be fetched over HTTP rather than read from disk.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Downloads `url` through `client`.
pub fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>, LoadError> {
    client.get_bytes(url).map_err(|error| LoadError::Fetch {
        source_name: url.to_string(),
        error,
    })
}

/// Loads source data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip(client))]
pub fn read_source<C: HttpClient + ?Sized>(client: &C, source: &str) -> Result<Vec<u8>, LoadError> {
    let bytes = if is_remote(source) {
        fetch_bytes(client, source)?
    } else {
        std::fs::read(source).map_err(|error| match error.kind() {
            ErrorKind::NotFound => LoadError::NotFound {
                source_name: source.to_string(),
            },
            _ => LoadError::Io {
                source_name: source.to_string(),
                error,
            },
        })?
    };
    debug!(bytes = bytes.len(), "Source read");
    Ok(bytes)
}
