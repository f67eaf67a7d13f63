//! Session header templates
//!
//! A template is a captured block of request headers (typically copied from a
//! logged-in browser session) that is replayed on every timeline request.
//! Credentials are never renewed here; an expired template has to be replaced.

use crate::BackupError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::path::Path;

/// Headers that describe a single captured request rather than the session
const DROPPED_HEADERS: &[&str] = &["accept-encoding", "host", "content-length", "connection"];

/// Supplies the headers that authenticate timeline requests
pub trait SessionProvider: Send + Sync {
    fn headers(&self) -> Result<HeaderMap, BackupError>;
}

/// A fixed set of headers parsed from a raw header block
#[derive(Debug, Clone, Default)]
pub struct HeaderTemplate {
    headers: HeaderMap,
}

impl HeaderTemplate {
    /// A template that adds no headers (anonymous access)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a raw header block
    ///
    /// An optional request line (`GET /path HTTP/1.1`) is skipped, then every
    /// non-empty line must be `Name: value`.
    pub fn parse(text: &str) -> Result<Self, BackupError> {
        let mut headers = HeaderMap::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if index == 0 && line.contains(" HTTP/") {
                continue;
            }

            let (name, value) = line.split_once(':').ok_or_else(|| {
                BackupError::Session(format!("malformed header on line {}", index + 1))
            })?;

            let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| {
                BackupError::Session(format!("invalid header name on line {}: {}", index + 1, e))
            })?;
            if DROPPED_HEADERS.contains(&name.as_str()) {
                continue;
            }

            let value = HeaderValue::from_str(value.trim()).map_err(|e| {
                BackupError::Session(format!("invalid header value on line {}: {}", index + 1, e))
            })?;
            headers.append(name, value);
        }

        Ok(Self { headers })
    }

    /// Reads and parses a header block from a file
    pub fn load(path: &Path) -> Result<Self, BackupError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl SessionProvider for HeaderTemplate {
    fn headers(&self) -> Result<HeaderMap, BackupError> {
        Ok(self.headers.clone())
    }
}
