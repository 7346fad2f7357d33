//! Binary downloads (reports and other exported files)
//!
//! `ApiClient::download` returns the raw response as a `Download`. The file
//! name comes from `Content-Disposition`: the RFC 5987 form
//! `filename*=UTF-8''...` wins over the plain quoted `filename="..."`, and the
//! caller's fallback is used when neither is present.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use bytes::Bytes;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};
use tracing::debug;

static EXTENDED_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)filename\*=UTF-8''([^;]+)").expect("valid regex"));

static QUOTED_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)filename="([^"]+)""#).expect("valid regex"));

/// Extract the download file name from a `Content-Disposition` value.
pub fn content_disposition_filename(header: &str, fallback: &str) -> String {
    let extended = EXTENDED_FILENAME
        .captures(header)
        .and_then(|c| c.get(1))
        .and_then(|m| percent_decode_str(m.as_str().trim()).decode_utf8().ok())
        .filter(|name| !name.is_empty());
    if let Some(name) = extended {
        return name.into_owned();
    }

    QUOTED_FILENAME
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
        .unwrap_or_else(|| fallback.to_owned())
}

/// A successful binary response.
#[derive(Debug, Clone)]
pub struct Download {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Download {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn content_disposition(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
    }

    /// File name announced by the server, or `fallback`.
    pub fn filename(&self, fallback: &str) -> String {
        content_disposition_filename(self.content_disposition().unwrap_or(""), fallback)
    }

    /// Write the body into `dir` under the announced file name and return the
    /// written path. Path separators in the name are replaced, so the file
    /// always lands directly inside `dir`.
    pub async fn save_to(&self, dir: &Path, fallback: &str) -> std::io::Result<PathBuf> {
        let mut name = sanitize(&self.filename(fallback));
        if name.is_empty() {
            name = sanitize(fallback);
        }
        let path = dir.join(name);
        tokio::fs::write(&path, &self.body).await?;
        debug!(path = %path.display(), bytes = self.body.len(), "download saved");
        Ok(path)
    }
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "." | ".." => String::new(),
        trimmed => trimmed.to_owned(),
    }
}
