//! Input resolution: turn a user-supplied path or URL into an
//! [`UploadedDocument`].
//!
//! The conversion core works on in-memory bytes, so both local files and
//! downloads are read fully into memory. The size ceiling is therefore
//! enforced while reading: from file metadata for local paths, and from
//! `Content-Length` plus a running byte count for downloads, so an oversized
//! body is abandoned as soon as it crosses the limit.

use crate::config::ConversionConfig;
use crate::document::UploadedDocument;
use crate::error::ConversionError;
use crate::format::Format;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local path or HTTP(S) URL into an uploaded document.
///
/// The source format is `declared` when given, otherwise inferred from the
/// file name (and, for downloads, the response `Content-Type`).
pub async fn resolve_input(
    input: &str,
    declared: Option<Format>,
    config: &ConversionConfig,
) -> Result<UploadedDocument, ConversionError> {
    if is_url(input) {
        download_url(input, declared, config).await
    } else {
        read_local(input, declared, config).await
    }
}

/// Read a local file, validating existence, permissions and size.
async fn read_local(
    path_str: &str,
    declared: Option<Format>,
    config: &ConversionConfig,
) -> Result<UploadedDocument, ConversionError> {
    let path = PathBuf::from(path_str);

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(ConversionError::FileNotFound { path }),
        Err(e) => return Err(io_error(path, e)),
    };
    if metadata.len() > config.max_input_bytes {
        return Err(ConversionError::TooLarge {
            what: format!("File '{}'", path.display()),
            size: metadata.len(),
            limit: config.max_input_bytes,
        });
    }

    let bytes = tokio::fs::read(&path).await.map_err(|e| io_error(path.clone(), e))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    debug!("Read local file: {} ({} bytes)", path.display(), bytes.len());
    make_document(file_name, declared, bytes)
}

fn io_error(path: PathBuf, e: std::io::Error) -> ConversionError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConversionError::PermissionDenied { path },
        _ => ConversionError::FileNotFound { path },
    }
}

/// Download a URL into memory, bounded by `max_input_bytes`.
async fn download_url(
    url: &str,
    declared: Option<Format>,
    config: &ConversionConfig,
) -> Result<UploadedDocument, ConversionError> {
    info!("Downloading document from: {}", url);
    let timeout_secs = config.download_timeout_secs;
    let limit = config.max_input_bytes;

    let failed = |reason: String| ConversionError::DownloadFailed {
        url: url.to_string(),
        reason,
    };
    let classify = |e: reqwest::Error| {
        if e.is_timeout() {
            ConversionError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            failed(e.to_string())
        }
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let mut response = client.get(url).send().await.map_err(classify)?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let too_large = |size: u64| ConversionError::TooLarge {
        what: format!("Download '{url}'"),
        size,
        limit,
    };
    if let Some(len) = response.content_length() {
        if len > limit {
            return Err(too_large(len));
        }
    }

    let content_type_format = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(format_from_content_type);
    let file_name = file_name_from_url(url, declared.or(content_type_format));

    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(classify)? {
        bytes.extend_from_slice(&chunk);
        if bytes.len() as u64 > limit {
            return Err(too_large(bytes.len() as u64));
        }
    }

    info!("Downloaded {} bytes as '{}'", bytes.len(), file_name);
    make_document(file_name, declared.or(content_type_format), bytes)
}

fn make_document(
    file_name: String,
    declared: Option<Format>,
    bytes: Vec<u8>,
) -> Result<UploadedDocument, ConversionError> {
    match declared {
        Some(format) => Ok(UploadedDocument::with_format(file_name, format, bytes)),
        None => UploadedDocument::new(file_name, bytes),
    }
}

/// Map a `Content-Type` header value onto a format.
fn format_from_content_type(value: &str) -> Option<Format> {
    let mime = value.split(';').next()?.trim();
    Format::ALL
        .into_iter()
        .find(|f| f.mime_type().eq_ignore_ascii_case(mime))
}

/// Last non-empty URL path segment, or `downloaded.<ext>` when the URL has
/// none and the format is known.
fn file_name_from_url(url: &str, format: Option<Format>) -> String {
    let from_path = reqwest::Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .filter(|last| !last.is_empty())
    });

    match (from_path, format) {
        (Some(name), _) if name.contains('.') => name,
        (Some(name), Some(f)) => format!("{name}.{}", f.extension()),
        (Some(name), None) => name,
        (None, Some(f)) => format!("downloaded.{}", f.extension()),
        (None, None) => "downloaded".to_string(),
    }
}
