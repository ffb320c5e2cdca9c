//! Error types for the horizon-convert library.
//!
//! Two error types reflect two unrelated surfaces:
//!
//! * [`ConversionError`] — everything that can stop a conversion, inspection
//!   or input resolution. Every variant maps onto an [`ErrorKind`] so callers
//!   can branch on the failure class without matching individual variants.
//!
//! * [`WorkspaceError`] — validation failures of the in-process event and
//!   task lists in [`crate::workspace`].
//!
//! A failed conversion never yields partial output: either a complete
//! [`crate::output::ConversionResult`] is returned or one of these errors.

use crate::format::Format;
use std::path::PathBuf;
use thiserror::Error;

/// Failure class of a [`ConversionError`].
///
/// The first five kinds are the conversion taxonomy; the rest cover the
/// surfaces around it (file/URL resolution, configuration, bugs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Zero-length upload.
    EmptyInput,
    /// The (source, target) pair is not in the transition table, or a format
    /// tag could not be recognised at all.
    UnsupportedConversion,
    /// The bytes do not parse as the declared source format.
    MalformedInput,
    /// Extraction succeeded but the target document could not be assembled.
    EncodingFailure,
    /// The input exceeds a configured size ceiling.
    TooLarge,
    /// The input file or URL could not be read.
    Input,
    /// Builder validation failed.
    InvalidConfig,
    /// Unexpected internal error.
    Internal,
}

/// All errors returned by the conversion entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    // ── Request errors ────────────────────────────────────────────────────
    /// Zero-length upload.
    #[error("Uploaded document '{file_name}' is empty")]
    EmptyInput { file_name: String },

    /// The (source, target) pair has no conversion strategy.
    #[error("Cannot convert {from} to {to}\nSupported: DOCX → PDF, PDF → TXT, PDF → DOCX.")]
    UnsupportedConversion { from: Format, to: Format },

    /// A file extension or format tag is not one of pdf, docx, txt.
    #[error("Unrecognised document format '{value}'\nSupported formats: pdf, docx, txt.")]
    UnrecognizedFormat { value: String },

    /// The caller left the target format on its placeholder value.
    #[error("No target format selected\nChoose one of: pdf, txt, docx.")]
    NoTargetSelected,

    /// Input exceeds a configured size ceiling.
    #[error("{what} is {size} bytes, above the {limit}-byte limit")]
    TooLarge {
        what: String,
        size: u64,
        limit: u64,
    },

    // ── Parse errors ──────────────────────────────────────────────────────
    /// Bytes do not parse as the declared source format.
    #[error("'{file_name}' is not a valid {format} document: {detail}")]
    MalformedInput {
        file_name: String,
        format: Format,
        detail: String,
    },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// The target document could not be assembled.
    #[error("Failed to assemble {format} output: {detail}")]
    EncodingFailure { format: Format, detail: String },

    /// The conversion did not finish within the configured wall-clock bound.
    #[error("Conversion to {format} timed out after {secs}s\nIncrease --render-timeout.")]
    RenderTimeout { format: Format, secs: u64 },

    // ── Input resolution errors ───────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConversionError {
    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::EmptyInput { .. } => ErrorKind::EmptyInput,
            ConversionError::UnsupportedConversion { .. }
            | ConversionError::UnrecognizedFormat { .. }
            | ConversionError::NoTargetSelected => ErrorKind::UnsupportedConversion,
            ConversionError::TooLarge { .. } => ErrorKind::TooLarge,
            ConversionError::MalformedInput { .. } => ErrorKind::MalformedInput,
            ConversionError::EncodingFailure { .. } | ConversionError::RenderTimeout { .. } => {
                ErrorKind::EncodingFailure
            }
            ConversionError::FileNotFound { .. }
            | ConversionError::PermissionDenied { .. }
            | ConversionError::DownloadFailed { .. }
            | ConversionError::DownloadTimeout { .. }
            | ConversionError::OutputWriteFailed { .. } => ErrorKind::Input,
            ConversionError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ConversionError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn malformed(
        file_name: &str,
        format: Format,
        detail: impl std::fmt::Display,
    ) -> Self {
        ConversionError::MalformedInput {
            file_name: file_name.to_string(),
            format,
            detail: detail.to_string(),
        }
    }

    pub(crate) fn encoding(format: Format, detail: impl std::fmt::Display) -> Self {
        ConversionError::EncodingFailure {
            format,
            detail: detail.to_string(),
        }
    }
}

/// Validation errors of the workspace event and task lists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    /// Event date is not a `YYYY-MM-DD` calendar date.
    #[error("Invalid event date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Event time is not an `HH:MM` clock time.
    #[error("Invalid event time '{0}': expected HH:MM")]
    InvalidTime(String),

    /// Required text field was blank.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// Priority label is not High, Medium or Low.
    #[error("Unknown priority '{0}': expected High, Medium or Low")]
    UnknownPriority(String),

    /// List index does not exist.
    #[error("No task at index {index} (list has {len} tasks)")]
    IndexOutOfRange { index: usize, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_display_names_both_formats() {
        let e = ConversionError::UnsupportedConversion {
            from: Format::Txt,
            to: Format::Pdf,
        };
        let msg = e.to_string();
        assert!(msg.contains("TXT"), "got: {msg}");
        assert!(msg.contains("PDF"), "got: {msg}");
    }

    #[test]
    fn format_errors_share_the_unsupported_kind() {
        assert_eq!(
            ConversionError::NoTargetSelected.kind(),
            ErrorKind::UnsupportedConversion
        );
        assert_eq!(
            ConversionError::UnrecognizedFormat { value: "xlsx".into() }.kind(),
            ErrorKind::UnsupportedConversion
        );
    }

    #[test]
    fn timeout_is_an_encoding_failure() {
        let e = ConversionError::RenderTimeout {
            format: Format::Pdf,
            secs: 5,
        };
        assert_eq!(e.kind(), ErrorKind::EncodingFailure);
        assert!(e.to_string().contains("5s"));
    }

    #[test]
    fn too_large_display() {
        let e = ConversionError::TooLarge {
            what: "Upload".into(),
            size: 2048,
            limit: 1024,
        };
        assert_eq!(e.kind(), ErrorKind::TooLarge);
        assert!(e.to_string().contains("1024-byte"));
    }

    #[test]
    fn workspace_index_display() {
        let e = WorkspaceError::IndexOutOfRange { index: 4, len: 2 };
        assert!(e.to_string().contains("index 4"));
    }
}
