//! Up-front checks on an uploaded document.
//!
//! Cheap checks run before any parser sees the bytes: empty uploads, size
//! ceilings and a signature test that the bytes at least look like the
//! declared format. A DOCX that turns out to be a PDF gets a clear
//! `MalformedInput` here instead of a ZIP error deep in the reader.

use crate::config::ConversionConfig;
use crate::document::UploadedDocument;
use crate::error::ConversionError;
use crate::format::Format;
use tracing::debug;

/// Reject zero-length uploads.
pub fn ensure_not_empty(document: &UploadedDocument) -> Result<(), ConversionError> {
    if document.is_empty() {
        return Err(ConversionError::EmptyInput {
            file_name: document.file_name().to_string(),
        });
    }
    Ok(())
}

/// Reject uploads above `config.max_input_bytes`.
pub fn ensure_within_limit(
    document: &UploadedDocument,
    config: &ConversionConfig,
) -> Result<(), ConversionError> {
    let size = document.len() as u64;
    if size > config.max_input_bytes {
        return Err(ConversionError::TooLarge {
            what: format!("Upload '{}'", document.file_name()),
            size,
            limit: config.max_input_bytes,
        });
    }
    Ok(())
}

/// Verify the bytes carry the signature of the declared source format.
///
/// * PDF  — `%PDF` header (a few producers prepend junk, so the first 1 KiB
///   is searched, as PDF readers do)
/// * DOCX — ZIP local-file header `PK\x03\x04`
/// * TXT  — valid UTF-8
pub fn check_signature(document: &UploadedDocument) -> Result<(), ConversionError> {
    let bytes = document.content();
    let declared = document.source_format();

    let ok = match declared {
        Format::Pdf => find_pdf_header(bytes).is_some(),
        Format::Docx => bytes.starts_with(b"PK\x03\x04"),
        Format::Txt => std::str::from_utf8(bytes).is_ok(),
    };

    if ok {
        debug!("'{}' carries a {} signature", document.file_name(), declared);
        return Ok(());
    }

    let detail = match (declared, Format::sniff(bytes)) {
        (Format::Txt, _) => "content is not valid UTF-8 text".to_string(),
        (_, Some(found)) if found != declared => {
            format!("content looks like {found}, not {declared}")
        }
        _ => {
            let mut magic = [0u8; 4];
            let n = bytes.len().min(4);
            magic[..n].copy_from_slice(&bytes[..n]);
            format!("missing {declared} signature (first bytes: {magic:?})")
        }
    };
    Err(ConversionError::malformed(document.file_name(), declared, detail))
}

/// Offset of the `%PDF-` header within the first KiB, if any.
pub(crate) fn find_pdf_header(bytes: &[u8]) -> Option<usize> {
    let window = &bytes[..bytes.len().min(1024)];
    window.windows(5).position(|w| w == b"%PDF-")
}
