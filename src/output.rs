//! Result types handed back to the caller.

use crate::format::Format;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Base name used when the caller does not choose an output file name.
pub const DEFAULT_OUTPUT_STEM: &str = "converted_document";

/// The complete output of one successful conversion.
///
/// Produced once per request and not retained by the pipeline. Serialises
/// without `content` (for `--json` reports) and cannot be rebuilt from JSON:
///
/// ```compile_fail
/// let _: horizon_convert::ConversionResult = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// Output bytes, valid in the target format.
    #[serde(skip)]
    pub content: Vec<u8>,
    /// MIME type of `content`.
    pub mime_type: String,
    /// Suggested download name.
    pub file_name: String,
    pub stats: ConversionStats,
}

/// Counters describing a finished conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionStats {
    pub source: Format,
    pub target: Format,
    pub input_bytes: u64,
    pub output_bytes: u64,
    /// Pages read (PDF source) or written (PDF target); 0 otherwise.
    pub pages: usize,
    /// Paragraphs or text blocks carried from source to target.
    pub blocks: usize,
    pub duration_ms: u64,
}

/// What [`crate::convert::inspect`] learned about a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_name: String,
    pub declared_format: Format,
    /// Format suggested by magic bytes, if any.
    pub detected_format: Option<Format>,
    pub size_bytes: u64,
    /// Page count for PDFs.
    pub pages: Option<usize>,
    /// Paragraphs (DOCX), text blocks (PDF) or non-empty lines (TXT).
    pub blocks: usize,
    pub characters: usize,
}

/// Resolve the suggested output file name for `target`.
///
/// An override is reduced to its base name so it can never escape the
/// caller's download directory, and gets the target extension appended when
/// it does not already carry it.
pub fn output_file_name(target: Format, override_name: Option<&str>) -> String {
    let ext = target.extension();
    let base = override_name
        .and_then(|n| Path::new(n.trim()).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..");

    match base {
        Some(name) => {
            let has_ext = name
                .rsplit_once('.')
                .is_some_and(|(stem, e)| !stem.is_empty() && e.eq_ignore_ascii_case(ext));
            if has_ext {
                name.to_string()
            } else {
                format!("{name}.{ext}")
            }
        }
        None => format!("{DEFAULT_OUTPUT_STEM}.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_is_deterministic() {
        assert_eq!(output_file_name(Format::Pdf, None), "converted_document.pdf");
        assert_eq!(output_file_name(Format::Txt, None), "converted_document.txt");
        assert_eq!(
            output_file_name(Format::Docx, Some("  ")),
            "converted_document.docx"
        );
    }

    #[test]
    fn override_keeps_or_appends_extension() {
        assert_eq!(output_file_name(Format::Pdf, Some("notes.PDF")), "notes.PDF");
        assert_eq!(output_file_name(Format::Pdf, Some("notes")), "notes.pdf");
        assert_eq!(output_file_name(Format::Txt, Some("notes.pdf")), "notes.pdf.txt");
    }

    #[test]
    fn override_is_stripped_to_base_name() {
        assert_eq!(
            output_file_name(Format::Docx, Some("../../etc/passwd")),
            "passwd.docx"
        );
        assert_eq!(output_file_name(Format::Txt, Some("..")), "converted_document.txt");
    }

    #[test]
    fn stats_serialise_without_content() {
        let result = ConversionResult {
            content: vec![1, 2, 3],
            mime_type: "text/plain".into(),
            file_name: "converted_document.txt".into(),
            stats: ConversionStats {
                source: Format::Pdf,
                target: Format::Txt,
                input_bytes: 10,
                output_bytes: 3,
                pages: 1,
                blocks: 1,
                duration_ms: 0,
            },
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("content"));
        assert!(json.contains("\"source\":\"pdf\""));
    }
}
