//! The closed set of document formats the pipeline understands.
//!
//! Format tags arrive as free text (file extensions, CLI flags, form values).
//! They are validated here, at the boundary, so the rest of the crate only
//! ever sees a [`Format`].

use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder value a form shows before the user picks a target format.
const TARGET_PLACEHOLDER: &str = "select";

/// A supported document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Portable Document Format.
    Pdf,
    /// UTF-8 plain text.
    Txt,
    /// Office Open XML word-processing document.
    Docx,
}

impl Format {
    /// All formats, in display order.
    pub const ALL: [Format; 3] = [Format::Pdf, Format::Txt, Format::Docx];

    /// Parse a file extension (without the dot), case-insensitively.
    pub fn from_extension(ext: &str) -> Result<Self, ConversionError> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Format::Pdf),
            "txt" => Ok(Format::Txt),
            "docx" => Ok(Format::Docx),
            _ => Err(ConversionError::UnrecognizedFormat {
                value: ext.to_string(),
            }),
        }
    }

    /// Infer the format from the text after the last `.` of a file name.
    pub fn from_file_name(file_name: &str) -> Result<Self, ConversionError> {
        match file_name.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Err(ConversionError::UnrecognizedFormat {
                value: file_name.to_string(),
            }),
        }
    }

    /// Guess the format from leading magic bytes.
    ///
    /// Only PDF and ZIP containers carry a signature; plain text is never
    /// sniffed.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(Format::Pdf)
        } else if bytes.starts_with(b"PK\x03\x04") {
            Some(Format::Docx)
        } else {
            None
        }
    }

    /// Standard MIME type.
    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Pdf => "application/pdf",
            Format::Txt => "text/plain",
            Format::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Txt => "txt",
            Format::Docx => "docx",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Pdf => "PDF",
            Format::Txt => "TXT",
            Format::Docx => "DOCX",
        })
    }
}

/// Parses a requested *target* format.
///
/// Unlike [`Format::from_extension`] this recognises the form placeholder
/// and reports it as [`ConversionError::NoTargetSelected`].
impl FromStr for Format {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.is_empty() || tag.eq_ignore_ascii_case(TARGET_PLACEHOLDER) {
            return Err(ConversionError::NoTargetSelected);
        }
        Self::from_extension(tag.trim_start_matches('.'))
    }
}
