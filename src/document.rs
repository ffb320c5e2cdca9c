//! Request-side data model: the uploaded document and what to make of it.

use crate::error::ConversionError;
use crate::format::Format;
use std::sync::Arc;

/// A document submitted for conversion.
///
/// The content is immutable once received; clones share the same buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    content: Arc<[u8]>,
    file_name: String,
    source_format: Format,
}

impl UploadedDocument {
    /// Wrap uploaded bytes, inferring the source format from the file name.
    ///
    /// Fails fast with [`ConversionError::UnrecognizedFormat`] when the
    /// extension is not pdf, docx or txt.
    pub fn new(
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Result<Self, ConversionError> {
        let file_name = file_name.into();
        let source_format = Format::from_file_name(&file_name)?;
        Ok(Self::with_format(file_name, source_format, content))
    }

    /// Wrap uploaded bytes with an explicitly declared source format.
    pub fn with_format(
        file_name: impl Into<String>,
        source_format: Format,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            content: Arc::from(content.into()),
            file_name: file_name.into(),
            source_format,
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source_format(&self) -> Format {
        self.source_format
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// A single conversion request.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub document: UploadedDocument,
    pub target: Format,
    /// Caller-chosen output file name; `converted_document.<ext>` if unset.
    pub file_name_override: Option<String>,
}

impl ConversionRequest {
    pub fn new(document: UploadedDocument, target: Format) -> Self {
        Self {
            document,
            target,
            file_name_override: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name_override = Some(name.into());
        self
    }
}
