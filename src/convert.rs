//! Conversion entry points.
//!
//! [`convert`] is the core operation: bytes in, bytes out, synchronous and
//! free of shared state, so any number of conversions may run concurrently.
//! Everything else wraps it:
//!
//! * [`convert_async`] moves the work onto tokio's blocking pool and bounds
//!   it with `render_timeout_secs`
//! * [`convert_file`] / [`convert_to_file`] resolve a path or URL first and,
//!   for the latter, write the result atomically
//! * [`inspect`] / [`inspect_file`] report what a document contains without
//!   converting it
//!
//! ## Check order
//!
//! A request is rejected as cheaply as possible: empty input, then the
//! transition table, then the size ceiling, then the format signature. Only
//! then does a parser see the bytes.

use crate::config::ConversionConfig;
use crate::document::{ConversionRequest, UploadedDocument};
use crate::error::ConversionError;
use crate::format::Format;
use crate::output::{output_file_name, ConversionResult, ConversionStats, DocumentInfo};
use crate::pipeline::{docx, input, pdf, postprocess, validate};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How a (source, target) pair is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Paragraphs out of the DOCX, laid out into a PDF.
    DocxToPdf,
    /// Page text out of the PDF, joined into UTF-8 text.
    PdfToTxt,
    /// Page text out of the PDF, one DOCX paragraph per text block.
    PdfToDocx,
    /// Same format on both sides; the validated input is returned unchanged.
    PassThrough,
}

/// Look up the strategy for a (source, target) pair.
///
/// The table is closed: anything not listed fails with
/// [`ConversionError::UnsupportedConversion`]. Same-format pairs are only
/// accepted when `config.allow_pass_through` is set.
pub fn plan(
    source: Format,
    target: Format,
    config: &ConversionConfig,
) -> Result<Strategy, ConversionError> {
    match (source, target) {
        (Format::Docx, Format::Pdf) => Ok(Strategy::DocxToPdf),
        (Format::Pdf, Format::Txt) => Ok(Strategy::PdfToTxt),
        (Format::Pdf, Format::Docx) => Ok(Strategy::PdfToDocx),
        (s, t) if s == t && config.allow_pass_through => Ok(Strategy::PassThrough),
        (from, to) => Err(ConversionError::UnsupportedConversion { from, to }),
    }
}

/// Convert an uploaded document to `target`.
///
/// On success the result holds complete, valid bytes in the target format
/// named `converted_document.<ext>`. On failure nothing is produced.
///
/// # Example
/// ```rust
/// use horizon_convert::{convert, ConversionConfig, ErrorKind, Format, UploadedDocument};
///
/// let doc = UploadedDocument::new("notes.txt", b"hello".to_vec()).unwrap();
/// let err = convert(&doc, Format::Pdf, &ConversionConfig::default()).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::UnsupportedConversion);
/// ```
pub fn convert(
    document: &UploadedDocument,
    target: Format,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConversionError> {
    run(document, target, None, config)
}

/// Convert a request, honouring its output file-name override.
pub fn convert_request(
    request: &ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConversionError> {
    run(
        &request.document,
        request.target,
        request.file_name_override.as_deref(),
        config,
    )
}

/// Convert on tokio's blocking pool, bounded by `render_timeout_secs`.
///
/// On expiry the caller gets [`ConversionError::RenderTimeout`]; the
/// abandoned worker finishes in the background and its output is dropped.
pub async fn convert_async(
    request: ConversionRequest,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConversionError> {
    let secs = config.render_timeout_secs;
    let target = request.target;
    let config = config.clone();

    let task = tokio::task::spawn_blocking(move || convert_request(&request, &config));

    match tokio::time::timeout(Duration::from_secs(secs), task).await {
        Ok(joined) => joined
            .map_err(|e| ConversionError::Internal(format!("Conversion task panicked: {e}")))?,
        Err(_) => {
            warn!("Conversion to {} exceeded {}s", target, secs);
            Err(ConversionError::RenderTimeout {
                format: target,
                secs,
            })
        }
    }
}

/// Resolve a local path or URL and convert it.
pub async fn convert_file(
    input_str: impl AsRef<str>,
    target: Format,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConversionError> {
    let document = input::resolve_input(input_str.as_ref(), None, config).await?;
    convert_async(ConversionRequest::new(document, target), config).await
}

/// Resolve, convert and write the result to `output_path`.
///
/// Uses atomic write (temp file in the target directory + rename), so the
/// output path either holds a complete document or is left untouched.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    target: Format,
    config: &ConversionConfig,
) -> Result<ConversionStats, ConversionError> {
    let result = convert_file(input_str, target, config).await?;
    write_output(&result.content, output_path).await?;
    Ok(result.stats)
}

/// Atomically write converted bytes to `path`.
pub async fn write_output(content: &[u8], path: impl AsRef<Path>) -> Result<(), ConversionError> {
    let path = path.as_ref().to_path_buf();
    let content = content.to_vec();
    let target = path.clone();

    tokio::task::spawn_blocking(move || write_atomic(&content, &target))
        .await
        .map_err(|e| ConversionError::Internal(format!("Write task panicked: {e}")))?
        .map_err(|e| ConversionError::OutputWriteFailed {
            detail: e.to_string(),
            path,
        })?;
    Ok(())
}

fn write_atomic(content: &[u8], path: &Path) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// Report what a document contains without converting it.
///
/// Runs the same validation as [`convert`], so an empty, oversized or
/// mislabelled document fails here with the same error.
pub fn inspect(
    document: &UploadedDocument,
    config: &ConversionConfig,
) -> Result<DocumentInfo, ConversionError> {
    validate::ensure_not_empty(document)?;
    validate::ensure_within_limit(document, config)?;
    validate::check_signature(document)?;

    let bytes = document.content();
    let name = document.file_name();

    let (pages, blocks, characters) = match document.source_format() {
        Format::Pdf => {
            let pages = pdf::extract_pages(bytes, name)?;
            let blocks = pages.iter().map(Vec::len).sum();
            (Some(pages.len()), blocks, count_chars(pages.iter().flatten()))
        }
        Format::Docx => {
            let paragraphs = docx::read_paragraphs(bytes, name, config.max_expanded_bytes)?;
            (None, paragraphs.len(), count_chars(&paragraphs))
        }
        Format::Txt => {
            // Signature check guarantees UTF-8.
            let text = String::from_utf8_lossy(bytes);
            let blocks = text.lines().filter(|l| !l.trim().is_empty()).count();
            (None, blocks, text.chars().count())
        }
    };

    let detected_format = Format::sniff(bytes).or_else(|| {
        std::str::from_utf8(bytes).ok().map(|_| Format::Txt)
    });

    Ok(DocumentInfo {
        file_name: name.to_string(),
        declared_format: document.source_format(),
        detected_format,
        size_bytes: document.len() as u64,
        pages,
        blocks,
        characters,
    })
}

/// Resolve a local path or URL and [`inspect`] it.
pub async fn inspect_file(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<DocumentInfo, ConversionError> {
    let document = input::resolve_input(input_str.as_ref(), None, config).await?;
    let config = config.clone();
    tokio::task::spawn_blocking(move || inspect(&document, &config))
        .await
        .map_err(|e| ConversionError::Internal(format!("Inspect task panicked: {e}")))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Output of one strategy before it is wrapped into a result.
struct Produced {
    bytes: Vec<u8>,
    pages: usize,
    blocks: usize,
}

fn run(
    document: &UploadedDocument,
    target: Format,
    override_name: Option<&str>,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConversionError> {
    let start = Instant::now();
    info!(
        "Converting '{}' ({} → {}, {} bytes)",
        document.file_name(),
        document.source_format(),
        target,
        document.len()
    );

    let result = run_stages(document, target, config).map(|produced| {
        let stats = ConversionStats {
            source: document.source_format(),
            target,
            input_bytes: document.len() as u64,
            output_bytes: produced.bytes.len() as u64,
            pages: produced.pages,
            blocks: produced.blocks,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        ConversionResult {
            content: produced.bytes,
            mime_type: target.mime_type().to_string(),
            file_name: output_file_name(target, override_name),
            stats,
        }
    });

    match &result {
        Ok(out) => {
            info!(
                "Conversion complete: {} bytes as '{}' in {}ms",
                out.stats.output_bytes, out.file_name, out.stats.duration_ms
            );
            if let Some(ref cb) = config.progress_callback {
                cb.on_conversion_complete(out.content.len());
            }
        }
        Err(e) => {
            warn!("Conversion of '{}' failed: {}", document.file_name(), e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_conversion_error(&e.to_string());
            }
        }
    }
    result
}

fn run_stages(
    document: &UploadedDocument,
    target: Format,
    config: &ConversionConfig,
) -> Result<Produced, ConversionError> {
    let source = document.source_format();

    // ── Step 1: Validate ─────────────────────────────────────────────────
    validate::ensure_not_empty(document)?;
    let strategy = plan(source, target, config)?;
    validate::ensure_within_limit(document, config)?;
    validate::check_signature(document)?;
    debug!("Strategy for {} → {}: {:?}", source, target, strategy);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(source, target, document.len());
    }

    // ── Step 2: Extract and assemble ─────────────────────────────────────
    let bytes = document.content();
    let name = document.file_name();
    match strategy {
        Strategy::DocxToPdf => {
            let paragraphs: Vec<String> =
                docx::read_paragraphs(bytes, name, config.max_expanded_bytes)?
                    .iter()
                    .map(|p| postprocess::clean_paragraph(p))
                    .collect();
            extracted(config, paragraphs.len());

            let rendered = pdf::render(&paragraphs, config)?;
            Ok(Produced {
                bytes: rendered.bytes,
                pages: rendered.pages,
                blocks: paragraphs.len(),
            })
        }
        Strategy::PdfToTxt => {
            let pages = pdf::extract_pages(bytes, name)?;
            let blocks = pages.iter().map(Vec::len).sum();
            extracted(config, blocks);

            let text = postprocess::assemble_text(&pages, &config.page_separator);
            Ok(Produced {
                bytes: text.into_bytes(),
                pages: pages.len(),
                blocks,
            })
        }
        Strategy::PdfToDocx => {
            let pages = pdf::extract_pages(bytes, name)?;
            let page_count = pages.len();
            let blocks: Vec<String> = pages.into_iter().flatten().collect();
            extracted(config, blocks.len());

            let docx = docx::write_document(&blocks, config)?;
            Ok(Produced {
                bytes: docx,
                pages: page_count,
                blocks: blocks.len(),
            })
        }
        Strategy::PassThrough => {
            extracted(config, 0);
            Ok(Produced {
                bytes: bytes.to_vec(),
                pages: 0,
                blocks: 0,
            })
        }
    }
}

fn extracted(config: &ConversionConfig, blocks: usize) {
    debug!("Extracted {} blocks", blocks);
    if let Some(ref cb) = config.progress_callback {
        cb.on_extracted(blocks);
    }
}

fn count_chars<'a>(blocks: impl IntoIterator<Item = &'a String>) -> usize {
    blocks.into_iter().map(|b| b.chars().count()).sum()
}
