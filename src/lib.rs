//! # horizon-convert
//!
//! Convert uploaded documents between PDF, DOCX and plain text.
//!
//! The supported conversions form a closed table:
//!
//! | from | to   | how |
//! |------|------|-----|
//! | DOCX | PDF  | paragraph text, in order, laid out on paginated text pages |
//! | PDF  | TXT  | real text extraction, page order then content order |
//! | PDF  | DOCX | one paragraph per extracted text block |
//!
//! Every other pair fails with [`ErrorKind::UnsupportedConversion`].
//! Same-format requests are rejected unless
//! [`ConversionConfig::allow_pass_through`] is set.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload / path / URL
//!  │
//!  ├─ 1. Input     resolve local file or download from URL
//!  ├─ 2. Validate  empty? supported pair? too large? right signature?
//!  ├─ 3. Extract   DOCX paragraphs (zip + quick-xml) or PDF page text (lopdf)
//!  ├─ 4. Clean     line endings, invisible and control characters
//!  └─ 5. Assemble  PDF (lopdf), DOCX (zip) or UTF-8 text
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use horizon_convert::{convert, ConversionConfig, Format, UploadedDocument};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("report.pdf")?;
//!     let doc = UploadedDocument::new("report.pdf", bytes)?;
//!
//!     let result = convert(&doc, Format::Txt, &ConversionConfig::default())?;
//!     std::fs::write(&result.file_name, &result.content)?;
//!     eprintln!("{} blocks from {} pages", result.stats.blocks, result.stats.pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docconv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! horizon-convert = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageSeparator, PageSize};
pub use convert::{
    convert, convert_async, convert_file, convert_request, convert_to_file, inspect,
    inspect_file, plan, write_output, Strategy,
};
pub use document::{ConversionRequest, UploadedDocument};
pub use error::{ConversionError, ErrorKind, WorkspaceError};
pub use format::Format;
pub use output::{ConversionResult, ConversionStats, DocumentInfo};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use workspace::{Event, EventList, Insights, Priority, Task, TaskList};
