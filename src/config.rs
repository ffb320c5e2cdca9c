//! Configuration types for document conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so a
//! config can be shared across threads and logged as a whole.

use crate::error::ConversionError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

const MIB: u64 = 1024 * 1024;

/// Configuration for a document conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use horizon_convert::{ConversionConfig, PageSize};
///
/// let config = ConversionConfig::builder()
///     .page_size(PageSize::A4)
///     .font_size_pt(12)
///     .max_input_bytes(10 * 1024 * 1024)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Largest accepted upload in bytes. Default: 50 MiB.
    ///
    /// Larger inputs fail with [`ConversionError::TooLarge`] before any
    /// parsing happens, so memory use stays bounded by this value.
    pub max_input_bytes: u64,

    /// Largest decompressed DOCX part in bytes. Default: 200 MiB.
    ///
    /// A DOCX is a ZIP archive; a few kilobytes of deflated XML can expand to
    /// gigabytes. The main document part is rejected above this size.
    pub max_expanded_bytes: u64,

    /// Same-format requests return the validated input unchanged. Default: false.
    ///
    /// When off, converting a document to its own format fails with
    /// [`ConversionError::UnsupportedConversion`].
    pub allow_pass_through: bool,

    /// Page size of rendered PDFs. Default: US Letter.
    pub page_size: PageSize,

    /// Page margin on all four sides, in points. Default: 72 (one inch).
    pub margin_pt: u32,

    /// Body font size in points. Default: 11.
    pub font_size_pt: u32,

    /// Baseline-to-baseline distance in points. Default: 14.
    pub line_height_pt: u32,

    /// Extra vertical gap after each paragraph, in points. Default: 6.
    pub paragraph_spacing_pt: u32,

    /// Separator between pages in extracted plain text. Default: newline.
    pub page_separator: PageSeparator,

    /// Title written to PDF document info and DOCX core properties.
    pub document_title: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Wall-clock bound for [`crate::convert::convert_async`] in seconds. Default: 60.
    pub render_timeout_secs: u64,

    /// Optional progress event sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 50 * MIB,
            max_expanded_bytes: 200 * MIB,
            allow_pass_through: false,
            page_size: PageSize::default(),
            margin_pt: 72,
            font_size_pt: 11,
            line_height_pt: 14,
            paragraph_spacing_pt: 6,
            page_separator: PageSeparator::default(),
            document_title: None,
            download_timeout_secs: 120,
            render_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("max_input_bytes", &self.max_input_bytes)
            .field("max_expanded_bytes", &self.max_expanded_bytes)
            .field("allow_pass_through", &self.allow_pass_through)
            .field("page_size", &self.page_size)
            .field("margin_pt", &self.margin_pt)
            .field("font_size_pt", &self.font_size_pt)
            .field("line_height_pt", &self.line_height_pt)
            .field("paragraph_spacing_pt", &self.paragraph_spacing_pt)
            .field("page_separator", &self.page_separator)
            .field("document_title", &self.document_title)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Width of the text column in points.
    pub(crate) fn text_width_pt(&self) -> u32 {
        self.page_size
            .width_pt()
            .saturating_sub(self.margin_pt.saturating_mul(2))
    }

    /// Number of lines that fit between the top and bottom margins.
    pub(crate) fn lines_per_page(&self) -> u32 {
        let usable = self
            .page_size
            .height_pt()
            .saturating_sub(self.margin_pt.saturating_mul(2));
        (usable / self.line_height_pt.max(1)).max(1)
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn max_input_bytes(mut self, n: u64) -> Self {
        self.config.max_input_bytes = n;
        self
    }

    pub fn max_expanded_bytes(mut self, n: u64) -> Self {
        self.config.max_expanded_bytes = n;
        self
    }

    pub fn allow_pass_through(mut self, v: bool) -> Self {
        self.config.allow_pass_through = v;
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn margin_pt(mut self, pt: u32) -> Self {
        self.config.margin_pt = pt;
        self
    }

    pub fn font_size_pt(mut self, pt: u32) -> Self {
        self.config.font_size_pt = pt.clamp(4, 72);
        self
    }

    pub fn line_height_pt(mut self, pt: u32) -> Self {
        self.config.line_height_pt = pt;
        self
    }

    pub fn paragraph_spacing_pt(mut self, pt: u32) -> Self {
        self.config.paragraph_spacing_pt = pt;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn document_title(mut self, title: impl Into<String>) -> Self {
        self.config.document_title = Some(title.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConversionError> {
        let c = &self.config;
        if c.max_input_bytes == 0 {
            return Err(ConversionError::InvalidConfig(
                "max_input_bytes must be ≥ 1".into(),
            ));
        }
        if c.line_height_pt < c.font_size_pt {
            return Err(ConversionError::InvalidConfig(format!(
                "line height ({}pt) must be at least the font size ({}pt)",
                c.line_height_pt, c.font_size_pt
            )));
        }
        // Room for at least a handful of glyphs per line.
        if c.text_width_pt() < c.font_size_pt * 4 {
            return Err(ConversionError::InvalidConfig(format!(
                "margins of {}pt leave no room for text on a {}pt-wide page",
                c.margin_pt,
                c.page_size.width_pt()
            )));
        }
        if c.page_size.height_pt() < c.margin_pt.saturating_mul(2).saturating_add(c.line_height_pt) {
            return Err(ConversionError::InvalidConfig(format!(
                "margins of {}pt leave no room for a line on a {}pt-tall page",
                c.margin_pt,
                c.page_size.height_pt()
            )));
        }
        if c.render_timeout_secs == 0 {
            return Err(ConversionError::InvalidConfig(
                "render timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Physical page size of rendered PDFs, in PostScript points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageSize {
    /// 8.5 × 11 in. (default)
    #[default]
    Letter,
    /// 210 × 297 mm.
    A4,
    /// Arbitrary width × height in points.
    Custom { width: u32, height: u32 },
}

impl PageSize {
    pub fn width_pt(self) -> u32 {
        match self {
            PageSize::Letter => 612,
            PageSize::A4 => 595,
            PageSize::Custom { width, .. } => width,
        }
    }

    pub fn height_pt(self) -> u32 {
        match self {
            PageSize::Letter => 792,
            PageSize::A4 => 842,
            PageSize::Custom { height, .. } => height,
        }
    }
}

/// How to separate pages in extracted plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Pages joined like any other line break. (default)
    #[default]
    Newline,
    /// An empty line between pages.
    BlankLine,
    /// ASCII form feed on its own line, the traditional page break in text files.
    FormFeed,
    /// Custom string on its own line between pages.
    Custom(String),
}

impl PageSeparator {
    /// The string inserted between the last block of one page and the first
    /// block of the next.
    pub fn render(&self) -> String {
        match self {
            PageSeparator::Newline => "\n".to_string(),
            PageSeparator::BlankLine => "\n\n".to_string(),
            PageSeparator::FormFeed => "\n\x0c\n".to_string(),
            PageSeparator::Custom(s) => format!("\n{}\n", s),
        }
    }
}
