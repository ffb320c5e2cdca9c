//! PDF text extraction and text-to-PDF rendering, both via lopdf.
//!
//! ## Extraction
//!
//! Pages are visited in page-number order. Each page's content stream is
//! walked operator by operator: string operands of `Tj`, `TJ`, `'` and `"`
//! are decoded through the font's encoding (including `ToUnicode` maps), and a
//! line break is emitted whenever the text position moves to another
//! baseline (`Td`, `TD`, `T*`, `Tm`, `'`, `"`, or a `cm` that shifts the
//! page). Horizontal moves on the same baseline and wide `TJ` adjustments
//! become a single space. Each extracted line becomes one text block (see
//! [`crate::pipeline::postprocess::split_blocks`]).
//!
//! lopdf can panic on hostile input instead of returning an error; the parse
//! runs under `catch_unwind` so such a file surfaces as `MalformedInput`.
//!
//! ## Rendering
//!
//! Latin text is set in standard Helvetica; anything else in an embedded
//! Unicode face with a `ToUnicode` map, so every character extracts back.
//! Lines are word-wrapped with the face's advance widths and every line is
//! written as its own `BT … ET` text object.

use crate::config::ConversionConfig;
use crate::error::ConversionError;
use crate::format::Format;
use crate::pipeline::font::FontFace;
use crate::pipeline::postprocess::split_blocks;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Encoding, Object, ObjectId};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

const FONT_KEY: &str = "F1";
const TAB_WIDTH: usize = 4;

/// Runs whose baselines differ by less than this many points share a line.
const SAME_LINE_TOLERANCE: f64 = 1.0;

/// A `TJ` adjustment wider than this (thousandths of an em) reads as a word gap.
const TJ_WORD_GAP: f32 = 200.0;

/// A rendered PDF and what it took to produce it.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
    /// Characters the embedded face has no glyph for. They are drawn as the
    /// missing-glyph box and still extract as the original character.
    pub missing_glyphs: usize,
}

// ── Extraction ───────────────────────────────────────────────────────────────

/// Extract cleaned text blocks per page, in page order.
pub fn extract_pages(bytes: &[u8], file_name: &str) -> Result<Vec<Vec<String>>, ConversionError> {
    match panic::catch_unwind(AssertUnwindSafe(|| extract_pages_inner(bytes, file_name))) {
        Ok(result) => result,
        Err(_) => Err(ConversionError::malformed(
            file_name,
            Format::Pdf,
            "PDF parser aborted on this input",
        )),
    }
}

fn load(bytes: &[u8], file_name: &str) -> Result<Document, ConversionError> {
    Document::load_mem(bytes).map_err(|e| ConversionError::malformed(file_name, Format::Pdf, e))
}

fn extract_pages_inner(bytes: &[u8], file_name: &str) -> Result<Vec<Vec<String>>, ConversionError> {
    let doc = load(bytes, file_name)?;
    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(ConversionError::malformed(
            file_name,
            Format::Pdf,
            "document has no pages",
        ));
    }
    debug!("PDF loaded: {} pages", pages.len());

    let mut out = Vec::with_capacity(pages.len());
    for (&page_no, &page_id) in &pages {
        let text = page_text(&doc, page_id).map_err(|e| {
            ConversionError::malformed(file_name, Format::Pdf, format!("page {page_no}: {e}"))
        })?;
        let blocks = split_blocks(&text);
        debug!("Page {} → {} text blocks", page_no, blocks.len());
        out.push(blocks);
    }
    Ok(out)
}

/// Raw text of one page, one line per baseline.
fn page_text(doc: &Document, page_id: ObjectId) -> Result<String, lopdf::Error> {
    let encodings: BTreeMap<Vec<u8>, Encoding> = doc
        .get_page_fonts(page_id)?
        .into_iter()
        .filter_map(|(name, font)| match font.get_font_encoding(doc) {
            Ok(encoding) => Some((name, encoding)),
            Err(e) => {
                debug!("Font /{}: {}", String::from_utf8_lossy(&name), e);
                None
            }
        })
        .collect();
    let content = doc.get_and_decode_page_content(page_id)?;

    let mut cursor = TextCursor::new(&encodings);
    for op in &content.operations {
        cursor.apply(op);
    }
    Ok(cursor.text)
}

/// Vertical part of an affine transform: `y' = scale * y + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Vertical {
    scale: f64,
    offset: f64,
}

impl Vertical {
    const IDENTITY: Vertical = Vertical {
        scale: 1.0,
        offset: 0.0,
    };

    fn apply(self, y: f64) -> f64 {
        self.scale * y + self.offset
    }

    /// `inner` applied first, then `self`.
    fn compose(self, inner: Vertical) -> Vertical {
        Vertical {
            scale: self.scale * inner.scale,
            offset: self.apply(inner.offset),
        }
    }
}

/// Follows the text position through a content stream and collects the
/// shown strings.
struct TextCursor<'a> {
    encodings: &'a BTreeMap<Vec<u8>, Encoding<'a>>,
    font: Option<&'a Encoding<'a>>,
    ctm: Vertical,
    saved: Vec<Vertical>,
    line: Vertical,
    leading: f64,
    pending_break: bool,
    pending_gap: bool,
    last_baseline: Option<f64>,
    text: String,
}

impl<'a> TextCursor<'a> {
    fn new(encodings: &'a BTreeMap<Vec<u8>, Encoding<'a>>) -> Self {
        Self {
            encodings,
            font: None,
            ctm: Vertical::IDENTITY,
            saved: Vec::new(),
            line: Vertical::IDENTITY,
            leading: 0.0,
            pending_break: false,
            pending_gap: false,
            last_baseline: None,
            text: String::new(),
        }
    }

    fn apply(&mut self, op: &Operation) {
        let operands = &op.operands;
        match op.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => self.ctm = self.saved.pop().unwrap_or(Vertical::IDENTITY),
            "cm" => {
                if let [_, _, _, d, _, f] = operands.as_slice() {
                    let cm = Vertical {
                        scale: number(d),
                        offset: number(f),
                    };
                    self.ctm = self.ctm.compose(cm);
                }
            }
            "BT" => self.line = Vertical::IDENTITY,
            "Tf" => {
                let encodings = self.encodings;
                self.font = operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .and_then(|name| encodings.get(name));
            }
            "TL" => self.leading = operands.first().map_or(0.0, number),
            "Td" | "TD" => {
                if let [tx, ty] = operands.as_slice() {
                    let (tx, ty) = (number(tx), number(ty));
                    if op.operator == "TD" {
                        self.leading = -ty;
                    }
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let [_, _, _, d, _, f] = operands.as_slice() {
                    self.line = Vertical {
                        scale: number(d),
                        offset: number(f),
                    };
                    self.pending_gap = true;
                }
            }
            "T*" => self.next_line(),
            "Tj" => self.show(operands.first()),
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    self.start_run();
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.push_decoded(bytes),
                            other => {
                                if other.as_float().is_ok_and(|n| -n > TJ_WORD_GAP) {
                                    self.gap();
                                }
                            }
                        }
                    }
                }
            }
            "'" => {
                self.next_line();
                self.show(operands.first());
            }
            "\"" => {
                self.next_line();
                self.show(operands.get(2));
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line.offset += ty * self.line.scale;
        if tx != 0.0 {
            self.pending_gap = true;
        }
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
        self.pending_break = true;
    }

    fn show(&mut self, operand: Option<&Object>) {
        if let Some(Object::String(bytes, _)) = operand {
            self.start_run();
            self.push_decoded(bytes);
        }
    }

    /// Decide how a new run joins the text collected so far.
    fn start_run(&mut self) {
        let baseline = self.ctm.apply(self.line.offset);
        if let Some(last) = self.last_baseline {
            if self.pending_break || (baseline - last).abs() > SAME_LINE_TOLERANCE {
                self.line_break();
            } else if self.pending_gap {
                self.gap();
            }
        }
        self.last_baseline = Some(baseline);
        self.pending_break = false;
        self.pending_gap = false;
    }

    fn push_decoded(&mut self, bytes: &[u8]) {
        let decoded = self
            .font
            .and_then(|encoding| Document::decode_text(encoding, bytes).ok())
            .unwrap_or_else(|| bytes.iter().map(|&b| char::from(b)).collect());
        self.text.push_str(&decoded);
    }

    fn line_break(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    fn gap(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with(char::is_whitespace) {
            self.text.push(' ');
        }
    }
}

fn number(o: &Object) -> f64 {
    o.as_float().map_or(0.0, f64::from)
}

// ── Rendering ────────────────────────────────────────────────────────────────

/// One laid-out line: baseline position and text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlacedLine {
    y: i64,
    text: String,
}

/// Lay `paragraphs` out on pages and serialise the PDF.
///
/// Empty input still produces a single blank page, so the output is always a
/// well-formed document.
pub fn render(paragraphs: &[String], config: &ConversionConfig) -> Result<RenderedPdf, ConversionError> {
    let paragraphs: Vec<String> = paragraphs.iter().map(|p| expand_tabs(p)).collect();
    let face = FontFace::for_text(paragraphs.iter().map(String::as_str))?;
    let missing_glyphs = face.missing_glyphs();
    if missing_glyphs > 0 {
        warn!(
            "{} character(s) have no glyph in the embedded font and show as boxes",
            missing_glyphs
        );
    }

    let pages = layout(&paragraphs, &face, config);
    let page_count = pages.len();
    let bytes = write_pdf(&pages, &face, config)
        .map_err(|e| ConversionError::encoding(Format::Pdf, e))?;
    debug!("Rendered PDF: {} pages → {} bytes", page_count, bytes.len());

    Ok(RenderedPdf {
        bytes,
        pages: page_count,
        missing_glyphs,
    })
}

/// Word-wrap and paginate. Returns the lines of every page.
fn layout(paragraphs: &[String], face: &FontFace, config: &ConversionConfig) -> Vec<Vec<PlacedLine>> {
    let font_size = i64::from(config.font_size_pt);
    let line_height = i64::from(config.line_height_pt);
    let margin = i64::from(config.margin_pt);
    let top = i64::from(config.page_size.height_pt()) - margin - font_size;
    // Text width in thousandths of an em at the configured size.
    let max_width = i64::from(config.text_width_pt()) * 1000 / font_size.max(1);

    let mut pages = vec![Vec::new()];
    let mut y = top;

    let advance = |pages: &mut Vec<Vec<PlacedLine>>, y: &mut i64, dy: i64| {
        *y -= dy;
        if *y < margin {
            pages.push(Vec::new());
            *y = top;
        }
    };

    for paragraph in paragraphs {
        for hard_line in paragraph.split('\n') {
            let lines = wrap(hard_line, face, max_width);
            if lines.is_empty() {
                // Blank line: keep the vertical space.
                advance(&mut pages, &mut y, line_height);
                continue;
            }
            for line in lines {
                if let Some(page) = pages.last_mut() {
                    page.push(PlacedLine { y, text: line });
                }
                advance(&mut pages, &mut y, line_height);
            }
        }
        if config.paragraph_spacing_pt > 0 && y != top {
            advance(&mut pages, &mut y, i64::from(config.paragraph_spacing_pt));
        }
    }

    // Drop a trailing page opened by the last advance but never written to.
    if pages.len() > 1 && pages.last().is_some_and(Vec::is_empty) {
        pages.pop();
    }
    pages
}

/// Greedy word wrap of one line. Words wider than a whole line are broken
/// between characters.
fn wrap(line: &str, face: &FontFace, max_width: i64) -> Vec<String> {
    let space = face.char_width(' ');
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0i64;

    for word in line.split(' ').filter(|w| !w.is_empty()) {
        let width = face.text_width(word);
        let needed = if current.is_empty() { width } else { current_width + space + width };

        if needed <= max_width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            current_width = needed;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }

        if width <= max_width {
            current.push_str(word);
            current_width = width;
        } else {
            for c in word.chars() {
                let w = face.char_width(c);
                if current_width + w > max_width && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0;
                }
                current.push(c);
                current_width += w;
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn write_pdf(
    pages: &[Vec<PlacedLine>],
    face: &FontFace,
    config: &ConversionConfig,
) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = face.add_to(&mut doc);

    let width = i64::from(config.page_size.width_pt());
    let height = i64::from(config.page_size.height_pt());
    let margin = i64::from(config.margin_pt);
    let font_size = i64::from(config.font_size_pt);

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for lines in pages {
        let mut operations = Vec::with_capacity(lines.len() * 5);
        for line in lines {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec![FONT_KEY.into(), font_size.into()]));
            operations.push(Operation::new("Td", vec![margin.into(), line.y.into()]));
            operations.push(Operation::new("Tj", vec![face.encode(&line.text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations }.encode()?;
        let content_id = doc.add_object(lopdf::Stream::new(dictionary! {}, content));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { FONT_KEY => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let page_total = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_total,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = info_dictionary(&mut doc, config.document_title.as_deref());
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn info_dictionary(doc: &mut Document, title: Option<&str>) -> ObjectId {
    let mut info = dictionary! {
        "Producer" => Object::string_literal("horizon-convert"),
    };
    if let Some(title) = title {
        info.set("Title", lopdf::text_string(title));
    }
    doc.add_object(info)
}

fn expand_tabs(text: &str) -> String {
    text.replace('\t', &" ".repeat(TAB_WIDTH))
}
