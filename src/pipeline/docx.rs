//! DOCX reading and writing.
//!
//! A DOCX file is a ZIP package of XML parts. Text lives in the main
//! document part as `w:p` paragraphs made of `w:r` runs whose `w:t`
//! elements hold the characters.
//!
//! ## Reading
//!
//! The main part is located through the package relationships
//! (`_rels/.rels`), falling back to the conventional `word/document.xml`.
//! The XML is streamed with quick-xml; only the fields needed for plain text
//! are tracked:
//!
//! - `w:t` text inside a run is collected; field codes (`w:instrText`) and
//!   deleted text (`w:delText`) are ignored
//! - `w:tab` becomes `\t`, `w:br` / `w:cr` become `\n`
//! - `mc:Fallback` content duplicates its `mc:Choice` sibling and is skipped
//! - paragraphs nested in tables or text boxes are kept, in document order
//!
//! ## Writing
//!
//! The smallest package Word accepts: content types, package relationships,
//! the main document part and core properties.

use crate::config::ConversionConfig;
use crate::error::ConversionError;
use crate::format::Format;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::reader::Reader;
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const PACKAGE_RELS: &str = "_rels/.rels";
const DEFAULT_MAIN_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

// ── Reading ──────────────────────────────────────────────────────────────────

/// Extract the ordered paragraph texts of a DOCX package.
///
/// Empty paragraphs are returned as empty strings so paragraph order and
/// count match what a word processor shows.
pub fn read_paragraphs(
    bytes: &[u8],
    file_name: &str,
    max_expanded_bytes: u64,
) -> Result<Vec<String>, ConversionError> {
    let malformed = |detail: String| ConversionError::malformed(file_name, Format::Docx, detail);

    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| malformed(format!("not a ZIP container: {e}")))?;

    let main_part = read_part(&mut archive, PACKAGE_RELS, file_name, max_expanded_bytes)?
        .and_then(|rels| main_part_name(&rels))
        .unwrap_or_else(|| DEFAULT_MAIN_PART.to_string());
    debug!("DOCX main document part: {}", main_part);

    let xml = read_part(&mut archive, &main_part, file_name, max_expanded_bytes)?
        .ok_or_else(|| malformed(format!("package has no main document part '{main_part}'")))?;

    parse_paragraphs(&xml).map_err(malformed)
}

/// Read a package part as UTF-8, or `None` when it does not exist.
fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    file_name: &str,
    limit: u64,
) -> Result<Option<String>, ConversionError> {
    let mut part = match archive.by_name(name) {
        Ok(part) => part,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => {
            return Err(ConversionError::malformed(
                file_name,
                Format::Docx,
                format!("cannot open part '{name}': {e}"),
            ))
        }
    };

    let too_large = |size: u64| ConversionError::TooLarge {
        what: format!("DOCX part '{name}'"),
        size,
        limit,
    };
    if part.size() > limit {
        return Err(too_large(part.size()));
    }

    // The declared size can lie; cap what is actually inflated as well.
    let mut xml = String::new();
    (&mut part)
        .take(limit.saturating_add(1))
        .read_to_string(&mut xml)
        .map_err(|e| {
            ConversionError::malformed(file_name, Format::Docx, format!("cannot read part '{name}': {e}"))
        })?;
    if xml.len() as u64 > limit {
        return Err(too_large(xml.len() as u64));
    }
    Ok(Some(xml))
}

/// Target of the officeDocument relationship in `_rels/.rels`.
fn main_part_name(rels_xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(rels_xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut rel_type = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value().ok()?.into_owned();
                    match attr.key.as_ref() {
                        b"Type" => rel_type = Some(value),
                        b"Target" => target = Some(value),
                        _ => {}
                    }
                }
                if rel_type.is_some_and(|t| t.ends_with(OFFICE_DOCUMENT_REL)) {
                    return target.map(|t| t.trim_start_matches('/').to_string());
                }
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// Elements of the main document part that matter for plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Paragraph,
    Run,
    Text,
    Tab,
    Break,
    Fallback,
    Other,
}

fn classify(name: QName<'_>) -> Tag {
    let local = name.local_name();
    match name.prefix() {
        Some(p) if p.as_ref() == b"mc" => {
            if local.as_ref() == b"Fallback" {
                Tag::Fallback
            } else {
                Tag::Other
            }
        }
        Some(p) if p.as_ref() != b"w" => Tag::Other,
        _ => match local.as_ref() {
            b"p" => Tag::Paragraph,
            b"r" => Tag::Run,
            b"t" => Tag::Text,
            b"tab" => Tag::Tab,
            b"br" | b"cr" => Tag::Break,
            _ => Tag::Other,
        },
    }
}

/// Walk the main document XML and return paragraph texts in order.
fn parse_paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs: Vec<String> = Vec::new();
    // Slots of the open paragraphs. A text box nests a paragraph inside
    // another; the outer one keeps the slot it took when it opened.
    let mut open: Vec<usize> = Vec::new();
    let mut run_depth = 0usize;
    let mut fallback_depth = 0usize;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML error at byte {}: {e}", reader.buffer_position()))?;

        match event {
            Event::Start(e) => match classify(e.name()) {
                Tag::Fallback => fallback_depth += 1,
                _ if fallback_depth > 0 => {}
                Tag::Paragraph => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                Tag::Run => run_depth += 1,
                Tag::Text if run_depth > 0 => in_text = true,
                _ => {}
            },
            Event::End(e) => match classify(e.name()) {
                Tag::Fallback => fallback_depth = fallback_depth.saturating_sub(1),
                _ if fallback_depth > 0 => {}
                Tag::Paragraph => {
                    open.pop();
                }
                Tag::Run => run_depth = run_depth.saturating_sub(1),
                Tag::Text => in_text = false,
                _ => {}
            },
            Event::Empty(e) if fallback_depth == 0 => match classify(e.name()) {
                Tag::Paragraph => paragraphs.push(String::new()),
                Tag::Tab if run_depth > 0 => push_text(&mut paragraphs, &open, "\t"),
                Tag::Break if run_depth > 0 => push_text(&mut paragraphs, &open, "\n"),
                _ => {}
            },
            Event::Text(t) if in_text && fallback_depth == 0 => {
                let text = t.unescape().map_err(|e| format!("bad text entity: {e}"))?;
                push_text(&mut paragraphs, &open, &text);
            }
            Event::CData(t) if in_text && fallback_depth == 0 => {
                push_text(&mut paragraphs, &open, &String::from_utf8_lossy(&t));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !open.is_empty() {
        return Err(format!("{} unterminated paragraph(s)", open.len()));
    }
    Ok(paragraphs)
}

fn push_text(paragraphs: &mut [String], open: &[usize], text: &str) {
    if let Some(current) = open.last().and_then(|&slot| paragraphs.get_mut(slot)) {
        current.push_str(text);
    }
}

// ── Writing ──────────────────────────────────────────────────────────────────

const CONTENT_TYPES_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
    r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
    r#"</Types>"#
);

const PACKAGE_RELS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
    r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
    r#"</Relationships>"#
);

/// Build a DOCX package with one paragraph per entry of `paragraphs`.
pub fn write_document(
    paragraphs: &[String],
    config: &ConversionConfig,
) -> Result<Vec<u8>, ConversionError> {
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
        (PACKAGE_RELS, PACKAGE_RELS_XML.to_string()),
        (DEFAULT_MAIN_PART, document_xml(paragraphs, config)),
        ("docProps/core.xml", core_xml(config.document_title.as_deref())),
    ];

    let fail = |e: &dyn std::fmt::Display| ConversionError::encoding(Format::Docx, e);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, xml) in &parts {
        zip.start_file(*name, options).map_err(|e| fail(&e))?;
        zip.write_all(xml.as_bytes()).map_err(|e| fail(&e))?;
    }
    let cursor = zip.finish().map_err(|e| fail(&e))?;
    let bytes = cursor.into_inner();

    debug!(
        "Assembled DOCX: {} paragraphs → {} bytes",
        paragraphs.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// The main document part.
fn document_xml(paragraphs: &[String], config: &ConversionConfig) -> String {
    let mut body = String::with_capacity(paragraphs.iter().map(|p| p.len() + 64).sum());
    for paragraph in paragraphs {
        body.push_str(&paragraph_xml(paragraph));
    }

    // Page geometry in twentieths of a point.
    let twips = |pt: u32| pt.saturating_mul(20);
    let margin = twips(config.margin_pt);

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            "<w:body>{body}",
            r#"<w:sectPr><w:pgSz w:w="{w}" w:h="{h}"/>"#,
            r#"<w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}" w:header="720" w:footer="720" w:gutter="0"/>"#,
            "</w:sectPr></w:body></w:document>"
        ),
        body = body,
        w = twips(config.page_size.width_pt()),
        h = twips(config.page_size.height_pt()),
        m = margin,
    )
}

/// One `w:p`, splitting tabs and line breaks into their own elements.
fn paragraph_xml(text: &str) -> String {
    let text = xml_safe(text);
    if text.is_empty() {
        return "<w:p/>".to_string();
    }

    let mut run = String::from("<w:p><w:r>");
    let mut segment = String::new();
    let flush = |run: &mut String, segment: &mut String| {
        if !segment.is_empty() {
            run.push_str(r#"<w:t xml:space="preserve">"#);
            run.push_str(&escape(segment.as_str()));
            run.push_str("</w:t>");
            segment.clear();
        }
    };

    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(&mut run, &mut segment);
                run.push_str("<w:tab/>");
            }
            '\n' => {
                flush(&mut run, &mut segment);
                run.push_str("<w:br/>");
            }
            c => segment.push(c),
        }
    }
    flush(&mut run, &mut segment);
    run.push_str("</w:r></w:p>");
    run
}

/// Core properties part carrying the optional title.
fn core_xml(title: Option<&str>) -> String {
    let title = title
        .map(|t| format!("<dc:title>{}</dc:title>", escape(xml_safe(t).as_str())))
        .unwrap_or_default();
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "{title}<dc:creator>horizon-convert</dc:creator></cp:coreProperties>"
        ),
        title = title
    )
}

/// Drop characters XML 1.0 cannot carry; CR becomes a line break.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\r' => Some('\n'),
            '\t' | '\n' => Some(c),
            c if (c as u32) < 0x20 => None,
            '\u{FFFE}' | '\u{FFFF}' => None,
            c => Some(c),
        })
        .collect()
}
