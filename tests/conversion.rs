//! Integration tests for horizon-convert.
//!
//! Fixtures are built in memory: DOCX packages with the `zip` crate from
//! hand-written WordprocessingML, PDFs with `lopdf` from hand-written content
//! streams. Nothing here touches the network.
//!
//! Run with:
//!   cargo test --test conversion -- --nocapture

use horizon_convert::pipeline::docx::read_paragraphs;
use horizon_convert::{
    convert, convert_async, convert_request, convert_to_file, inspect_file, ConversionConfig,
    ConversionError, ConversionProgressCallback, ConversionRequest, ErrorKind, Format,
    PageSeparator, UploadedDocument,
};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use zip::write::FileOptions;
use zip::ZipWriter;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A DOCX package with one `w:p` per entry, laid out the way Word writes it.
fn docx_fixture(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            if p.is_empty() {
                "<w:p/>".to_string()
            } else {
                format!(r#"<w:p><w:pPr><w:pStyle w:val="Normal"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{p}</w:t></w:r></w:p>"#)
            }
        })
        .collect();

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#.to_string(),
        ),
        (
            "word/document.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
            ),
        ),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, xml) in parts {
        zip.start_file(name, FileOptions::default()).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A PDF whose pages each show the given lines, one text object per line.
fn pdf_fixture(pages: &[&[&str]]) -> Vec<u8> {
    let contents: Vec<Vec<Operation>> = pages
        .iter()
        .map(|lines| {
            lines
                .iter()
                .enumerate()
                .flat_map(|(i, line)| {
                    let y = 700 - 20 * i as i64;
                    vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 12.into()]),
                        Operation::new("Td", vec![100.into(), y.into()]),
                        Operation::new("Tj", vec![literal(line.as_bytes())]),
                        Operation::new("ET", vec![]),
                    ]
                })
                .collect::<Vec<_>>()
        })
        .collect();
    pdf_from_content(contents)
}

/// A page the way word processors write one: a single text object, lines
/// advanced with `Td` / `T*`, kerned `TJ` arrays and WinAnsi accents.
fn producer_style_page() -> Vec<Operation> {
    let kerned = Object::Array(vec![
        literal(b"Net"),
        Object::Integer(-278),
        literal(b"r"),
        Object::Integer(15),
        literal(b"evenue"),
        Object::Real(-333.0),
        literal(b"up"),
    ]);
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![14.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
        Operation::new("Tj", vec![literal(b"Quarterly Report")]),
        Operation::new("Td", vec![0.into(), (-14).into()]),
        Operation::new("Tj", vec![literal(b"Second line")]),
        Operation::new("T*", vec![]),
        Operation::new("TJ", vec![kerned]),
        Operation::new("T*", vec![]),
        Operation::new("Tj", vec![literal(b"Caf\xE9 \x93menu\x94 \x96 5\x80")]),
        Operation::new("'", vec![literal(b"Last line")]),
        Operation::new("ET", vec![]),
    ]
}

fn literal(bytes: &[u8]) -> Object {
    Object::String(bytes.to_vec(), StringFormat::Literal)
}

/// Assemble a PDF with one page per content stream and Courier (WinAnsi)
/// as `/F1`.
fn pdf_from_content(pages: Vec<Vec<Operation>>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

fn extracted_text(pdf: &[u8]) -> String {
    let doc = UploadedDocument::new("roundtrip.pdf", pdf.to_vec()).unwrap();
    let out = convert(&doc, Format::Txt, &ConversionConfig::default()).unwrap();
    String::from_utf8(out.content).unwrap()
}

// ── Supported conversions ────────────────────────────────────────────────────

#[test]
fn test_pdf_to_txt_is_real_extraction() {
    init_tracing();
    let pdf = pdf_fixture(&[&["Quarterly Report 2024"]]);
    let doc = UploadedDocument::new("report.pdf", pdf).unwrap();

    let out = convert(&doc, Format::Txt, &ConversionConfig::default()).unwrap();
    assert_eq!(out.mime_type, "text/plain");
    assert_eq!(out.file_name, "converted_document.txt");
    assert_eq!(String::from_utf8(out.content).unwrap(), "Quarterly Report 2024");
    assert_eq!(out.stats.pages, 1);
    assert_eq!(out.stats.blocks, 1);
}

#[test]
fn test_pdf_to_txt_page_order_and_separator() {
    let pdf = pdf_fixture(&[&["first page", "second line"], &[], &["third page"]]);
    let doc = UploadedDocument::new("multi.pdf", pdf).unwrap();

    let config = ConversionConfig::builder()
        .page_separator(PageSeparator::FormFeed)
        .build()
        .unwrap();
    let out = convert(&doc, Format::Txt, &config).unwrap();
    assert_eq!(
        String::from_utf8(out.content).unwrap(),
        "first page\nsecond line\n\x0c\nthird page"
    );
    assert_eq!(out.stats.pages, 3);
    assert_eq!(out.stats.blocks, 3);
}

#[test]
fn test_pdf_to_txt_splits_lines_inside_one_text_object() {
    let pdf = pdf_from_content(vec![producer_style_page()]);
    let text = extracted_text(&pdf);
    assert_eq!(
        text,
        "Quarterly Report\nSecond line\nNet revenue up\nCafé “menu” – 5€\nLast line"
    );
    assert!(!text.contains("ReportSecond"));
}

#[test]
fn test_pdf_to_docx_block_per_line_of_a_text_object() {
    let pdf = pdf_from_content(vec![producer_style_page(), producer_style_page()]);
    let doc = UploadedDocument::new("producer.pdf", pdf).unwrap();

    let out = convert(&doc, Format::Docx, &ConversionConfig::default()).unwrap();
    assert_eq!(out.stats.pages, 2);
    assert_eq!(out.stats.blocks, 10);
    let paragraphs = read_paragraphs(&out.content, "out.docx", u64::MAX).unwrap();
    assert_eq!(paragraphs[..5], paragraphs[5..]);
    assert_eq!(paragraphs[2], "Net revenue up");
}

#[test]
fn test_pdf_to_docx_one_paragraph_per_block() {
    let pdf = pdf_fixture(&[&["Alpha", "Beta"], &["Gamma"]]);
    let doc = UploadedDocument::new("blocks.pdf", pdf).unwrap();

    let out = convert(&doc, Format::Docx, &ConversionConfig::default()).unwrap();
    assert_eq!(
        out.mime_type,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(out.file_name, "converted_document.docx");

    let paragraphs = read_paragraphs(&out.content, "out.docx", u64::MAX).unwrap();
    assert_eq!(paragraphs, vec!["Alpha", "Beta", "Gamma"]);
}

#[test]
fn test_docx_to_pdf_preserves_paragraph_order() {
    let docx = docx_fixture(&["Hello", "World"]);
    let doc = UploadedDocument::new("greeting.docx", docx).unwrap();

    let out = convert(&doc, Format::Pdf, &ConversionConfig::default()).unwrap();
    assert_eq!(out.mime_type, "application/pdf");
    assert!(Document::load_mem(&out.content).is_ok(), "output must parse as PDF");

    let text = extracted_text(&out.content);
    let hello = text.find("Hello").expect("Hello missing");
    let world = text.find("World").expect("World missing");
    assert!(hello < world, "order lost: {text:?}");
}

#[test]
fn test_docx_to_pdf_keeps_non_latin_text() {
    let source = ["Привет мир", "Καλημέρα κόσμε", "日本語のテキスト", "Zürich – “quoted”"];
    let doc = UploadedDocument::new("intl.docx", docx_fixture(&source)).unwrap();

    let out = convert(&doc, Format::Pdf, &ConversionConfig::default()).unwrap();
    assert_eq!(out.stats.blocks, 4);

    let text = extracted_text(&out.content);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, source);
}

#[test]
fn test_docx_to_pdf_long_document_paginates() {
    let lines: Vec<String> = (1..=120).map(|i| format!("Paragraph number {i}")).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let doc = UploadedDocument::new("long.docx", docx_fixture(&refs)).unwrap();

    let out = convert(&doc, Format::Pdf, &ConversionConfig::default()).unwrap();
    assert!(out.stats.pages > 1);
    assert_eq!(out.stats.blocks, 120);

    let text = extracted_text(&out.content);
    let extracted: Vec<&str> = text.lines().collect();
    assert_eq!(extracted, refs);
}

#[test]
fn test_docx_to_pdf_with_empty_body_yields_blank_page() {
    let doc = UploadedDocument::new("empty-body.docx", docx_fixture(&[])).unwrap();
    let out = convert(&doc, Format::Pdf, &ConversionConfig::default()).unwrap();
    assert_eq!(out.stats.pages, 1);
    assert_eq!(extracted_text(&out.content), "");
}

#[test]
fn test_file_name_override() {
    let doc = UploadedDocument::new("a.pdf", pdf_fixture(&[&["x"]])).unwrap();
    let request = ConversionRequest::new(doc, Format::Txt).with_file_name("../notes");
    let out = convert_request(&request, &ConversionConfig::default()).unwrap();
    assert_eq!(out.file_name, "notes.txt");
}

// ── Rejected requests ────────────────────────────────────────────────────────

fn sample_for(format: Format) -> Vec<u8> {
    match format {
        Format::Pdf => pdf_fixture(&[&["sample"]]),
        Format::Docx => docx_fixture(&["sample"]),
        Format::Txt => b"sample".to_vec(),
    }
}

#[test]
fn test_every_unsupported_pair_is_rejected() {
    let supported = [
        (Format::Docx, Format::Pdf),
        (Format::Pdf, Format::Txt),
        (Format::Pdf, Format::Docx),
    ];
    let config = ConversionConfig::default();

    for source in Format::ALL {
        for target in Format::ALL {
            let doc = UploadedDocument::with_format("input", source, sample_for(source));
            let result = convert(&doc, target, &config);
            if supported.contains(&(source, target)) {
                assert!(result.is_ok(), "{source} → {target} failed: {:?}", result.err());
            } else {
                let err = result.unwrap_err();
                assert_eq!(
                    err.kind(),
                    ErrorKind::UnsupportedConversion,
                    "{source} → {target} gave {err}"
                );
            }
        }
    }
}

#[test]
fn test_empty_input_for_every_format() {
    let config = ConversionConfig::default();
    for source in Format::ALL {
        for target in Format::ALL {
            let doc = UploadedDocument::with_format("empty", source, Vec::new());
            let err = convert(&doc, target, &config).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::EmptyInput, "{source} → {target}");
        }
    }
}

#[test]
fn test_corrupt_docx_is_malformed_not_a_crash() {
    let config = ConversionConfig::default();

    let junk = UploadedDocument::new("junk.docx", b"PK\x03\x04 definitely not a zip".to_vec()).unwrap();
    assert_eq!(
        convert(&junk, Format::Pdf, &config).unwrap_err().kind(),
        ErrorKind::MalformedInput
    );

    let full = docx_fixture(&["Hello", "World"]);
    let truncated = UploadedDocument::new("cut.docx", full[..full.len() / 2].to_vec()).unwrap();
    assert_eq!(
        convert(&truncated, Format::Pdf, &config).unwrap_err().kind(),
        ErrorKind::MalformedInput
    );
}

#[test]
fn test_corrupt_pdf_is_malformed() {
    let full = pdf_fixture(&[&["Quarterly Report 2024"]]);
    let truncated = UploadedDocument::new("cut.pdf", full[..40].to_vec()).unwrap();
    let err = convert(&truncated, Format::Txt, &ConversionConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn test_mislabelled_input_is_malformed() {
    let pdf_as_docx = UploadedDocument::new("report.docx", pdf_fixture(&[&["x"]])).unwrap();
    let err = convert(&pdf_as_docx, Format::Pdf, &ConversionConfig::default()).unwrap_err();
    assert!(matches!(err, ConversionError::MalformedInput { format: Format::Docx, .. }));
}

#[test]
fn test_oversized_input_is_too_large() {
    let config = ConversionConfig::builder().max_input_bytes(64).build().unwrap();
    let doc = UploadedDocument::new("big.pdf", pdf_fixture(&[&["x"]])).unwrap();
    assert_eq!(convert(&doc, Format::Txt, &config).unwrap_err().kind(), ErrorKind::TooLarge);
}

#[test]
fn test_unrecognised_extension_and_placeholder_target() {
    let err = UploadedDocument::new("sheet.xlsx", b"data".to_vec()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedConversion);

    let err = "Select".parse::<Format>().unwrap_err();
    assert_eq!(err, ConversionError::NoTargetSelected);
}

#[test]
fn test_failures_are_idempotent() {
    let config = ConversionConfig::default();
    let doc = UploadedDocument::new("bad.docx", b"PK\x03\x04garbage".to_vec()).unwrap();
    let first = convert(&doc, Format::Pdf, &config).unwrap_err();
    let second = convert(&doc, Format::Pdf, &config).unwrap_err();
    assert_eq!(first, second);
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Counter {
    starts: AtomicUsize,
    blocks: AtomicUsize,
    completes: AtomicUsize,
    errors: AtomicUsize,
}

impl ConversionProgressCallback for Counter {
    fn on_conversion_start(&self, _source: Format, _target: Format, _input_bytes: usize) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }
    fn on_extracted(&self, blocks: usize) {
        self.blocks.store(blocks, Ordering::SeqCst);
    }
    fn on_conversion_complete(&self, _output_bytes: usize) {
        self.completes.fetch_add(1, Ordering::SeqCst);
    }
    fn on_conversion_error(&self, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_progress_callback_sees_each_stage() {
    let counter = Arc::new(Counter::default());
    let config = ConversionConfig::builder()
        .progress_callback(counter.clone())
        .build()
        .unwrap();

    let doc = UploadedDocument::new("a.pdf", pdf_fixture(&[&["one", "two"]])).unwrap();
    convert(&doc, Format::Txt, &config).unwrap();
    let bad = UploadedDocument::new("a.txt", b"text".to_vec()).unwrap();
    convert(&bad, Format::Pdf, &config).unwrap_err();

    assert_eq!(counter.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counter.blocks.load(Ordering::SeqCst), 2);
    assert_eq!(counter.completes.load(Ordering::SeqCst), 1);
    assert_eq!(counter.errors.load(Ordering::SeqCst), 1);
}

// ── Concurrency and async entry points ───────────────────────────────────────

#[test]
fn test_concurrent_conversions_are_independent() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let line = format!("Document {i}");
                let doc = UploadedDocument::new("p.pdf", pdf_fixture(&[&[line.as_str()]])).unwrap();
                let out = convert(&doc, Format::Txt, &ConversionConfig::default()).unwrap();
                (line, String::from_utf8(out.content).unwrap())
            })
        })
        .collect();

    for handle in handles {
        let (expected, got) = handle.join().unwrap();
        assert_eq!(expected, got);
    }
}

#[tokio::test]
async fn test_convert_async() {
    let doc = UploadedDocument::new("in.docx", docx_fixture(&["Async", "works"])).unwrap();
    let out = convert_async(ConversionRequest::new(doc, Format::Pdf), &ConversionConfig::default())
        .await
        .unwrap();
    let text = extracted_text(&out.content);
    assert_eq!(text, "Async\nworks");
}

#[tokio::test]
async fn test_convert_to_file_writes_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("report.pdf");
    std::fs::write(&input, pdf_fixture(&[&["Quarterly Report 2024"]])).unwrap();
    let output = dir.path().join("nested/out/report.txt");

    let stats = convert_to_file(
        input.to_string_lossy(),
        &output,
        Format::Txt,
        &ConversionConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(stats.source, Format::Pdf);
    assert_eq!(stats.target, Format::Txt);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "Quarterly Report 2024");
    assert_eq!(stats.output_bytes, 21);

    // Only the output file is left behind.
    let leftovers: Vec<_> = std::fs::read_dir(output.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[tokio::test]
async fn test_failed_conversion_leaves_no_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.docx");
    std::fs::write(&input, b"PK\x03\x04broken").unwrap();
    let output = dir.path().join("broken.pdf");

    let err = convert_to_file(
        input.to_string_lossy(),
        &output,
        Format::Pdf,
        &ConversionConfig::default(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_inspect_file_counts_pages_and_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("two-pages.pdf");
    std::fs::write(&input, pdf_fixture(&[&["a", "b"], &["c"]])).unwrap();

    let info = inspect_file(input.to_string_lossy(), &ConversionConfig::default())
        .await
        .unwrap();
    assert_eq!(info.declared_format, Format::Pdf);
    assert_eq!(info.detected_format, Some(Format::Pdf));
    assert_eq!(info.pages, Some(2));
    assert_eq!(info.blocks, 3);
    assert_eq!(info.characters, 3);
}

#[tokio::test]
async fn test_inspect_missing_file() {
    let err = inspect_file("/no/such/file.pdf", &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ConversionError::FileNotFound { .. }));
}
