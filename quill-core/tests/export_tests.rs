//! End-to-end export tests for quill-core
//!
//! Books go through the public API only: normalize, lay out, encode, and then
//! the produced documents are opened again and inspected.

use quick_xml::events::Event;
use quick_xml::Reader;
use quill_core::encoder::{FlowDocument, FlowElement, PLACEHOLDER_TEXT};
use quill_core::export::{render_buffered, render_streaming};
use quill_core::{
    Book, BookStore, Chapter, ExportFormat, Exporter, MemoryBookStore, QuillError, Role,
    TypographyProfile,
};
use std::io::{Cursor, Read};
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// Helpers
// =============================================================================

fn atlas() -> Book {
    Book::new(Uuid::new_v4(), "Atlas", "J. Doe")
        .with_subtitle("Maps of Everything")
        .with_chapter(Chapter::new("Ch1").with_content("# Intro\n\nHello **world**."))
}

/// A paragraph read back out of `word/document.xml`
#[derive(Debug, Default, PartialEq)]
struct DocxParagraph {
    style: String,
    page_break_before: bool,
    runs: Vec<(String, bool)>,
}

fn document_xml(docx: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

fn docx_paragraphs(docx: &[u8]) -> Vec<DocxParagraph> {
    let xml = document_xml(docx);
    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = DocxParagraph::default();
    let mut bold = false;

    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"w:p" => {
                current = DocxParagraph::default();
            }
            Event::Start(e) if e.name().as_ref() == b"w:r" => bold = false,
            Event::Empty(e) => match e.name().as_ref() {
                b"w:pStyle" => {
                    let attr = e.try_get_attribute("w:val").unwrap().unwrap();
                    current.style = attr.unescape_value().unwrap().into_owned();
                }
                b"w:pageBreakBefore" => current.page_break_before = true,
                b"w:b" => bold = true,
                _ => {}
            },
            Event::Text(t) => {
                let text = t.unescape().unwrap().into_owned();
                current.runs.push((text, bold));
            }
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                paragraphs.push(std::mem::take(&mut current));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    paragraphs
}

fn pdf_text(pdf: &[u8]) -> String {
    String::from_utf8_lossy(pdf).into_owned()
}

// =============================================================================
// Flow document
// =============================================================================

#[test]
fn test_atlas_flow_document() {
    let doc = FlowDocument::from_book(&atlas());

    let paragraphs: Vec<_> = doc.paragraphs().collect();
    let summary: Vec<(Role, String)> = paragraphs.iter().map(|p| (p.role, p.text())).collect();
    assert_eq!(
        summary,
        vec![
            (Role::Title, "Atlas".to_string()),
            (Role::Subtitle, "Maps of Everything".to_string()),
            (Role::AuthorLine, "Author: J. Doe".to_string()),
            (Role::ChapterTitle, "Ch1".to_string()),
            (Role::Heading1, "Intro".to_string()),
            (Role::Body, "Hello world.".to_string()),
        ]
    );

    // The page break sits between the author line and the chapter title
    assert!(matches!(doc.elements[3], FlowElement::PageBreak));

    let body = paragraphs[5];
    let runs: Vec<(&str, bool)> = body.runs.iter().map(|r| (r.text.as_str(), r.bold)).collect();
    assert_eq!(runs, vec![("Hello ", false), ("world", true), (".", false)]);
}

// =============================================================================
// DOCX
// =============================================================================

#[test]
fn test_atlas_docx_package() {
    let bytes = render_buffered(&atlas(), ExportFormat::Docx, &TypographyProfile::standard()).unwrap();
    let paragraphs = docx_paragraphs(&bytes);

    let styles: Vec<&str> = paragraphs.iter().map(|p| p.style.as_str()).collect();
    assert_eq!(
        styles,
        vec!["Title", "Subtitle", "AuthorLine", "ChapterTitle", "Heading1", "Normal"]
    );
    assert!(paragraphs[3].page_break_before);
    assert!(!paragraphs[4].page_break_before);
    assert_eq!(
        paragraphs[5].runs,
        vec![
            ("Hello ".to_string(), false),
            ("world".to_string(), true),
            (".".to_string(), false)
        ]
    );
}

#[test]
fn test_docx_core_properties() {
    let bytes = render_buffered(&atlas(), ExportFormat::Docx, &TypographyProfile::standard()).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut core = String::new();
    archive
        .by_name("docProps/core.xml")
        .unwrap()
        .read_to_string(&mut core)
        .unwrap();

    assert!(core.contains("<dc:title>Atlas</dc:title>"));
    assert!(core.contains("<dc:creator>J. Doe</dc:creator>"));
}

#[test]
fn test_chapter_order_is_preserved() {
    let mut book = Book::new(Uuid::new_v4(), "Order", "Me");
    for i in 1..=5 {
        book.add_chapter(Chapter::new(format!("Ch{}", i)).with_content(format!("Body {}", i)));
    }
    let profile = TypographyProfile::standard();

    let paragraphs = docx_paragraphs(&render_buffered(&book, ExportFormat::Docx, &profile).unwrap());
    let titles: Vec<String> = paragraphs
        .iter()
        .filter(|p| p.style == "ChapterTitle")
        .map(|p| p.runs.iter().map(|(t, _)| t.as_str()).collect())
        .collect();
    assert_eq!(titles, vec!["Ch1", "Ch2", "Ch3", "Ch4", "Ch5"]);

    let pdf = pdf_text(&render_buffered(&book, ExportFormat::Pdf, &profile).unwrap());
    let positions: Vec<usize> = (1..=5)
        .map(|i| pdf.find(&format!("(Ch{}) Tj", i)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_empty_chapter_renders_placeholder() {
    let book = Book::new(Uuid::new_v4(), "Sparse", "Me")
        .with_chapter(Chapter::new("Nothing Here"))
        .with_chapter(Chapter::new("Something").with_content("Words."));
    let profile = TypographyProfile::standard();

    let paragraphs = docx_paragraphs(&render_buffered(&book, ExportFormat::Docx, &profile).unwrap());
    let chapter_title = paragraphs
        .iter()
        .position(|p| p.runs.first().map(|r| r.0.as_str()) == Some("Nothing Here"))
        .unwrap();
    assert_eq!(paragraphs[chapter_title + 1].runs[0].0, PLACEHOLDER_TEXT);
    assert_eq!(paragraphs[chapter_title + 1].style, "Normal");

    let pdf = pdf_text(&render_buffered(&book, ExportFormat::Pdf, &profile).unwrap());
    assert!(pdf.contains(&format!("({}) Tj", PLACEHOLDER_TEXT)));
}

#[test]
fn test_malformed_markup_still_exports() {
    let book = Book::new(Uuid::new_v4(), "Broken", "Me").with_chapter(
        Chapter::new("Mess").with_content("**unclosed\n\n### \n\n> \n\n* * *\n\n1.no space"),
    );
    let profile = TypographyProfile::standard();

    for format in ExportFormat::ALL {
        let bytes = render_buffered(&book, format, &profile).unwrap();
        assert!(!bytes.is_empty());
    }
    let paragraphs = docx_paragraphs(&render_buffered(&book, ExportFormat::Docx, &profile).unwrap());
    assert!(paragraphs
        .iter()
        .any(|p| p.runs.iter().any(|(t, _)| t.contains("**unclosed"))));
}

// =============================================================================
// PDF
// =============================================================================

#[test]
fn test_pdf_page_per_chapter() {
    let book = atlas().with_chapter(Chapter::new("Ch2").with_content("More."));
    let pdf = pdf_text(&render_buffered(&book, ExportFormat::Pdf, &TypographyProfile::standard()).unwrap());

    assert!(pdf.starts_with("%PDF-1.4"));
    assert_eq!(pdf.matches("/Type /Page /Parent").count(), 3);
    assert!(pdf.contains("(Author: J. Doe) Tj"));
    assert!(pdf.contains("/MediaBox [0 0 612 792]"));
}

fn zip_part(docx: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut bytes = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut bytes).unwrap();
    bytes
}

#[test]
fn test_control_characters_keep_docx_well_formed() {
    let book = Book::new(Uuid::new_v4(), "Pasted\u{0B}Title", "Ann\u{1}")
        .with_chapter(
            Chapter::new("Breaks\u{0C}Here").with_content("Line one\u{0B}line two\u{0C}."),
        );
    let profile = TypographyProfile::standard();
    let docx = render_buffered(&book, ExportFormat::Docx, &profile).unwrap();

    for part in ["word/document.xml", "docProps/core.xml"] {
        let bytes = zip_part(&docx, part);
        let illegal: Vec<u8> = bytes
            .iter()
            .copied()
            .filter(|b| *b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
            .collect();
        assert!(illegal.is_empty(), "illegal XML bytes in {}: {:?}", part, illegal);

        let mut reader = Reader::from_reader(bytes.as_slice());
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Eof => break,
                _ => buf.clear(),
            }
        }
    }

    let texts: Vec<String> = docx_paragraphs(&docx)
        .iter()
        .map(|p| p.runs.iter().map(|(t, _)| t.as_str()).collect())
        .collect();
    assert!(texts.contains(&"Pasted Title".to_string()));
    assert!(texts.contains(&"Line one line two .".to_string()));

    // PDF text sees the same spaces
    let pdf = pdf_text(&render_buffered(&book, ExportFormat::Pdf, &profile).unwrap());
    assert!(pdf.contains("(Breaks Here) Tj"));
}

#[test]
fn test_chapter_description_is_not_exported() {
    let book = Book::new(Uuid::new_v4(), "Notes", "Ann").with_chapter(
        Chapter::new("One")
            .with_description("Editor summary")
            .with_content("Body text."),
    );
    let profile = TypographyProfile::standard();

    let docx = render_buffered(&book, ExportFormat::Docx, &profile).unwrap();
    assert!(!document_xml(&docx).contains("Editor summary"));

    let pdf = pdf_text(&render_buffered(&book, ExportFormat::Pdf, &profile).unwrap());
    assert!(pdf.contains("(Body text.) Tj"));
    assert!(!pdf.contains("Editor summary"));
}

#[test]
fn test_streaming_matches_buffered_output() {
    let book = atlas();
    let profile = TypographyProfile::standard();

    let mut streamed = Vec::new();
    let written = render_streaming(&book, ExportFormat::Pdf, &profile, &mut streamed).unwrap();

    assert_eq!(written as usize, streamed.len());
    assert_eq!(streamed, render_buffered(&book, ExportFormat::Pdf, &profile).unwrap());
}

// =============================================================================
// Orchestration
// =============================================================================

#[tokio::test]
async fn test_foreign_book_is_refused_before_encoding() {
    let store = Arc::new(MemoryBookStore::new());
    let book = atlas();
    store.put(&book).await.unwrap();
    let exporter = Exporter::new(store, Arc::new(TypographyProfile::standard()));

    let mut sink = Vec::new();
    let result = match exporter.resolve(&book.id.to_string(), Uuid::new_v4()).await {
        Ok(found) => exporter
            .render_streaming(&found, ExportFormat::Pdf, &mut sink)
            .map(|_| ()),
        Err(e) => Err(e),
    };

    assert!(matches!(result, Err(QuillError::Forbidden(_))));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_owner_can_export_both_formats() {
    let store = Arc::new(MemoryBookStore::new());
    let book = atlas();
    store.put(&book).await.unwrap();
    let exporter = Exporter::new(store, Arc::new(TypographyProfile::standard()));

    let found = exporter
        .resolve(&book.id.to_string(), book.owner_id)
        .await
        .unwrap();
    let docx = exporter.render_buffered(&found, ExportFormat::Docx).unwrap();
    assert!(docx.starts_with(b"PK"));

    let mut pdf = Vec::new();
    exporter
        .render_streaming(&found, ExportFormat::Pdf, &mut pdf)
        .unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}
