//! DOCX encoder implementation
//!
//! The book is first laid out as a [`FlowDocument`], a small tree of styled
//! paragraphs, and then serialized to WordprocessingML inside an OPC zip
//! package.

use super::{chapter_runs, BufferedEncoder, ListMarkers};
use crate::error::ConversionError;
use crate::markup::{normalize_inline, scrub_controls};
use crate::types::{Book, RichTextRun, RunKind};
use crate::typography::{Role, TypographyProfile};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Write};

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// US Letter in twips
const PAGE_WIDTH: u32 = 12240;
const PAGE_HEIGHT: u32 = 15840;
/// 50pt margins, matching the PDF output
const PAGE_MARGIN: u32 = 1000;

const QUOTE_INDENT: Indent = Indent {
    left: 720,
    hanging: 0,
};
const LIST_INDENT: Indent = Indent {
    left: 720,
    hanging: 360,
};

/// Paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Justify,
}

impl Alignment {
    fn as_ooxml(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Justify => "both",
        }
    }
}

/// Paragraph indentation in twips
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indent {
    pub left: u32,
    pub hanging: u32,
}

/// A uniformly formatted piece of paragraph text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl FlowRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }
}

/// A styled paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowParagraph {
    pub role: Role,
    pub alignment: Alignment,
    pub indent: Option<Indent>,
    pub runs: Vec<FlowRun>,
}

impl FlowParagraph {
    /// Paragraph text with run boundaries removed
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// One element of the document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowElement {
    Paragraph(FlowParagraph),
    /// Forces the next paragraph onto a new page
    PageBreak,
}

/// The complete document tree for one book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowDocument {
    pub title: String,
    pub author: String,
    pub elements: Vec<FlowElement>,
}

impl FlowDocument {
    /// Lay out a book as a flow document
    pub fn from_book(book: &Book) -> Self {
        let mut doc = Self {
            title: book.title.clone(),
            author: book.author.clone(),
            elements: Vec::new(),
        };

        doc.push_line(Role::Title, Alignment::Center, &book.title);
        if let Some(subtitle) = book.display_subtitle() {
            doc.push_line(Role::Subtitle, Alignment::Center, subtitle);
        }
        doc.push_line(Role::AuthorLine, Alignment::Center, &book.author_line());

        for chapter in &book.chapters {
            doc.elements.push(FlowElement::PageBreak);
            doc.push_line(Role::ChapterTitle, Alignment::Left, &chapter.title);

            let mut markers = ListMarkers::default();
            for run in chapter_runs(chapter) {
                let marker = markers.next(run.kind);
                doc.push_run(&run, marker);
            }
        }

        doc
    }

    /// All paragraphs, in order
    pub fn paragraphs(&self) -> impl Iterator<Item = &FlowParagraph> {
        self.elements.iter().filter_map(|e| match e {
            FlowElement::Paragraph(p) => Some(p),
            FlowElement::PageBreak => None,
        })
    }

    fn push_line(&mut self, role: Role, alignment: Alignment, text: &str) {
        let run = normalize_inline(text);
        self.push_paragraph(FlowParagraph {
            role,
            alignment,
            indent: None,
            runs: flow_runs(&run, false),
        });
    }

    fn push_run(&mut self, run: &RichTextRun, marker: Option<String>) {
        let (alignment, indent, italic) = match run.kind {
            RunKind::Heading { .. } => (Alignment::Left, None, false),
            RunKind::Quote => (Alignment::Justify, Some(QUOTE_INDENT), true),
            RunKind::ListItem { .. } => (Alignment::Left, Some(LIST_INDENT), false),
            RunKind::Paragraph | RunKind::PlainText => (Alignment::Justify, None, false),
        };

        let mut runs = Vec::new();
        if let Some(marker) = marker {
            runs.push(FlowRun::plain(format!("{} ", marker)));
        }
        runs.extend(flow_runs(run, italic));

        self.push_paragraph(FlowParagraph {
            role: run.role(),
            alignment,
            indent,
            runs,
        });
    }

    /// Paragraphs with no visible text are dropped
    fn push_paragraph(&mut self, paragraph: FlowParagraph) {
        if paragraph.text().trim().is_empty() {
            return;
        }
        self.elements.push(FlowElement::Paragraph(paragraph));
    }
}

fn flow_runs(run: &RichTextRun, force_italic: bool) -> Vec<FlowRun> {
    run.segments()
        .into_iter()
        .map(|segment| FlowRun {
            text: segment.text,
            bold: segment.bold,
            italic: segment.italic || force_italic,
        })
        .collect()
}

/// Encoder for Office Open XML word processing documents
pub struct DocxEncoder;

impl DocxEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Serialize a flow document into a complete DOCX package
    pub fn package(
        &self,
        doc: &FlowDocument,
        book: &Book,
        profile: &TypographyProfile,
    ) -> Result<Vec<u8>, ConversionError> {
        let document = document_xml(doc, profile)?;
        let styles = styles_xml(profile)?;
        let core = core_props_xml(book)?;

        let parts: [(&str, &[u8]); 7] = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
            ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
            ("docProps/core.xml", &core),
            ("docProps/app.xml", APP_PROPS_XML.as_bytes()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
            ("word/document.xml", &document),
            ("word/styles.xml", &styles),
        ];

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        for (name, data) in parts {
            zip.start_file(name, options)?;
            zip.write_all(data).map_err(|e| {
                ConversionError::EncodingFailed(format!("Failed to write {}: {}", name, e))
            })?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

impl Default for DocxEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferedEncoder for DocxEncoder {
    fn encode(
        &self,
        book: &Book,
        profile: &TypographyProfile,
    ) -> Result<Vec<u8>, ConversionError> {
        let doc = FlowDocument::from_book(book);
        self.package(&doc, book, profile)
    }
}

/// Thin wrapper over the quick-xml writer for element-at-a-time output
struct XmlOut {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlOut {
    fn new() -> Result<Self, quick_xml::Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), quick_xml::Error> {
        let mut elem = BytesStart::new(name);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.writer.write_event(Event::Start(elem))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), quick_xml::Error> {
        let mut elem = BytesStart::new(name);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.writer.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), quick_xml::Error> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<(), quick_xml::Error> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), quick_xml::Error> {
        self.open(name, &[])?;
        self.text(text)?;
        self.close(name)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

fn document_xml(doc: &FlowDocument, profile: &TypographyProfile) -> Result<Vec<u8>, quick_xml::Error> {
    let mut xml = XmlOut::new()?;
    xml.open("w:document", &[("xmlns:w", NS_W), ("xmlns:r", NS_R)])?;
    xml.open("w:body", &[])?;

    let mut break_pending = false;
    for element in &doc.elements {
        match element {
            FlowElement::PageBreak => break_pending = true,
            FlowElement::Paragraph(paragraph) => {
                write_paragraph(&mut xml, paragraph, profile, break_pending)?;
                break_pending = false;
            }
        }
    }

    let width = PAGE_WIDTH.to_string();
    let height = PAGE_HEIGHT.to_string();
    let margin = PAGE_MARGIN.to_string();
    xml.open("w:sectPr", &[])?;
    xml.empty("w:pgSz", &[("w:w", &width), ("w:h", &height)])?;
    xml.empty(
        "w:pgMar",
        &[
            ("w:top", &margin),
            ("w:right", &margin),
            ("w:bottom", &margin),
            ("w:left", &margin),
            ("w:header", "720"),
            ("w:footer", "720"),
            ("w:gutter", "0"),
        ],
    )?;
    xml.close("w:sectPr")?;

    xml.close("w:body")?;
    xml.close("w:document")?;
    Ok(xml.finish())
}

fn write_paragraph(
    xml: &mut XmlOut,
    paragraph: &FlowParagraph,
    profile: &TypographyProfile,
    page_break_before: bool,
) -> Result<(), quick_xml::Error> {
    let style = profile.style_for(paragraph.role);
    let family = profile.family_for(paragraph.role);
    let before = style.spacing_before.to_string();
    let after = style.spacing_after.to_string();
    let size = style.half_points().to_string();

    xml.open("w:p", &[])?;

    // pPr children follow the schema order
    xml.open("w:pPr", &[])?;
    xml.empty("w:pStyle", &[("w:val", paragraph.role.style_id())])?;
    if is_heading(paragraph.role) {
        xml.empty("w:keepNext", &[])?;
    }
    if page_break_before {
        xml.empty("w:pageBreakBefore", &[])?;
    }
    xml.empty("w:spacing", &[("w:before", &before), ("w:after", &after)])?;
    if let Some(indent) = paragraph.indent {
        let left = indent.left.to_string();
        let hanging = indent.hanging.to_string();
        if indent.hanging > 0 {
            xml.empty("w:ind", &[("w:left", &left), ("w:hanging", &hanging)])?;
        } else {
            xml.empty("w:ind", &[("w:left", &left)])?;
        }
    }
    xml.empty("w:jc", &[("w:val", paragraph.alignment.as_ooxml())])?;
    xml.close("w:pPr")?;

    for run in &paragraph.runs {
        xml.open("w:r", &[])?;
        xml.open("w:rPr", &[])?;
        xml.empty(
            "w:rFonts",
            &[("w:ascii", family), ("w:hAnsi", family), ("w:cs", family)],
        )?;
        if run.bold {
            xml.empty("w:b", &[])?;
        }
        if run.italic {
            xml.empty("w:i", &[])?;
        }
        xml.empty("w:sz", &[("w:val", &size)])?;
        xml.empty("w:szCs", &[("w:val", &size)])?;
        xml.close("w:rPr")?;
        xml.open("w:t", &[("xml:space", "preserve")])?;
        xml.text(&run.text)?;
        xml.close("w:t")?;
        xml.close("w:r")?;
    }

    xml.close("w:p")
}

fn is_heading(role: Role) -> bool {
    matches!(
        role,
        Role::ChapterTitle | Role::Heading1 | Role::Heading2 | Role::Heading3
    )
}

fn outline_level(role: Role) -> Option<&'static str> {
    match role {
        Role::ChapterTitle => Some("0"),
        Role::Heading1 => Some("1"),
        Role::Heading2 => Some("2"),
        Role::Heading3 => Some("3"),
        _ => None,
    }
}

fn styles_xml(profile: &TypographyProfile) -> Result<Vec<u8>, quick_xml::Error> {
    let mut xml = XmlOut::new()?;
    xml.open("w:styles", &[("xmlns:w", NS_W)])?;

    let body = profile.style_for(Role::Body);
    let body_family = profile.family_for(Role::Body);
    let body_size = body.half_points().to_string();
    xml.open("w:docDefaults", &[])?;
    xml.open("w:rPrDefault", &[])?;
    xml.open("w:rPr", &[])?;
    xml.empty(
        "w:rFonts",
        &[
            ("w:ascii", body_family),
            ("w:hAnsi", body_family),
            ("w:cs", body_family),
        ],
    )?;
    xml.empty("w:sz", &[("w:val", &body_size)])?;
    xml.empty("w:szCs", &[("w:val", &body_size)])?;
    xml.close("w:rPr")?;
    xml.close("w:rPrDefault")?;
    xml.close("w:docDefaults")?;

    for role in Role::ALL {
        let style = profile.style_for(role);
        let family = profile.family_for(role);
        let before = style.spacing_before.to_string();
        let after = style.spacing_after.to_string();
        let size = style.half_points().to_string();

        let mut attrs = vec![("w:type", "paragraph"), ("w:styleId", role.style_id())];
        if role == Role::Body {
            attrs.push(("w:default", "1"));
        }
        xml.open("w:style", &attrs)?;
        xml.empty("w:name", &[("w:val", role.style_name())])?;
        if role != Role::Body {
            xml.empty("w:basedOn", &[("w:val", Role::Body.style_id())])?;
            xml.empty("w:next", &[("w:val", Role::Body.style_id())])?;
        }
        xml.empty("w:qFormat", &[])?;

        xml.open("w:pPr", &[])?;
        if is_heading(role) {
            xml.empty("w:keepNext", &[])?;
        }
        xml.empty("w:spacing", &[("w:before", &before), ("w:after", &after)])?;
        if let Some(level) = outline_level(role) {
            xml.empty("w:outlineLvl", &[("w:val", level)])?;
        }
        xml.close("w:pPr")?;

        xml.open("w:rPr", &[])?;
        xml.empty(
            "w:rFonts",
            &[("w:ascii", family), ("w:hAnsi", family), ("w:cs", family)],
        )?;
        xml.empty("w:sz", &[("w:val", &size)])?;
        xml.empty("w:szCs", &[("w:val", &size)])?;
        xml.close("w:rPr")?;

        xml.close("w:style")?;
    }

    xml.close("w:styles")?;
    Ok(xml.finish())
}

fn core_props_xml(book: &Book) -> Result<Vec<u8>, quick_xml::Error> {
    let created = book.created_at.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let modified = book.updated_at.format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let mut xml = XmlOut::new()?;
    xml.open(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    xml.text_element("dc:title", &scrub_controls(&book.title))?;
    xml.text_element("dc:creator", &scrub_controls(&book.author))?;
    xml.open("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")])?;
    xml.text(&created)?;
    xml.close("dcterms:created")?;
    xml.open("dcterms:modified", &[("xsi:type", "dcterms:W3CDTF")])?;
    xml.text(&modified)?;
    xml.close("dcterms:modified")?;
    xml.close("cp:coreProperties")?;
    Ok(xml.finish())
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const APP_PROPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>Quill</Application></Properties>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chapter;
    use uuid::Uuid;

    fn atlas() -> Book {
        Book::new(Uuid::new_v4(), "Atlas", "J. Doe")
            .with_subtitle("A Journey")
            .with_chapter(Chapter::new("Ch1").with_content("# Intro\n\nHello **world**."))
    }

    #[test]
    fn test_atlas_document_tree() {
        let doc = FlowDocument::from_book(&atlas());
        let elements = &doc.elements;
        assert_eq!(elements.len(), 7);

        let paragraph = |i: usize| match &elements[i] {
            FlowElement::Paragraph(p) => p.clone(),
            FlowElement::PageBreak => panic!("element {} is a page break", i),
        };

        assert_eq!(paragraph(0).role, Role::Title);
        assert_eq!(paragraph(0).text(), "Atlas");
        assert_eq!(paragraph(0).alignment, Alignment::Center);
        assert_eq!(paragraph(1).role, Role::Subtitle);
        assert_eq!(paragraph(1).text(), "A Journey");
        assert_eq!(paragraph(2).role, Role::AuthorLine);
        assert_eq!(paragraph(2).text(), "Author: J. Doe");
        assert_eq!(elements[3], FlowElement::PageBreak);
        assert_eq!(paragraph(4).role, Role::ChapterTitle);
        assert_eq!(paragraph(4).text(), "Ch1");
        assert_eq!(paragraph(5).role, Role::Heading1);
        assert_eq!(paragraph(5).text(), "Intro");

        let body = paragraph(6);
        assert_eq!(body.role, Role::Body);
        assert_eq!(
            body.runs,
            vec![
                FlowRun::plain("Hello "),
                FlowRun {
                    text: "world".to_string(),
                    bold: true,
                    italic: false,
                },
                FlowRun::plain("."),
            ]
        );
    }

    #[test]
    fn test_missing_subtitle_is_skipped() {
        let book = Book::new(Uuid::new_v4(), "Solo", "A. Writer");
        let doc = FlowDocument::from_book(&book);
        let roles: Vec<Role> = doc.paragraphs().map(|p| p.role).collect();
        assert_eq!(roles, vec![Role::Title, Role::AuthorLine]);
    }

    #[test]
    fn test_lists_and_quotes() {
        let book = Book::new(Uuid::new_v4(), "T", "A").with_chapter(
            Chapter::new("C").with_content("1. one\n2. two\n- dot\n\n> wise *words*"),
        );
        let doc = FlowDocument::from_book(&book);
        let paragraphs: Vec<&FlowParagraph> = doc.paragraphs().skip(3).collect();

        assert_eq!(paragraphs[0].text(), "1. one");
        assert_eq!(paragraphs[1].text(), "2. two");
        assert_eq!(paragraphs[2].text(), "\u{2022} dot");
        assert_eq!(paragraphs[2].indent, Some(LIST_INDENT));

        let quote = paragraphs[3];
        assert_eq!(quote.indent, Some(QUOTE_INDENT));
        assert!(quote.runs.iter().all(|r| r.italic));
        assert_eq!(quote.text(), "wise words");
    }

    #[test]
    fn test_every_chapter_gets_a_page_break() {
        let book = Book::new(Uuid::new_v4(), "T", "A")
            .with_chapter(Chapter::new("One"))
            .with_chapter(Chapter::new("Two").with_content("text"));
        let doc = FlowDocument::from_book(&book);
        let breaks = doc
            .elements
            .iter()
            .filter(|e| matches!(e, FlowElement::PageBreak))
            .count();
        assert_eq!(breaks, 2);
    }

    #[test]
    fn test_document_xml_marks_page_breaks_and_emphasis() {
        let profile = TypographyProfile::standard();
        let doc = FlowDocument::from_book(&atlas());
        let xml = String::from_utf8(document_xml(&doc, &profile).unwrap()).unwrap();

        assert_eq!(xml.matches("<w:pageBreakBefore/>").count(), 1);
        assert!(xml.contains(r#"<w:pStyle w:val="ChapterTitle"/><w:keepNext/><w:pageBreakBefore/>"#));
        assert!(xml.contains(r#"<w:b/><w:sz w:val="24"/>"#));
        assert!(xml.contains(r#"<w:sz w:val="64"/>"#));
        assert!(xml.contains(r#"<w:spacing w:before="400" w:after="300"/>"#));
    }

    #[test]
    fn test_text_is_escaped() {
        let profile = TypographyProfile::standard();
        let book = Book::new(Uuid::new_v4(), "Cats & <Dogs>", "A");
        let doc = FlowDocument::from_book(&book);
        let xml = String::from_utf8(document_xml(&doc, &profile).unwrap()).unwrap();
        assert!(xml.contains("Cats &amp; &lt;Dogs&gt;"));
    }

    #[test]
    fn test_encode_produces_zip_package() {
        let book = atlas();
        let bytes = DocxEncoder::new()
            .encode(&book, &TypographyProfile::standard())
            .unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "docProps/core.xml",
        ] {
            assert!(names.contains(&part), "missing {}", part);
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let book = atlas();
        let profile = TypographyProfile::standard();
        let encoder = DocxEncoder::new();
        assert_eq!(
            encoder.encode(&book, &profile).unwrap(),
            encoder.encode(&book, &profile).unwrap()
        );
    }
}
