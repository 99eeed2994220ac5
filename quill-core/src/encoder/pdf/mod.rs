//! PDF encoder implementation
//!
//! Pages are laid out one at a time and written to the sink as soon as they
//! are full. Text is set in the standard 14 fonts with WinAnsi encoding, so
//! nothing is embedded.
//!
//! Each page's content stream is assembled as lopdf operations. The object
//! framing and cross-reference table are written by `writer::ObjectWriter`,
//! because `lopdf::Document` only serializes a finished document.

mod fonts;
mod layout;
mod writer;

use super::{chapter_runs, Alignment, ListMarkers, StreamingEncoder};
use crate::error::ConversionError;
use crate::markup::normalize_inline;
use crate::types::{Book, RichTextRun, RunKind};
use crate::typography::{Role, TypographyProfile};
use fonts::Face;
use layout::{break_lines, split_words, Line};
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use std::io::{self, Write};
use std::mem;
use writer::{utf16_hex, ObjectWriter};

/// Line height as a multiple of the font size
const LINE_HEIGHT: f32 = 1.2;
/// Left indent for quotes and list items (720 twips)
const BLOCK_INDENT: f32 = 36.0;
/// Distance a list marker hangs left of the item text (360 twips)
const MARKER_HANG: f32 = 18.0;

/// Page geometry in points
#[derive(Debug, Clone, Copy, PartialEq)]
struct PageConfig {
    width: f32,
    height: f32,
    margin: f32,
}

impl PageConfig {
    /// US Letter with 50pt margins
    fn letter() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin: 50.0,
        }
    }

    fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::letter()
    }
}

/// Encoder for PDF documents
pub struct PdfEncoder {
    page: PageConfig,
}

impl PdfEncoder {
    pub fn new() -> Self {
        Self {
            page: PageConfig::default(),
        }
    }

    fn write_document(
        &self,
        book: &Book,
        profile: &TypographyProfile,
        sink: &mut dyn Write,
    ) -> io::Result<()> {
        let mut doc = PdfDocument::begin(sink, &self.page, profile, book)?;

        doc.start_page()?;
        doc.write_line(Role::Title, Alignment::Center, &book.title)?;
        if let Some(subtitle) = book.display_subtitle() {
            doc.write_line(Role::Subtitle, Alignment::Center, subtitle)?;
        }
        doc.write_line(Role::AuthorLine, Alignment::Center, &book.author_line())?;

        for chapter in &book.chapters {
            doc.start_page()?;
            doc.write_line(Role::ChapterTitle, Alignment::Left, &chapter.title)?;

            let mut markers = ListMarkers::default();
            for run in chapter_runs(chapter) {
                let marker = markers.next(run.kind);
                doc.write_run(&run, marker)?;
            }
        }

        doc.finish()
    }
}

impl Default for PdfEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingEncoder for PdfEncoder {
    fn encode(
        &self,
        book: &Book,
        profile: &TypographyProfile,
        sink: &mut dyn Write,
    ) -> Result<(), ConversionError> {
        self.write_document(book, profile, sink)
            .map_err(ConversionError::Sink)
    }
}

/// One paragraph ready for layout
struct Block {
    role: Role,
    alignment: Alignment,
    indent: f32,
    marker: Option<String>,
    /// Keep on the same page as the first line of the next block
    keep_with_next: bool,
    pieces: Vec<(Face, String)>,
}

/// Document being written; holds the current page only
struct PdfDocument<'a, W: Write> {
    writer: ObjectWriter<W>,
    page: &'a PageConfig,
    profile: &'a TypographyProfile,
    catalog: u32,
    pages_root: u32,
    info: u32,
    font_resources: String,
    page_ids: Vec<u32>,
    operations: Vec<Operation>,
    page_open: bool,
    at_top: bool,
    cursor: f32,
}

impl<'a, W: Write> PdfDocument<'a, W> {
    /// Write the header, info dictionary and fonts, then flush
    fn begin(
        out: W,
        page: &'a PageConfig,
        profile: &'a TypographyProfile,
        book: &Book,
    ) -> io::Result<Self> {
        let mut writer = ObjectWriter::new(out);
        writer.write_header()?;

        let catalog = writer.reserve();
        let pages_root = writer.reserve();
        let info = writer.reserve();

        let info_dict = format!(
            "<< /Title {} /Author {} /Producer (Quill) /CreationDate ({}) >>",
            utf16_hex(&book.title),
            utf16_hex(&book.author),
            book.created_at.format("D:%Y%m%d%H%M%SZ")
        );
        writer.write_object(info, info_dict.as_bytes())?;

        let mut font_resources = String::new();
        for face in Face::ALL {
            let id = writer.reserve();
            let dict = format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                face.base_font()
            );
            writer.write_object(id, dict.as_bytes())?;
            font_resources.push_str(&format!("/{} {} 0 R ", face.resource_name(), id));
        }
        writer.flush()?;

        Ok(Self {
            writer,
            page,
            profile,
            catalog,
            pages_root,
            info,
            font_resources,
            page_ids: Vec::new(),
            operations: Vec::new(),
            page_open: false,
            at_top: true,
            cursor: 0.0,
        })
    }

    /// Close the open page, if any, and begin a fresh one
    fn start_page(&mut self) -> io::Result<()> {
        if self.page_open {
            self.finish_page()?;
        }
        self.operations.clear();
        self.page_open = true;
        self.at_top = true;
        self.cursor = self.page.height - self.page.margin;
        Ok(())
    }

    /// Write the page's content stream and page object, then flush
    fn finish_page(&mut self) -> io::Result<()> {
        let content = Content {
            operations: mem::take(&mut self.operations),
        };
        let data = content
            .encode()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        let contents = self.writer.reserve();
        let page_id = self.writer.reserve();

        self.writer.write_stream(contents, &data)?;
        let dict = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources << /Font << {}>> >> /Contents {} 0 R >>",
            self.pages_root,
            self.page.width,
            self.page.height,
            self.font_resources,
            contents
        );
        self.writer.write_object(page_id, dict.as_bytes())?;
        self.writer.flush()?;

        self.page_ids.push(page_id);
        self.page_open = false;
        Ok(())
    }

    /// Write the page tree, catalog and cross-reference table
    fn finish(mut self) -> io::Result<()> {
        if self.page_open {
            self.finish_page()?;
        }

        let kids: Vec<String> = self.page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        let pages = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            self.page_ids.len()
        );
        self.writer.write_object(self.pages_root, pages.as_bytes())?;
        let catalog = format!("<< /Type /Catalog /Pages {} 0 R >>", self.pages_root);
        self.writer.write_object(self.catalog, catalog.as_bytes())?;

        let bytes = self.writer.position();
        let page_count = self.page_ids.len();
        self.writer.finish(self.catalog, self.info)?;
        tracing::debug!(pages = page_count, bytes, "PDF document written");
        Ok(())
    }

    /// A single-line element such as the title or a chapter heading
    fn write_line(&mut self, role: Role, alignment: Alignment, text: &str) -> io::Result<()> {
        let run = normalize_inline(text);
        let pieces = self.pieces(&run, role, false);
        self.write_block(&Block {
            role,
            alignment,
            indent: 0.0,
            marker: None,
            keep_with_next: false,
            pieces,
        })
    }

    fn write_run(&mut self, run: &RichTextRun, marker: Option<String>) -> io::Result<()> {
        let keep_with_next = matches!(run.kind, RunKind::Heading { .. });
        let (alignment, indent, italic) = match run.kind {
            RunKind::Heading { .. } => (Alignment::Left, 0.0, false),
            RunKind::Quote => (Alignment::Justify, BLOCK_INDENT, true),
            RunKind::ListItem { .. } => (Alignment::Left, BLOCK_INDENT, false),
            RunKind::Paragraph | RunKind::PlainText => (Alignment::Justify, 0.0, false),
        };
        let role = run.role();
        let pieces = self.pieces(run, role, italic);
        self.write_block(&Block {
            role,
            alignment,
            indent,
            marker,
            keep_with_next,
            pieces,
        })
    }

    fn pieces(&self, run: &RichTextRun, role: Role, force_italic: bool) -> Vec<(Face, String)> {
        let family = self.profile.style_for(role).font;
        run.segments()
            .into_iter()
            .map(|s| (Face::new(family, s.bold, s.italic || force_italic), s.text))
            .collect()
    }

    fn write_block(&mut self, block: &Block) -> io::Result<()> {
        let words = split_words(&block.pieces);
        if words.is_empty() {
            return Ok(());
        }

        let style = *self.profile.style_for(block.role);
        let size = f32::from(style.size_pt);
        let line_height = size * LINE_HEIGHT;
        let left = self.page.margin + block.indent;
        let max_width = self.page.content_width() - block.indent;

        if !self.at_top {
            self.cursor -= style.spacing_before_pt();
        }

        let lines = break_lines(words, max_width, size);
        let last = lines.len() - 1;

        if block.keep_with_next && !self.at_top {
            let body = self.profile.style_for(Role::Body);
            let next_line = body.spacing_before_pt() + f32::from(body.size_pt) * LINE_HEIGHT;
            let needed = lines.len() as f32 * line_height + style.spacing_after_pt() + next_line;
            if self.cursor - needed < self.page.margin {
                self.start_page()?;
            }
        }

        for (i, line) in lines.iter().enumerate() {
            if !self.at_top && self.cursor - line_height < self.page.margin {
                self.start_page()?;
            }

            let baseline = self.cursor - size;
            let slack = (max_width - line.width).max(0.0);
            let (x, word_spacing) = match block.alignment {
                Alignment::Center => (left + slack / 2.0, 0.0),
                Alignment::Justify if i < last && line.gaps() > 0 => {
                    (left, slack / line.gaps() as f32)
                }
                _ => (left, 0.0),
            };

            if i == 0 {
                if let Some(marker) = &block.marker {
                    let face = Face::new(style.font, false, false);
                    let words = split_words(&[(face, marker.clone())]);
                    let marker_line = Line {
                        words,
                        width: 0.0,
                    };
                    self.draw_line(&marker_line, left - MARKER_HANG, baseline, style.size_pt, 0.0);
                }
            }
            self.draw_line(line, x, baseline, style.size_pt, word_spacing);

            self.cursor -= line_height;
            self.at_top = false;
        }

        self.cursor -= style.spacing_after_pt();
        Ok(())
    }

    /// Emit one text object; each space belongs to the face of the word after it
    fn draw_line(&mut self, line: &Line, x: f32, baseline: f32, size_pt: u16, word_spacing: f32) {
        let ops = &mut self.operations;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                round2(x).into(),
                round2(baseline).into(),
            ],
        ));
        if word_spacing > 0.0 {
            ops.push(Operation::new("Tw", vec![round2(word_spacing).into()]));
        }

        let mut face: Option<Face> = None;
        let mut pending = Vec::new();
        for (i, word) in line.words.iter().enumerate() {
            for (j, fragment) in word.fragments.iter().enumerate() {
                if face != Some(fragment.face) {
                    show_text(ops, &mut pending);
                    ops.push(Operation::new(
                        "Tf",
                        vec![
                            Object::Name(fragment.face.resource_name().into_bytes()),
                            Object::Integer(i64::from(size_pt)),
                        ],
                    ));
                    face = Some(fragment.face);
                }
                if i > 0 && j == 0 {
                    pending.push(b' ');
                }
                pending.extend_from_slice(&fragment.bytes);
            }
        }
        show_text(ops, &mut pending);

        if word_spacing > 0.0 {
            ops.push(Operation::new("Tw", vec![Object::Integer(0)]));
        }
        ops.push(Operation::new("ET", vec![]));
    }
}

fn show_text(ops: &mut Vec<Operation>, pending: &mut Vec<u8>) {
    if pending.is_empty() {
        return;
    }
    let text = Object::String(mem::take(pending), StringFormat::Literal);
    ops.push(Operation::new("Tj", vec![text]));
}

/// Round a coordinate to two decimals
fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}
