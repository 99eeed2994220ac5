//! Encoders for rendering a book to document formats
//!
//! The two formats have different control flow. DOCX needs the whole package
//! before the zip directory can be written, so its encoder returns a buffer.
//! PDF pages can be emitted as soon as they are laid out, so that encoder
//! writes into a caller-supplied sink.

mod docx;
mod pdf;

pub use docx::{Alignment, DocxEncoder, FlowDocument, FlowElement, FlowParagraph, FlowRun, Indent};
pub use pdf::PdfEncoder;

use crate::error::ConversionError;
use crate::markup::normalize;
use crate::types::{Book, Chapter, RichTextRun, RunKind};
use crate::typography::TypographyProfile;
use std::io::Write;

/// Text used when a chapter has nothing to render
pub const PLACEHOLDER_TEXT: &str = "This chapter has no content yet.";

/// Encoder that builds the complete document in memory
pub trait BufferedEncoder: Send + Sync {
    /// Encode a book to a byte buffer
    fn encode(&self, book: &Book, profile: &TypographyProfile)
        -> Result<Vec<u8>, ConversionError>;
}

/// Encoder that writes incrementally to a sink
pub trait StreamingEncoder: Send + Sync {
    /// Encode a book into `sink`, flushing as output becomes available
    fn encode(
        &self,
        book: &Book,
        profile: &TypographyProfile,
        sink: &mut dyn Write,
    ) -> Result<(), ConversionError>;
}

/// Normalize a chapter for rendering
///
/// Blank runs are dropped; a chapter left with nothing gets one placeholder paragraph.
pub(crate) fn chapter_runs(chapter: &Chapter) -> Vec<RichTextRun> {
    let runs: Vec<RichTextRun> = normalize(&chapter.content)
        .into_iter()
        .filter(|run| !run.is_blank())
        .collect();

    if runs.is_empty() {
        vec![RichTextRun::new(RunKind::Paragraph, PLACEHOLDER_TEXT)]
    } else {
        runs
    }
}

/// Numbers list items as an encoder walks a chapter
///
/// Consecutive ordered items count up from 1; any other run resets the count.
#[derive(Debug, Default)]
pub(crate) struct ListMarkers {
    counter: usize,
}

impl ListMarkers {
    /// Marker to print before the run, if it is a list item
    pub(crate) fn next(&mut self, kind: RunKind) -> Option<String> {
        match kind {
            RunKind::ListItem { ordered: true } => {
                self.counter += 1;
                Some(format!("{}.", self.counter))
            }
            RunKind::ListItem { ordered: false } => {
                self.counter = 0;
                Some("\u{2022}".to_string())
            }
            _ => {
                self.counter = 0;
                None
            }
        }
    }
}
