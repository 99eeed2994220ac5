//! Export orchestration
//!
//! Resolves a requested book for a principal, then hands it to the encoder
//! for the requested format. Transport framing (headers, filename) is derived
//! here so every front end names files the same way.

use crate::encoder::{BufferedEncoder, DocxEncoder, PdfEncoder, StreamingEncoder};
use crate::error::{QuillError, Result};
use crate::storage::BookStore;
use crate::types::Book;
use crate::typography::TypographyProfile;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// How an encoder produces its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Whole document in memory, length known up front
    Buffered,
    /// Written incrementally, length unknown until the end
    Streamed,
}

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Docx,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 2] = [ExportFormat::Docx, ExportFormat::Pdf];

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn delivery(self) -> Delivery {
        match self {
            ExportFormat::Docx => Delivery::Buffered,
            ExportFormat::Pdf => Delivery::Streamed,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = QuillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "docx" => Ok(ExportFormat::Docx),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(QuillError::Validation(format!(
                "Unsupported export format: {}",
                other
            ))),
        }
    }
}

/// Replace every character outside `[A-Za-z0-9]` with `_`, one for one
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Response metadata for one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFraming {
    pub content_type: &'static str,
    pub filename: String,
}

impl ExportFraming {
    pub fn new(format: ExportFormat, title: &str) -> Self {
        Self {
            content_type: format.content_type(),
            filename: format!("{}.{}", sanitize_filename(title), format.extension()),
        }
    }

    /// Value for the `Content-Disposition` header
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename)
    }
}

/// The encoder behind each export format
#[derive(Clone)]
pub struct EncoderSet {
    pub docx: Arc<dyn BufferedEncoder>,
    pub pdf: Arc<dyn StreamingEncoder>,
}

impl Default for EncoderSet {
    fn default() -> Self {
        Self {
            docx: Arc::new(DocxEncoder::new()),
            pdf: Arc::new(PdfEncoder::new()),
        }
    }
}

impl EncoderSet {
    /// Render a book completely into memory
    pub fn render_buffered(
        &self,
        book: &Book,
        format: ExportFormat,
        profile: &TypographyProfile,
    ) -> Result<Vec<u8>> {
        let bytes = match format {
            ExportFormat::Docx => self.docx.encode(book, profile)?,
            ExportFormat::Pdf => {
                let mut buffer = Vec::new();
                self.pdf.encode(book, profile, &mut buffer)?;
                buffer
            }
        };
        Ok(bytes)
    }

    /// Render a book into `sink`, returning the number of bytes written
    ///
    /// Streamed formats write as pages complete; buffered formats are written
    /// in one piece once encoding has finished.
    pub fn render_streaming(
        &self,
        book: &Book,
        format: ExportFormat,
        profile: &TypographyProfile,
        sink: &mut dyn Write,
    ) -> Result<u64> {
        let mut counted = CountingWriter { inner: sink, count: 0 };
        match format.delivery() {
            Delivery::Streamed => self.pdf.encode(book, profile, &mut counted)?,
            Delivery::Buffered => {
                let bytes = self.render_buffered(book, format, profile)?;
                counted.write_all(&bytes).map_err(QuillError::Transport)?;
                counted.flush().map_err(QuillError::Transport)?;
            }
        }
        Ok(counted.count)
    }
}

/// Render a book completely into memory with the standard encoders
pub fn render_buffered(
    book: &Book,
    format: ExportFormat,
    profile: &TypographyProfile,
) -> Result<Vec<u8>> {
    EncoderSet::default().render_buffered(book, format, profile)
}

/// Render a book into `sink` with the standard encoders
pub fn render_streaming(
    book: &Book,
    format: ExportFormat,
    profile: &TypographyProfile,
    sink: &mut dyn Write,
) -> Result<u64> {
    EncoderSet::default().render_streaming(book, format, profile, sink)
}

struct CountingWriter<'a> {
    inner: &'a mut dyn Write,
    count: u64,
}

impl Write for CountingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Resolves books from a store and renders them with a shared profile
#[derive(Clone)]
pub struct Exporter {
    store: Arc<dyn BookStore>,
    profile: Arc<TypographyProfile>,
    encoders: EncoderSet,
}

impl Exporter {
    pub fn new(store: Arc<dyn BookStore>, profile: Arc<TypographyProfile>) -> Self {
        Self {
            store,
            profile,
            encoders: EncoderSet::default(),
        }
    }

    /// Replace the encoders used for rendering
    pub fn with_encoders(mut self, encoders: EncoderSet) -> Self {
        self.encoders = encoders;
        self
    }

    pub fn profile(&self) -> &TypographyProfile {
        &self.profile
    }

    /// Look up a book on behalf of `principal`
    ///
    /// The id is validated before the store is touched, and ownership is
    /// checked before any encoding can start.
    pub async fn resolve(&self, book_id: &str, principal: Uuid) -> Result<Book> {
        let id = Uuid::parse_str(book_id)
            .map_err(|_| QuillError::Validation(format!("Invalid book id: {}", book_id)))?;

        let book = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| QuillError::NotFound("Book not found".to_string()))?;

        if book.owner_id != principal {
            tracing::warn!(book_id = %id, principal = %principal, "Export denied: not the owner");
            return Err(QuillError::Forbidden(
                "Not authorized to export this book".to_string(),
            ));
        }

        Ok(book)
    }

    pub fn render_buffered(&self, book: &Book, format: ExportFormat) -> Result<Vec<u8>> {
        let started = std::time::Instant::now();
        let bytes = self.encoders.render_buffered(book, format, &self.profile)?;
        tracing::info!(
            book_id = %book.id,
            format = %format,
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Export rendered"
        );
        Ok(bytes)
    }

    pub fn render_streaming(
        &self,
        book: &Book,
        format: ExportFormat,
        sink: &mut dyn Write,
    ) -> Result<u64> {
        let started = std::time::Instant::now();
        match self
            .encoders
            .render_streaming(book, format, &self.profile, sink)
        {
            Ok(bytes) => {
                tracing::info!(
                    book_id = %book.id,
                    format = %format,
                    bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Export streamed"
                );
                Ok(bytes)
            }
            Err(e) => {
                tracing::warn!(book_id = %book.id, format = %format, error = %e, "Export aborted");
                Err(e)
            }
        }
    }
}
