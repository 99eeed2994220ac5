//! Quill Core Library
//!
//! This crate provides the data model and export pipeline for Quill books.
//! Chapter markup is normalized into rich text runs, styled through a shared
//! typography profile, and encoded to DOCX (buffered) or PDF (streamed).

pub mod encoder;
pub mod error;
pub mod export;
pub mod markup;
pub mod storage;
pub mod types;
pub mod typography;

pub use encoder::{BufferedEncoder, DocxEncoder, PdfEncoder, StreamingEncoder};
pub use error::{ConversionError, QuillError, Result, StorageError};
pub use export::{sanitize_filename, Delivery, EncoderSet, ExportFormat, ExportFraming, Exporter};
pub use storage::{BookStore, LocalBookStore, MemoryBookStore};
pub use types::{Book, Chapter, Emphasis, EmphasisSpan, RichTextRun, RunKind};
pub use typography::{Role, TypographyProfile};
