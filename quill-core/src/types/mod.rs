//! Core types for the Quill export pipeline

mod book;
mod chapter;
mod run;

pub use book::{Book, IssueSeverity, ValidationIssue};
pub use chapter::Chapter;
pub use run::{Emphasis, EmphasisSpan, RichTextRun, RunKind, Segment};
