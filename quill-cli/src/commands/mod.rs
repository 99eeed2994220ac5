//! CLI command implementations

pub mod batch;
pub mod export;
pub mod info;
pub mod validate;

pub use batch::BatchArgs;
pub use export::ExportArgs;
pub use info::InfoArgs;
pub use validate::ValidateArgs;

use anyhow::{Context, Result};
use quill_core::{Book, ExportFormat};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read a book record from a JSON file
fn load_book(path: &Path) -> Result<Book> {
    let file =
        File::open(path).with_context(|| format!("Failed to open input file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse book file: {}", path.display()))
}

/// clap value parser for `--format`
fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse().map_err(|e: quill_core::QuillError| e.to_string())
}
