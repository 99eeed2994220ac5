use super::{load_book, parse_format};
use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use quill_core::export::render_streaming;
use quill_core::{ExportFormat, ExportFraming, TypographyProfile};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args)]
pub struct ExportArgs {
    /// Book JSON file
    pub input: PathBuf,

    /// Output file path (defaults to the sanitized title in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (docx, pdf)
    #[arg(short, long, default_value = "pdf", value_parser = parse_format)]
    pub format: ExportFormat,
}

pub fn run(args: ExportArgs) -> Result<()> {
    let ExportArgs {
        input,
        output,
        format,
    } = args;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message(format!("Reading {}", input.display()));
    let book = load_book(&input)?;
    tracing::debug!(chapters = book.chapters.len(), "loaded '{}'", book.title);

    let target = output.unwrap_or_else(|| ExportFraming::new(format, &book.title).filename.into());
    let file = File::create(&target)
        .with_context(|| format!("Failed to create output file: {}", target.display()))?;
    let mut writer = BufWriter::new(file);

    spinner.set_message(format!("Writing {}", format.extension().to_uppercase()));
    let profile = TypographyProfile::standard();
    let written = render_streaming(&book, format, &profile, &mut writer)
        .with_context(|| format!("Failed to export to {}", format))?;
    writer.flush()?;

    spinner.finish_with_message(format!("{} bytes -> {}", written, target.display()));
    Ok(())
}
