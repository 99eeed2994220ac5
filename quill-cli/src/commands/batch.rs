//! Parallel export of a directory of book files

use super::{load_book, parse_format};
use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use quill_core::export::render_streaming;
use quill_core::{ExportFormat, TypographyProfile};
use rayon::prelude::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct BatchArgs {
    /// Directory of book JSON files
    pub input_dir: PathBuf,

    /// Directory to write exports into
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Output format (docx, pdf)
    #[arg(short, long, default_value = "pdf", value_parser = parse_format)]
    pub format: ExportFormat,

    /// Number of parallel jobs (must be at least 1)
    #[arg(short, long, default_value = "4", value_parser = parse_jobs)]
    pub jobs: usize,
}

fn parse_jobs(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("jobs must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid number", value)),
    }
}

fn book_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

pub fn run(args: BatchArgs) -> Result<()> {
    let files = book_files(&args.input_dir)?;
    if files.is_empty() {
        println!("No book files found in {}", args.input_dir.display());
        return Ok(());
    }
    fs::create_dir_all(&args.output_dir)?;
    println!("Found {} books to export", files.len());

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7}")?
            .progress_chars("##-"),
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs)
        .build()
        .context("Failed to start worker pool")?;
    let profile = TypographyProfile::standard();

    let failures: Vec<(&PathBuf, anyhow::Error)> = pool.install(|| {
        files
            .par_iter()
            .filter_map(|path| {
                let outcome = export_one(path, &args.output_dir, args.format, &profile);
                progress.inc(1);
                outcome.err().map(|e| (path, e))
            })
            .collect()
    });
    progress.finish_and_clear();

    for (path, err) in &failures {
        tracing::error!("Failed to export {}: {:#}", path.display(), err);
    }

    println!("\nBatch export complete:");
    println!("  Success: {}", files.len() - failures.len());
    println!("  Errors:  {}", failures.len());

    if !failures.is_empty() {
        bail!("Batch export completed with {} errors", failures.len());
    }
    Ok(())
}

/// Outputs are named after the input file so two books with the same title never collide
fn export_one(
    input: &Path,
    output_dir: &Path,
    format: ExportFormat,
    profile: &TypographyProfile,
) -> Result<()> {
    let book = load_book(input)?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Could not determine output filename from input")?;
    let target = output_dir.join(format!("{}.{}", stem, format.extension()));

    let mut writer = BufWriter::new(File::create(&target)?);
    let written = render_streaming(&book, format, profile, &mut writer)?;
    writer.flush()?;

    tracing::info!(bytes = written, "exported {} -> {}", input.display(), target.display());
    Ok(())
}
