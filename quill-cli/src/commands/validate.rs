use super::load_book;
use anyhow::{bail, Result};
use clap::Args;
use quill_core::types::IssueSeverity;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Book JSON file
    pub input: PathBuf,

    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let book = load_book(&args.input)?;
    let issues = book.validate();

    let mut failing = 0;
    for issue in &issues {
        let label = match issue.severity {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
        };
        eprintln!("{}: {}", label, issue.message);

        if args.strict || issue.severity == IssueSeverity::Error {
            failing += 1;
        }
    }

    if failing > 0 {
        bail!(
            "Validation failed for {} ({} problems)",
            args.input.display(),
            failing
        );
    }

    println!("Valid book file");
    println!("  Title: {}", book.title);
    println!("  Chapters: {}", book.chapters.len());
    Ok(())
}
