//! Quill CLI - render book records to DOCX or PDF without the server

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log encoder progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a book JSON file to DOCX or PDF
    Export(commands::ExportArgs),

    /// Show chapters and word counts for a book file
    Info(commands::InfoArgs),

    /// Check a book file for problems that would degrade an export
    Validate(commands::ValidateArgs),

    /// Export every book file in a directory
    Batch(commands::BatchArgs),
}

fn init_logging(verbose: bool) {
    let directives = if verbose {
        "quill_cli=debug,quill_core=debug"
    } else {
        "quill_cli=info,quill_core=warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(directives))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Export(args) => commands::export::run(args),
        Command::Info(args) => commands::info::run(args),
        Command::Validate(args) => commands::validate::run(args),
        Command::Batch(args) => commands::batch::run(args),
    }
}
