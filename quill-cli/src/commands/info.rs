use super::load_book;
use anyhow::Result;
use clap::Args;
use quill_core::markup::normalize;
use quill_core::Book;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// Book JSON file
    pub input: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct BookSummary {
    id: String,
    title: String,
    subtitle: Option<String>,
    author: String,
    chapters: Vec<ChapterSummary>,
}

#[derive(Serialize)]
struct ChapterSummary {
    title: String,
    blocks: usize,
    words: usize,
}

impl BookSummary {
    fn of(book: &Book) -> Self {
        let chapters = book
            .chapters
            .iter()
            .map(|chapter| {
                let runs = normalize(&chapter.content);
                ChapterSummary {
                    title: chapter.title.clone(),
                    blocks: runs.len(),
                    words: runs.iter().map(|r| r.text.split_whitespace().count()).sum(),
                }
            })
            .collect();

        Self {
            id: book.id.to_string(),
            title: book.title.clone(),
            subtitle: book.display_subtitle().map(String::from),
            author: book.author.clone(),
            chapters,
        }
    }

    fn print(&self) {
        println!("Title:    {}", self.title);
        if let Some(subtitle) = &self.subtitle {
            println!("Subtitle: {}", subtitle);
        }
        println!("Author:   {}", self.author);
        println!("Chapters: {}", self.chapters.len());
        for (n, chapter) in self.chapters.iter().enumerate() {
            println!(
                "  {:>3}. {} ({} blocks, {} words)",
                n + 1,
                chapter.title,
                chapter.blocks,
                chapter.words
            );
        }
    }
}

pub fn run(args: InfoArgs) -> Result<()> {
    let summary = BookSummary::of(&load_book(&args.input)?);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print();
    }
    Ok(())
}
