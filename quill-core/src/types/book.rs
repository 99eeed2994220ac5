//! The Book record handed to the export pipeline

use super::Chapter;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fully populated book record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    /// Unique identifier for this book
    pub id: Uuid,

    /// The user who owns this book
    pub owner_id: Uuid,

    pub title: String,

    #[serde(default)]
    pub subtitle: Option<String>,

    /// Author display name
    pub author: String,

    /// Stored upload name of the cover image
    #[serde(default)]
    pub cover_image: Option<String>,

    /// Ordered list of chapters
    #[serde(default)]
    pub chapters: Vec<Chapter>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Create a new book owned by `owner_id`
    pub fn new(owner_id: Uuid, title: impl Into<String>, author: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            subtitle: None,
            author: author.into(),
            cover_image: None,
            chapters: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the subtitle
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    /// Add a chapter to the book
    pub fn add_chapter(&mut self, chapter: Chapter) {
        self.chapters.push(chapter);
    }

    /// Builder-style variant of [`Book::add_chapter`]
    pub fn with_chapter(mut self, chapter: Chapter) -> Self {
        self.chapters.push(chapter);
        self
    }

    /// Subtitle, if present and not blank
    pub fn display_subtitle(&self) -> Option<&str> {
        self.subtitle
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// The centered line under the title
    pub fn author_line(&self) -> String {
        format!("Author: {}", self.author)
    }

    /// Check the record for problems that would make a poor export
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.title.trim().is_empty() {
            issues.push(ValidationIssue::error("book has no title"));
        }
        if self.author.trim().is_empty() {
            issues.push(ValidationIssue::error("book has no author"));
        }

        for (i, chapter) in self.chapters.iter().enumerate() {
            if chapter.title.trim().is_empty() {
                issues.push(ValidationIssue::error(format!(
                    "chapter {} has no title",
                    i + 1
                )));
            }
            if chapter.is_blank() {
                issues.push(ValidationIssue::warning(format!(
                    "chapter {} has no content",
                    i + 1
                )));
            }
        }

        issues
    }
}

/// How serious a validation issue is
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// A single problem found by [`Book::validate`]
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    pub message: String,
}

impl ValidationIssue {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
        }
    }
}
