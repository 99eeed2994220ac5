//! Chapter type representing a single chapter of a book

use serde::{Deserialize, Serialize};

/// A single chapter of a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    /// Chapter title
    pub title: String,

    /// Short summary shown in the editor; not exported
    #[serde(default)]
    pub description: Option<String>,

    /// Lightweight markup source
    #[serde(default)]
    pub content: String,
}

impl Chapter {
    /// Create a new chapter with a title and no content
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            content: String::new(),
        }
    }

    /// Set the markup content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the chapter has any non-whitespace content
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
