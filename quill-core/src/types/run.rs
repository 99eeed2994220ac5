//! Rich-text runs: the format-agnostic blocks both encoders consume

use crate::typography::Role;
use serde::{Deserialize, Serialize};

/// What kind of block a run came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunKind {
    /// Heading, level 1 to 3
    Heading { level: u8 },

    Paragraph,

    /// Block quote
    Quote,

    /// One list item; grouping into lists is up to the encoder
    ListItem { ordered: bool },

    /// Single-line text without block structure (titles, author line)
    PlainText,
}

/// Inline emphasis style
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Bold,
    Italic,
}

/// A range of emphasized characters
///
/// `start` and `end` are char offsets into the run's visible text, `end` exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmphasisSpan {
    pub emphasis: Emphasis,
    pub start: usize,
    pub end: usize,
}

impl EmphasisSpan {
    pub fn new(emphasis: Emphasis, start: usize, end: usize) -> Self {
        Self {
            emphasis,
            start,
            end,
        }
    }

    fn covers(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }
}

/// A uniformly styled slice of a run's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl Segment {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }
}

/// One block of chapter text with its inline emphasis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RichTextRun {
    pub kind: RunKind,

    /// Visible text with emphasis delimiters removed
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<EmphasisSpan>,
}

impl RichTextRun {
    pub fn new(kind: RunKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            spans: Vec::new(),
        }
    }

    /// Attach emphasis spans
    pub fn with_spans(mut self, spans: Vec<EmphasisSpan>) -> Self {
        self.spans = spans;
        self
    }

    /// Typography role used to style this run
    pub fn role(&self) -> Role {
        match self.kind {
            RunKind::Heading { level: 1 } => Role::Heading1,
            RunKind::Heading { level: 2 } => Role::Heading2,
            RunKind::Heading { .. } => Role::Heading3,
            _ => Role::Body,
        }
    }

    /// True when the run has nothing visible to render
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Split the text into uniformly styled pieces, in order
    pub fn segments(&self) -> Vec<Segment> {
        let chars: Vec<char> = self.text.chars().collect();
        let len = chars.len();

        let mut bounds = vec![0, len];
        for span in &self.spans {
            bounds.push(span.start.min(len));
            bounds.push(span.end.min(len));
        }
        bounds.sort_unstable();
        bounds.dedup();

        let mut segments: Vec<Segment> = Vec::new();
        for pair in bounds.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if start == end {
                continue;
            }
            let bold = self.has(Emphasis::Bold, start, end);
            let italic = self.has(Emphasis::Italic, start, end);
            let text: String = chars[start..end].iter().collect();

            match segments.last_mut() {
                Some(last) if last.bold == bold && last.italic == italic => {
                    last.text.push_str(&text)
                }
                _ => segments.push(Segment { text, bold, italic }),
            }
        }
        segments
    }

    fn has(&self, emphasis: Emphasis, start: usize, end: usize) -> bool {
        self.spans
            .iter()
            .any(|s| s.emphasis == emphasis && s.covers(start, end))
    }
}
