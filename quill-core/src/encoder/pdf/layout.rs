//! Word splitting and greedy line breaking

use super::fonts::{encode_win_ansi, Face};
use std::mem;

/// Slack for float error when comparing widths
const EPSILON: f32 = 0.01;

/// Encoded text in a single face
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Fragment {
    pub face: Face,
    pub bytes: Vec<u8>,
}

/// An unbreakable word, possibly mixing faces (`**bold**,` is one word)
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Word {
    pub fragments: Vec<Fragment>,
}

impl Word {
    pub(crate) fn width(&self, size: f32) -> f32 {
        self.fragments
            .iter()
            .map(|f| f.face.text_width(&f.bytes, size))
            .sum()
    }

    /// Width of the space set before this word, in the word's leading face
    pub(crate) fn space_width(&self, size: f32) -> f32 {
        self.fragments
            .first()
            .map(|f| f.face.text_width(b" ", size))
            .unwrap_or(0.0)
    }

    fn push(&mut self, face: Face, byte: u8) {
        match self.fragments.last_mut() {
            Some(last) if last.face == face => last.bytes.push(byte),
            _ => self.fragments.push(Fragment {
                face,
                bytes: vec![byte],
            }),
        }
    }

    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Break a word wider than `max_width` at glyph boundaries
    fn split_to_fit(self, max_width: f32, size: f32) -> Vec<Word> {
        if self.width(size) <= max_width + EPSILON {
            return vec![self];
        }

        let mut pieces = Vec::new();
        let mut current = Word::default();
        let mut current_width = 0.0;
        for fragment in self.fragments {
            for byte in fragment.bytes {
                let glyph = fragment.face.text_width(&[byte], size);
                if !current.is_empty() && current_width + glyph > max_width + EPSILON {
                    pieces.push(mem::take(&mut current));
                    current_width = 0.0;
                }
                current.push(fragment.face, byte);
                current_width += glyph;
            }
        }
        if !current.is_empty() {
            pieces.push(current);
        }
        pieces
    }
}

/// A laid-out line and its natural width, spaces included
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Line {
    pub words: Vec<Word>,
    pub width: f32,
}

impl Line {
    /// Number of inter-word spaces
    pub(crate) fn gaps(&self) -> usize {
        self.words.len().saturating_sub(1)
    }
}

/// Split styled text into words on whitespace
pub(crate) fn split_words(pieces: &[(Face, String)]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current = Word::default();

    for (face, text) in pieces {
        for byte in encode_win_ansi(text) {
            if byte == b' ' {
                if !current.is_empty() {
                    words.push(mem::take(&mut current));
                }
            } else {
                current.push(*face, byte);
            }
        }
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}

/// Fill lines greedily up to `max_width`
pub(crate) fn break_lines(words: Vec<Word>, max_width: f32, size: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();

    for word in words.into_iter().flat_map(|w| w.split_to_fit(max_width, size)) {
        let width = word.width(size);
        let mut gap = if line.words.is_empty() {
            0.0
        } else {
            word.space_width(size)
        };
        if !line.words.is_empty() && line.width + gap + width > max_width + EPSILON {
            lines.push(mem::take(&mut line));
            gap = 0.0;
        }
        line.width += gap + width;
        line.words.push(word);
    }
    if !line.words.is_empty() {
        lines.push(line);
    }

    lines
}
