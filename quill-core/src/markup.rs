//! Markup normalizer
//!
//! Turns a chapter's lightweight markup into [`RichTextRun`]s. The grammar is
//! deliberately small: `#`/`##`/`###` headings, `> ` quotes, `- ` and `1. `
//! list items, blank-line separated paragraphs, and `**bold**` / `*italic*`
//! emphasis. Anything that does not parse is kept as literal paragraph text,
//! so normalization never fails.

use crate::types::{Emphasis, EmphasisSpan, RichTextRun, RunKind};
use std::borrow::Cow;

/// Normalize a chapter's markup into runs, in source order
pub fn normalize(content: &str) -> Vec<RichTextRun> {
    let mut state = BlockState::default();

    for line in content.lines() {
        if line.trim().is_empty() {
            state.flush();
            continue;
        }
        state.push_line(classify(line));
    }
    state.flush();

    state.runs
}

/// Normalize a single line of text (a title, the author line) with emphasis only
pub fn normalize_inline(text: &str) -> RichTextRun {
    let text = scrub_controls(text);
    let (visible, spans) = parse_emphasis(text.trim());
    RichTextRun::new(RunKind::PlainText, visible).with_spans(spans)
}

/// Replace characters that XML 1.0 documents cannot carry with a space
///
/// Covers the C0 controls (tab and line breaks included), DEL and the
/// noncharacters U+FFFE/U+FFFF. Word pastes manual line breaks as U+000B.
pub fn scrub_controls(text: &str) -> Cow<'_, str> {
    fn is_unsafe(c: char) -> bool {
        c.is_ascii_control() || c == '\u{FFFE}' || c == '\u{FFFF}'
    }

    if text.chars().any(is_unsafe) {
        Cow::Owned(
            text.chars()
                .map(|c| if is_unsafe(c) { ' ' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    }
}

/// A classified source line
#[derive(Debug, PartialEq)]
enum Line<'a> {
    Heading(u8, &'a str),
    Quote(&'a str),
    Item { ordered: bool, text: &'a str },
    Text(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let line = line.trim_start();

    if let Some(rest) = line.strip_prefix("### ") {
        return Line::Heading(3, rest);
    }
    if let Some(rest) = line.strip_prefix("## ") {
        return Line::Heading(2, rest);
    }
    if let Some(rest) = line.strip_prefix("# ") {
        return Line::Heading(1, rest);
    }
    if let Some(rest) = line.strip_prefix("> ") {
        return Line::Quote(rest);
    }
    if line.trim_end() == ">" {
        return Line::Quote("");
    }
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Line::Item {
                ordered: false,
                text: rest,
            };
        }
    }

    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        if let Some(rest) = line[digits..].strip_prefix(". ") {
            return Line::Item {
                ordered: true,
                text: rest,
            };
        }
    }

    Line::Text(line)
}

/// Accumulates lines of the current block until it is flushed
#[derive(Default)]
struct BlockState<'a> {
    runs: Vec<RichTextRun>,
    pending: Option<(RunKind, Vec<&'a str>)>,
}

impl<'a> BlockState<'a> {
    fn push_line(&mut self, line: Line<'a>) {
        match line {
            Line::Heading(level, text) => {
                self.flush();
                self.emit(RunKind::Heading { level }, &[text]);
            }
            Line::Quote(text) => match &mut self.pending {
                Some((RunKind::Quote, lines)) => lines.push(text),
                _ => self.start(RunKind::Quote, text),
            },
            Line::Item { ordered, text } => self.start(RunKind::ListItem { ordered }, text),
            // Plain lines continue whatever block is open
            Line::Text(text) => match &mut self.pending {
                Some((_, lines)) => lines.push(text),
                None => self.start(RunKind::Paragraph, text),
            },
        }
    }

    fn start(&mut self, kind: RunKind, first: &'a str) {
        self.flush();
        self.pending = Some((kind, vec![first]));
    }

    fn flush(&mut self) {
        if let Some((kind, lines)) = self.pending.take() {
            self.emit(kind, &lines);
        }
    }

    fn emit(&mut self, kind: RunKind, lines: &[&str]) {
        let joined = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let (text, spans) = parse_emphasis(scrub_controls(&joined).trim());
        self.runs.push(RichTextRun::new(kind, text).with_spans(spans));
    }
}

/// A piece of inline text awaiting delimiter matching
enum Piece {
    Text(String),
    Delim(usize),
}

/// One emphasis delimiter: `*` (width 1) or `**` (width 2)
struct Delim {
    width: usize,
    partner: Option<usize>,
}

/// Strip matched `*`/`**` pairs and record them as spans over the visible text
///
/// A delimiter run may open only when followed by a non-space character and
/// close only when preceded by one. Closers match the innermost open
/// delimiter of the same width; anything left unmatched stays literal.
fn parse_emphasis(text: &str) -> (String, Vec<EmphasisSpan>) {
    let chars: Vec<char> = text.chars().collect();
    let mut pieces: Vec<Piece> = Vec::new();
    let mut delims: Vec<Delim> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '*' {
            let start = i;
            while i < chars.len() && chars[i] != '*' {
                i += 1;
            }
            pieces.push(Piece::Text(chars[start..i].iter().collect()));
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i] == '*' {
            i += 1;
        }
        let mut remaining = i - start;

        let before = start.checked_sub(1).map(|j| chars[j]);
        let after = chars.get(i).copied();
        let can_close = before.is_some_and(|c| !c.is_whitespace());
        let can_open = after.is_some_and(|c| !c.is_whitespace());

        if can_close {
            while let Some(&top) = open.last() {
                let width = delims[top].width;
                if width > remaining {
                    break;
                }
                open.pop();
                let closer = delims.len();
                delims.push(Delim {
                    width,
                    partner: Some(top),
                });
                delims[top].partner = Some(closer);
                pieces.push(Piece::Delim(closer));
                remaining -= width;
            }
        }

        if can_open {
            while remaining > 0 {
                let width = remaining.min(2);
                let opener = delims.len();
                delims.push(Delim {
                    width,
                    partner: None,
                });
                open.push(opener);
                pieces.push(Piece::Delim(opener));
                remaining -= width;
            }
        }

        if remaining > 0 {
            pieces.push(Piece::Text("*".repeat(remaining)));
        }
    }

    let mut visible = String::with_capacity(text.len());
    let mut offset = 0;
    let mut opened_at = vec![0usize; delims.len()];
    let mut spans = Vec::new();

    for piece in pieces {
        match piece {
            Piece::Text(t) => {
                offset += t.chars().count();
                visible.push_str(&t);
            }
            Piece::Delim(idx) => match delims[idx].partner {
                None => {
                    offset += delims[idx].width;
                    visible.push_str(&"*".repeat(delims[idx].width));
                }
                Some(partner) if partner > idx => opened_at[idx] = offset,
                Some(partner) => {
                    let emphasis = if delims[idx].width == 2 {
                        Emphasis::Bold
                    } else {
                        Emphasis::Italic
                    };
                    spans.push(EmphasisSpan::new(emphasis, opened_at[partner], offset));
                }
            },
        }
    }

    spans.sort_by_key(|s| (s.start, s.end));
    (visible, spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn render(runs: &[RichTextRun]) -> String {
        runs.iter()
            .map(|run| {
                let spans: String = run
                    .spans
                    .iter()
                    .map(|s| format!(" {:?}[{}..{}]", s.emphasis, s.start, s.end))
                    .collect();
                format!("{:?} {:?}{}", run.kind, run.text, spans)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_classify_prefixes() {
        assert_eq!(classify("### Deep"), Line::Heading(3, "Deep"));
        assert_eq!(classify("## Mid"), Line::Heading(2, "Mid"));
        assert_eq!(classify("# Top"), Line::Heading(1, "Top"));
        assert_eq!(classify("#NoSpace"), Line::Text("#NoSpace"));
        assert_eq!(classify("> said"), Line::Quote("said"));
        assert_eq!(
            classify("- item"),
            Line::Item {
                ordered: false,
                text: "item"
            }
        );
        assert_eq!(
            classify("12. twelfth"),
            Line::Item {
                ordered: true,
                text: "twelfth"
            }
        );
        assert_eq!(classify("12.5 percent"), Line::Text("12.5 percent"));
        assert_eq!(classify("**bold** start"), Line::Text("**bold** start"));
    }

    #[test]
    fn test_normalize_chapter() {
        let content = "# Intro\n\
                       \n\
                       Hello **world**.\n\
                       \n\
                       > A *quoted* line\n\
                       > continues here\n\
                       \n\
                       - first\n\
                       - second\n\
                       1. one\n\
                       2. two\n\
                       ### Deep\n\
                       Trailing text";

        insta::assert_snapshot!(render(&normalize(content)), @r###"
        Heading { level: 1 } "Intro"
        Paragraph "Hello world." Bold[6..11]
        Quote "A quoted line continues here" Italic[2..8]
        ListItem { ordered: false } "first"
        ListItem { ordered: false } "second"
        ListItem { ordered: true } "one"
        ListItem { ordered: true } "two"
        Heading { level: 3 } "Deep"
        Paragraph "Trailing text"
        "###);
    }

    #[test]
    fn test_paragraph_lines_are_joined() {
        let runs = normalize("first line\nsecond line\r\n\r\nnext paragraph");
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "first line second line");
        assert_eq!(runs[1].text, "next paragraph");
    }

    #[test]
    fn test_list_item_continuation() {
        let runs = normalize("- an item\n  that wraps\n- another");
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "an item that wraps");
        assert_eq!(runs[1].kind, RunKind::ListItem { ordered: false });
    }

    #[test]
    fn test_unmatched_delimiters_stay_literal() {
        let runs = normalize("**unclosed bold and *mixed* markers");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].kind, RunKind::Paragraph);
        assert_eq!(runs[0].text, "**unclosed bold and mixed markers");
        assert_eq!(
            runs[0].spans,
            vec![EmphasisSpan::new(Emphasis::Italic, 20, 25)]
        );
    }

    #[test]
    fn test_bold_italic_triple() {
        let (text, spans) = parse_emphasis("***both*** done");
        assert_eq!(text, "both done");
        assert_eq!(
            spans,
            vec![
                EmphasisSpan::new(Emphasis::Italic, 0, 4),
                EmphasisSpan::new(Emphasis::Bold, 0, 4),
            ]
        );
    }

    #[test]
    fn test_spaced_asterisks_are_not_emphasis() {
        let (text, spans) = parse_emphasis("2 * 3 * 4 and ** nothing **");
        assert_eq!(text, "2 * 3 * 4 and ** nothing **");
        assert!(spans.is_empty());
    }

    #[test]
    fn test_normalize_inline() {
        let run = normalize_inline("  The *Real* Story ");
        assert_eq!(run.kind, RunKind::PlainText);
        assert_eq!(run.text, "The Real Story");
        assert_eq!(run.spans, vec![EmphasisSpan::new(Emphasis::Italic, 4, 8)]);
    }

    #[test]
    fn test_control_characters_become_spaces() {
        let runs = normalize("Line one\u{0B}line two\u{0C}.");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Line one line two .");

        let run = normalize_inline("Title\u{0}\tPart\u{FFFF}");
        assert_eq!(run.text, "Title  Part");
        assert!(matches!(scrub_controls("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_empty_content() {
        assert!(normalize("").is_empty());
        assert!(normalize("\n\n   \n").is_empty());
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(content in "[a-z#>*\\-1. \n]{0,200}") {
            prop_assert_eq!(normalize(&content), normalize(&content));
        }

        #[test]
        fn prop_runs_hold_no_control_characters(content in "[a-z*#> \n\u{0}-\u{1f}]{0,200}") {
            for run in normalize(&content) {
                prop_assert!(!run.text.chars().any(|c| c.is_ascii_control()));
            }
        }

        #[test]
        fn prop_text_without_delimiters_is_preserved(text in "[a-zA-Z0-9,.!? ]{1,80}") {
            let (visible, spans) = parse_emphasis(&text);
            prop_assert_eq!(visible, text);
            prop_assert!(spans.is_empty());
        }

        #[test]
        fn prop_spans_stay_inside_text(text in "[a-z* ]{0,120}") {
            let (visible, spans) = parse_emphasis(&text);
            let len = visible.chars().count();
            prop_assert!(len <= text.chars().count());
            for span in spans {
                prop_assert!(span.start < span.end);
                prop_assert!(span.end <= len);
            }
        }

        #[test]
        fn prop_only_asterisks_are_removed(text in "[a-z* ]{0,120}") {
            let (visible, _) = parse_emphasis(&text);
            let strip = |s: &str| s.chars().filter(|c| *c != '*').collect::<String>();
            prop_assert_eq!(strip(&visible), strip(&text));
        }
    }
}
