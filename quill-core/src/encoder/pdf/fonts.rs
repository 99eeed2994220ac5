//! Standard-14 font faces, glyph metrics and WinAnsi text encoding

use crate::typography::FontRole;

/// Glyph widths (1/1000 em) for codes 32..=126, from the Adobe core font AFMs
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 930,
    722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944,
    722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
    333, 278, 333, 581, 500, 333,
    500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833,
    556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
    394, 220, 394, 520,
];

/// A concrete font face used on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Face {
    pub family: FontRole,
    pub bold: bool,
    pub italic: bool,
}

impl Face {
    pub(crate) const ALL: [Face; 8] = [
        Face::new(FontRole::Heading, false, false),
        Face::new(FontRole::Heading, true, false),
        Face::new(FontRole::Heading, false, true),
        Face::new(FontRole::Heading, true, true),
        Face::new(FontRole::Body, false, false),
        Face::new(FontRole::Body, true, false),
        Face::new(FontRole::Body, false, true),
        Face::new(FontRole::Body, true, true),
    ];

    pub(crate) const fn new(family: FontRole, bold: bool, italic: bool) -> Self {
        Self {
            family,
            bold,
            italic,
        }
    }

    pub(crate) fn index(self) -> usize {
        let family = match self.family {
            FontRole::Heading => 0,
            FontRole::Body => 4,
        };
        family + usize::from(self.bold) + 2 * usize::from(self.italic)
    }

    /// Name in the page resource dictionary
    pub(crate) fn resource_name(self) -> String {
        format!("F{}", self.index() + 1)
    }

    /// PostScript name of the standard font
    pub(crate) fn base_font(self) -> &'static str {
        match (self.family, self.bold, self.italic) {
            (FontRole::Heading, false, false) => "Helvetica",
            (FontRole::Heading, true, false) => "Helvetica-Bold",
            (FontRole::Heading, false, true) => "Helvetica-Oblique",
            (FontRole::Heading, true, true) => "Helvetica-BoldOblique",
            (FontRole::Body, false, false) => "Times-Roman",
            (FontRole::Body, true, false) => "Times-Bold",
            (FontRole::Body, false, true) => "Times-Italic",
            (FontRole::Body, true, true) => "Times-BoldItalic",
        }
    }

    // Italic faces are measured with their upright metrics. Exact for the
    // Helvetica obliques, within a few percent for Times.
    fn table(self) -> &'static [u16; 95] {
        match (self.family, self.bold) {
            (FontRole::Heading, false) => &HELVETICA,
            (FontRole::Heading, true) => &HELVETICA_BOLD,
            (FontRole::Body, false) => &TIMES_ROMAN,
            (FontRole::Body, true) => &TIMES_BOLD,
        }
    }

    /// Advance width of one WinAnsi code, in 1/1000 em
    pub(crate) fn glyph_width(self, code: u8) -> u16 {
        match code {
            32..=126 => self.table()[usize::from(code - 32)],
            _ => match self.family {
                FontRole::Heading => 556,
                FontRole::Body => 500,
            },
        }
    }

    /// Width of encoded text at `size` points
    pub(crate) fn text_width(self, bytes: &[u8], size: f32) -> f32 {
        let units: u32 = bytes.iter().map(|b| u32::from(self.glyph_width(*b))).sum();
        units as f32 * size / 1000.0
    }
}

/// Encode text as WinAnsi (Windows-1252); unmappable characters become `?`
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];

    for c in text.chars() {
        if c.is_ascii() {
            out.push(if c.is_ascii_control() { b' ' } else { c as u8 });
            continue;
        }
        let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if unmappable || bytes.len() != 1 {
            out.push(b'?');
        } else {
            out.push(bytes[0]);
        }
    }

    out
}
