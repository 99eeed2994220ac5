//! Shared typographic model
//!
//! Both encoders look up fonts, sizes and spacing here so a book exported to
//! DOCX and to PDF looks the same. Spacing is stored in twentieths of a point
//! (twips), the unit WordprocessingML uses; the PDF encoder divides by 20.

use serde::Serialize;

/// Semantic role of a paragraph
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Title,
    Subtitle,
    AuthorLine,
    ChapterTitle,
    Heading1,
    Heading2,
    Heading3,
    Body,
}

impl Role {
    pub const ALL: [Role; 8] = [
        Role::Title,
        Role::Subtitle,
        Role::AuthorLine,
        Role::ChapterTitle,
        Role::Heading1,
        Role::Heading2,
        Role::Heading3,
        Role::Body,
    ];

    fn index(self) -> usize {
        match self {
            Role::Title => 0,
            Role::Subtitle => 1,
            Role::AuthorLine => 2,
            Role::ChapterTitle => 3,
            Role::Heading1 => 4,
            Role::Heading2 => 5,
            Role::Heading3 => 6,
            Role::Body => 7,
        }
    }

    /// Paragraph style id used in `word/styles.xml`
    pub fn style_id(self) -> &'static str {
        match self {
            Role::Title => "Title",
            Role::Subtitle => "Subtitle",
            Role::AuthorLine => "AuthorLine",
            Role::ChapterTitle => "ChapterTitle",
            Role::Heading1 => "Heading1",
            Role::Heading2 => "Heading2",
            Role::Heading3 => "Heading3",
            Role::Body => "Normal",
        }
    }

    /// Human-readable style name
    pub fn style_name(self) -> &'static str {
        match self {
            Role::Title => "Title",
            Role::Subtitle => "Subtitle",
            Role::AuthorLine => "Author Line",
            Role::ChapterTitle => "Chapter Title",
            Role::Heading1 => "heading 1",
            Role::Heading2 => "heading 2",
            Role::Heading3 => "heading 3",
            Role::Body => "Normal",
        }
    }
}

/// Which font family a role is set in
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FontRole {
    Heading,
    Body,
}

/// Font, size and spacing for one role
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RoleStyle {
    pub font: FontRole,
    /// Point size
    pub size_pt: u16,
    /// Space above, in twips
    pub spacing_before: u16,
    /// Space below, in twips
    pub spacing_after: u16,
}

impl RoleStyle {
    const fn new(font: FontRole, size_pt: u16, spacing_before: u16, spacing_after: u16) -> Self {
        Self {
            font,
            size_pt,
            spacing_before,
            spacing_after,
        }
    }

    /// Size in half-points (`w:sz`)
    pub fn half_points(&self) -> u32 {
        u32::from(self.size_pt) * 2
    }

    pub fn spacing_before_pt(&self) -> f32 {
        f32::from(self.spacing_before) / 20.0
    }

    pub fn spacing_after_pt(&self) -> f32 {
        f32::from(self.spacing_after) / 20.0
    }
}

/// Font family names for the flow-document output
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FontFamilies {
    pub heading: String,
    pub body: String,
}

/// Immutable role → style table
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TypographyProfile {
    styles: [RoleStyle; 8],
    pub fonts: FontFamilies,
}

impl TypographyProfile {
    /// The house style shared by every export
    pub fn standard() -> Self {
        use FontRole::{Body, Heading};

        Self {
            styles: [
                RoleStyle::new(Heading, 32, 0, 300),   // title
                RoleStyle::new(Heading, 20, 0, 200),   // subtitle
                RoleStyle::new(Body, 18, 0, 800),      // author line
                RoleStyle::new(Heading, 24, 400, 300), // chapter title
                RoleStyle::new(Heading, 20, 300, 150), // h1
                RoleStyle::new(Heading, 18, 300, 150), // h2
                RoleStyle::new(Heading, 16, 300, 150), // h3
                RoleStyle::new(Body, 12, 200, 200),    // body
            ],
            fonts: FontFamilies {
                heading: "Inter".to_string(),
                body: "Charter".to_string(),
            },
        }
    }

    /// Style for a role
    pub fn style_for(&self, role: Role) -> &RoleStyle {
        &self.styles[role.index()]
    }

    /// Font family name for a role
    pub fn family_for(&self, role: Role) -> &str {
        match self.style_for(role).font {
            FontRole::Heading => &self.fonts.heading,
            FontRole::Body => &self.fonts.body,
        }
    }
}

impl Default for TypographyProfile {
    fn default() -> Self {
        Self::standard()
    }
}
