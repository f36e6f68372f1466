//! Glyph selection tables.
//!
//! A [`LineSet`] is the family of glyphs a connection is drawn with and a
//! [`BoxChars`] the family a node border is drawn with. Both exist in a
//! Unicode and an ASCII rendition chosen by the configured
//! [`UnicodeLevel`]; every glyph in a set connects cleanly with the others
//! under the canvas merge rules.
use crate::config::UnicodeLevel;
use crate::diagram::{LineKind, NodeStyle, ShadowDensity};
use crate::geometry::Direction;

/// Glyphs used to draw connection paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSet {
    pub horizontal: char,
    pub vertical: char,
    /// Curved corners, indexed by the turn they render: `corner_tl` opens
    /// toward south-east (`╭`), and so on around the box.
    pub corner_tl: char,
    pub corner_tr: char,
    pub corner_bl: char,
    pub corner_br: char,
    pub arrow_up: char,
    pub arrow_down: char,
    pub arrow_left: char,
    pub arrow_right: char,
}

impl LineSet {
    pub const fn unicode() -> Self {
        Self {
            horizontal: '─',
            vertical: '│',
            corner_tl: '╭',
            corner_tr: '╮',
            corner_bl: '╰',
            corner_br: '╯',
            arrow_up: '▲',
            arrow_down: '▼',
            arrow_left: '◀',
            arrow_right: '▶',
        }
    }

    pub const fn ascii() -> Self {
        Self {
            horizontal: '-',
            vertical: '|',
            corner_tl: '+',
            corner_tr: '+',
            corner_bl: '+',
            corner_br: '+',
            arrow_up: '^',
            arrow_down: 'v',
            arrow_left: '<',
            arrow_right: '>',
        }
    }

    pub fn for_level(level: UnicodeLevel) -> Self {
        if level.has_box_drawing() {
            Self::unicode()
        } else {
            Self::ascii()
        }
    }

    /// Segment glyph pair `(horizontal, vertical)` for a stroke variant.
    /// ASCII terminals approximate every variant with the plain pair.
    pub fn stroke(&self, kind: LineKind) -> (char, char) {
        if self.horizontal == '-' {
            return (self.horizontal, self.vertical);
        }

        match kind {
            LineKind::Solid => (self.horizontal, self.vertical),
            LineKind::Dashed => ('╌', '╎'),
            LineKind::Dotted => ('┄', '┆'),
            LineKind::Thick => ('━', '┃'),
        }
    }

    pub fn arrow(&self, direction: Direction) -> char {
        match direction {
            Direction::Up => self.arrow_up,
            Direction::Down => self.arrow_down,
            Direction::Left => self.arrow_left,
            Direction::Right => self.arrow_right,
        }
    }
}

/// Glyphs used to draw a node border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxChars {
    pub top_left: char,
    pub top_right: char,
    pub bottom_left: char,
    pub bottom_right: char,
    pub horizontal: char,
    pub vertical: char,
}

impl BoxChars {
    pub const fn rounded() -> Self {
        Self {
            top_left: '╭',
            top_right: '╮',
            bottom_left: '╰',
            bottom_right: '╯',
            horizontal: '─',
            vertical: '│',
        }
    }

    pub const fn sharp() -> Self {
        Self {
            top_left: '┌',
            top_right: '┐',
            bottom_left: '└',
            bottom_right: '┘',
            horizontal: '─',
            vertical: '│',
        }
    }

    pub const fn double() -> Self {
        Self {
            top_left: '╔',
            top_right: '╗',
            bottom_left: '╚',
            bottom_right: '╝',
            horizontal: '═',
            vertical: '║',
        }
    }

    pub const fn ascii() -> Self {
        Self {
            top_left: '+',
            top_right: '+',
            bottom_left: '+',
            bottom_right: '+',
            horizontal: '-',
            vertical: '|',
        }
    }

    pub fn for_style(style: NodeStyle, level: UnicodeLevel) -> Self {
        if !level.has_box_drawing() {
            return Self::ascii();
        }

        match style {
            NodeStyle::Rounded => Self::rounded(),
            NodeStyle::Simple => Self::ascii(),
            NodeStyle::Double => Self::double(),
        }
    }
}

/// Fill glyph of a south-east drop shadow.
pub fn shadow_glyph(density: ShadowDensity) -> char {
    match density {
        ShadowDensity::Light => '░',
        ShadowDensity::Medium => '▒',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_selection() {
        assert_eq!(LineSet::for_level(UnicodeLevel::Full), LineSet::unicode());
        assert_eq!(
            LineSet::for_level(UnicodeLevel::Extended),
            LineSet::unicode()
        );
        assert_eq!(LineSet::for_level(UnicodeLevel::Basic), LineSet::ascii());
        assert_eq!(LineSet::for_level(UnicodeLevel::None), LineSet::ascii());
    }

    #[test]
    fn stroke_variants() {
        let lines = LineSet::unicode();
        assert_eq!(lines.stroke(LineKind::Solid), ('─', '│'));
        assert_eq!(lines.stroke(LineKind::Dashed), ('╌', '╎'));
        assert_eq!(lines.stroke(LineKind::Thick), ('━', '┃'));

        // ASCII approximates every variant with the plain pair.
        let lines = LineSet::ascii();
        assert_eq!(lines.stroke(LineKind::Dotted), ('-', '|'));
    }

    #[test]
    fn box_styles() {
        let simple = BoxChars::for_style(NodeStyle::Simple, UnicodeLevel::Full);
        assert_eq!(simple, BoxChars::ascii());

        let double = BoxChars::for_style(NodeStyle::Double, UnicodeLevel::Full);
        assert_eq!(double.top_left, '╔');

        // Without box drawing, every style degrades to ASCII.
        let double = BoxChars::for_style(NodeStyle::Double, UnicodeLevel::None);
        assert_eq!(double, BoxChars::ascii());
    }
}
