//! Character grid canvas.
//!
//! The canvas is a dense rectangle of code points with optional parallel
//! grids for per-cell foreground color and text style. Writes go through a
//! merge function so that crossing lines upgrade to junctions instead of
//! overwriting each other:
//!
//! ```svgbob
//!        │                │
//!    ────*────   =>   ────┼────
//!        │                │
//! ```
//!
//! Merging is modelled on connectivity arms: every box-drawing glyph owns a
//! set of the four directions it connects to, two glyphs merge to the glyph
//! owning the union of their arms, and a glyph without arms (text) never
//! displaces an occupied cell. Arrowheads dominate lines and are never
//! overwritten by them.
//!
//! Wide glyphs (East-Asian Wide, emoji) occupy two cells; the second holds a
//! continuation marker that serializes as a space.
use crate::charset::BoxChars;
use crate::color::{AnsiColor, TextStyle, SGR_RESET};
use crate::error::RenderError;
use crate::geometry::{Direction, Point};
use crate::width::char_width;
use std::fmt;

/// Sentinel stored in the cell after a wide glyph.
pub const CONTINUATION: char = '\0';

const EMPTY: char = ' ';

// Connectivity arms as a bit set.
const ARM_N: u8 = 0b0001;
const ARM_S: u8 = 0b0010;
const ARM_E: u8 = 0b0100;
const ARM_W: u8 = 0b1000;

/// The connection directions a glyph participates in, or `None` for glyphs
/// outside the single-stroke box-drawing repertoire (text, arrows, double
/// lines).
fn arms_of(c: char) -> Option<u8> {
    let arms = match c {
        '─' | '━' | '╌' | '┄' | '-' => ARM_E | ARM_W,
        '│' | '┃' | '╎' | '┆' | '|' => ARM_N | ARM_S,
        '┌' | '╭' => ARM_S | ARM_E,
        '┐' | '╮' => ARM_S | ARM_W,
        '└' | '╰' => ARM_N | ARM_E,
        '┘' | '╯' => ARM_N | ARM_W,
        '├' => ARM_N | ARM_S | ARM_E,
        '┤' => ARM_N | ARM_S | ARM_W,
        '┬' => ARM_S | ARM_E | ARM_W,
        '┴' => ARM_N | ARM_E | ARM_W,
        '┼' | '+' => ARM_N | ARM_S | ARM_E | ARM_W,
        _ => return None,
    };

    Some(arms)
}

/// Whether the glyph is one of the ASCII line/junction characters. A merge
/// of two ASCII glyphs stays ASCII.
fn is_ascii_line(c: char) -> bool {
    matches!(c, '-' | '|' | '+')
}

/// The glyph owning a set of connectivity arms.
fn glyph_for_arms(arms: u8, ascii: bool) -> char {
    if ascii {
        return match arms {
            0 => EMPTY,
            a if a == ARM_E | ARM_W || a == ARM_E || a == ARM_W => '-',
            a if a == ARM_N | ARM_S || a == ARM_N || a == ARM_S => '|',
            _ => '+',
        };
    }

    match arms {
        0 => EMPTY,
        a if a == ARM_N || a == ARM_S || a == ARM_N | ARM_S => '│',
        a if a == ARM_E || a == ARM_W || a == ARM_E | ARM_W => '─',
        a if a == ARM_S | ARM_E => '┌',
        a if a == ARM_S | ARM_W => '┐',
        a if a == ARM_N | ARM_E => '└',
        a if a == ARM_N | ARM_W => '┘',
        a if a == ARM_N | ARM_S | ARM_E => '├',
        a if a == ARM_N | ARM_S | ARM_W => '┤',
        a if a == ARM_S | ARM_E | ARM_W => '┬',
        a if a == ARM_N | ARM_E | ARM_W => '┴',
        _ => '┼',
    }
}

/// Whether the glyph is an arrowhead, Unicode or ASCII.
pub fn is_arrowhead(c: char) -> bool {
    matches!(c, '▶' | '◀' | '▲' | '▼' | '>' | '<' | '^' | 'v')
}

/// Merge a new glyph into an occupied cell.
///
/// Rules, in order: empty and identical cells are trivial; an arrowhead
/// always wins over whatever is under it and is never overwritten by a
/// line; otherwise the arm-set union decides; glyphs without arms leave the
/// existing cell alone.
pub fn merge_glyphs(existing: char, new: char) -> char {
    if existing == EMPTY || existing == CONTINUATION || existing == new {
        return new;
    }
    if is_arrowhead(new) {
        return new;
    }
    if is_arrowhead(existing) {
        return existing;
    }

    match (arms_of(existing), arms_of(new)) {
        (Some(a), Some(b)) => {
            let ascii = is_ascii_line(existing) && is_ascii_line(new);
            glyph_for_arms(a | b, ascii)
        }
        _ => existing,
    }
}

#[derive(Debug, Clone)]
pub struct Canvas {
    width: i32,
    height: i32,
    cells: Vec<char>,
    colors: Option<Vec<Option<AnsiColor>>>,
    styles: Option<Vec<TextStyle>>,
}

impl Canvas {
    pub fn new(width: i32, height: i32) -> Result<Self, RenderError> {
        if width <= 0 || height <= 0 {
            return Err(RenderError::InvalidSize { width, height });
        }

        let len = (width as usize) * (height as usize);
        Ok(Self {
            width,
            height,
            cells: vec![EMPTY; len],
            colors: None,
            styles: None,
        })
    }

    /// A canvas that additionally tracks per-cell color and style, for
    /// terminals where SGR output is wanted.
    pub fn with_color(width: i32, height: i32) -> Result<Self, RenderError> {
        let mut canvas = Self::new(width, height)?;
        let len = canvas.cells.len();

        canvas.colors = Some(vec![None; len]);
        canvas.styles = Some(vec![TextStyle::default(); len]);
        Ok(canvas)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Capability probe: renderers branch once on this, not per cell.
    pub fn supports_color(&self) -> bool {
        self.colors.is_some()
    }

    fn index(&self, p: &Point) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x >= self.width || p.y >= self.height {
            return None;
        }

        Some((p.y as usize) * (self.width as usize) + (p.x as usize))
    }

    /// Write a glyph through the merge function.
    pub fn set(&mut self, p: Point, ch: char) -> Result<(), RenderError> {
        let Some(i) = self.index(&p) else {
            return Err(RenderError::OutOfBounds(p));
        };

        self.cells[i] = merge_glyphs(self.cells[i], ch);
        Ok(())
    }

    /// Write a glyph bypassing the merge function. Labels use this: the
    /// merge table would preserve the line characters under them.
    pub fn set_raw(&mut self, p: Point, ch: char) -> Result<(), RenderError> {
        let Some(i) = self.index(&p) else {
            return Err(RenderError::OutOfBounds(p));
        };

        self.cells[i] = ch;
        Ok(())
    }

    /// The stored glyph, or a space for off-canvas reads. Never fails.
    pub fn get(&self, p: Point) -> char {
        match self.index(&p) {
            Some(i) => self.cells[i],
            None => EMPTY,
        }
    }

    /// Reset every cell to a space and drop all color/style assignments.
    pub fn clear(&mut self) {
        self.cells.fill(EMPTY);
        if let Some(colors) = &mut self.colors {
            colors.fill(None);
        }
        if let Some(styles) = &mut self.styles {
            styles.fill(TextStyle::default());
        }
    }

    /// Assign a foreground color to a cell. A no-op on plain canvases and
    /// off-canvas cells.
    pub fn set_color(&mut self, p: Point, color: AnsiColor) {
        if let (Some(i), Some(colors)) = (self.index(&p), self.colors.as_mut()) {
            colors[i] = Some(color);
        }
    }

    /// Assign a text style to a cell. A no-op on plain canvases and
    /// off-canvas cells.
    pub fn set_style(&mut self, p: Point, style: TextStyle) {
        if let (Some(i), Some(styles)) = (self.index(&p), self.styles.as_mut()) {
            styles[i] = style;
        }
    }

    /// Draw a horizontal run of `ch` from `x1` to `x2` inclusive (either
    /// order), clipped to the canvas, every cell merged.
    pub fn draw_horizontal_line(&mut self, x1: i32, y: i32, x2: i32, ch: char) {
        if y < 0 || y >= self.height {
            return;
        }

        let (lo, hi) = (x1.min(x2), x1.max(x2));
        for x in lo.max(0)..=hi.min(self.width - 1) {
            let _ = self.set(Point::new(x, y), ch);
        }
    }

    /// Draw a vertical run of `ch` from `y1` to `y2` inclusive (either
    /// order), clipped to the canvas, every cell merged.
    pub fn draw_vertical_line(&mut self, x: i32, y1: i32, y2: i32, ch: char) {
        if x < 0 || x >= self.width {
            return;
        }

        let (lo, hi) = (y1.min(y2), y1.max(y2));
        for y in lo.max(0)..=hi.min(self.height - 1) {
            let _ = self.set(Point::new(x, y), ch);
        }
    }

    /// Draw a box border: corners first, then the edge runs, all merged, so
    /// overlapping geometry resolves to junctions.
    pub fn draw_box(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        style: &BoxChars,
    ) -> Result<(), RenderError> {
        if x < 0 || y < 0 {
            return Err(RenderError::OutOfBounds(Point::new(x, y)));
        }
        if x + width > self.width || y + height > self.height {
            return Err(RenderError::OutOfBounds(Point::new(
                x + width - 1,
                y + height - 1,
            )));
        }

        let right = x + width - 1;
        let bottom = y + height - 1;

        self.set(Point::new(x, y), style.top_left)?;
        self.set(Point::new(right, y), style.top_right)?;
        self.set(Point::new(x, bottom), style.bottom_left)?;
        self.set(Point::new(right, bottom), style.bottom_right)?;

        self.draw_horizontal_line(x + 1, y, right - 1, style.horizontal);
        self.draw_horizontal_line(x + 1, bottom, right - 1, style.horizontal);
        self.draw_vertical_line(x, y + 1, bottom - 1, style.vertical);
        self.draw_vertical_line(right, y + 1, bottom - 1, style.vertical);

        Ok(())
    }

    /// Place a line of text starting at `(x, y)` using display widths:
    /// zero-width code points are skipped, wide glyphs take a cell plus a
    /// continuation marker, and a wide glyph that would straddle the right
    /// edge is dropped. Writes clip silently at the borders.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        let mut cx = x;

        for ch in text.chars() {
            match char_width(ch) {
                0 => continue,
                1 => {
                    let _ = self.set(Point::new(cx, y), ch);
                    cx += 1;
                }
                _ => {
                    // A wide glyph split across the right edge is dropped,
                    // but the cursor still advances.
                    if cx + 1 < self.width {
                        let _ = self.set(Point::new(cx, y), ch);
                        let _ = self.set(Point::new(cx + 1, y), CONTINUATION);
                    }
                    cx += 2;
                }
            }
        }
    }

    /// Recompute the box-drawing glyph a cell ought to hold from the
    /// connectivity of its four neighbours: a neighbour pointing an arm at
    /// this cell contributes the matching direction. Returns `None` when no
    /// neighbour connects.
    pub fn resolve_junction(&self, p: Point) -> Option<char> {
        let mut arms = 0u8;
        let mut ascii = true;
        let mut connected = 0;

        for (direction, arm, needed) in [
            (Direction::Up, ARM_N, ARM_S),
            (Direction::Down, ARM_S, ARM_N),
            (Direction::Left, ARM_W, ARM_E),
            (Direction::Right, ARM_E, ARM_W),
        ] {
            let neighbour = self.get(p.step(direction));
            if let Some(neighbour_arms) = arms_of(neighbour) {
                if neighbour_arms & needed != 0 {
                    arms |= arm;
                    connected += 1;
                    ascii &= is_ascii_line(neighbour);
                }
            }
        }

        if connected == 0 {
            return None;
        }

        Some(glyph_for_arms(arms, ascii))
    }

    /// Plain serialization: `height` rows joined by `\n`, no trailing
    /// newline. A continuation cell contributes nothing while its wide
    /// partner is intact (the glyph already spans both columns) and a
    /// space once the partner has been overwritten, so every row is
    /// exactly `width` terminal cells wide.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.height as usize);

        for y in 0..self.height {
            if y > 0 {
                out.push('\n');
            }
            for x in 0..self.width {
                let i = (y as usize) * (self.width as usize) + (x as usize);
                let ch = self.cells[i];

                if ch == CONTINUATION {
                    if x > 0 && char_width(self.cells[i - 1]) == 2 {
                        continue;
                    }
                    out.push(' ');
                } else {
                    out.push(ch);
                }
            }
        }

        out
    }

    /// Colored serialization: SGR sequences are emitted at cell transitions
    /// where color or style changes, with a reset at every change point and
    /// at end-of-line. Plain canvases serialize exactly like [`to_text`].
    ///
    /// [`to_text`]: Canvas::to_text
    pub fn to_ansi_text(&self) -> String {
        let (Some(colors), Some(styles)) = (&self.colors, &self.styles) else {
            return self.to_text();
        };

        let mut out = String::with_capacity(self.cells.len() * 2);

        for y in 0..self.height {
            if y > 0 {
                out.push('\n');
            }

            let mut active: (Option<AnsiColor>, TextStyle) = (None, TextStyle::default());
            for x in 0..self.width {
                let i = (y as usize) * (self.width as usize) + (x as usize);
                let ch = self.cells[i];

                // A continuation cell riding a live wide glyph emits
                // nothing, color transitions included.
                if ch == CONTINUATION && x > 0 && char_width(self.cells[i - 1]) == 2 {
                    continue;
                }

                let wanted = (colors[i], styles[i]);
                if wanted != active {
                    if active.0.is_some() || !active.1.is_plain() {
                        out.push_str(SGR_RESET);
                    }
                    if !wanted.1.is_plain() {
                        out.push_str(&wanted.1.sgr());
                    }
                    if let Some(color) = wanted.0 {
                        out.push_str(&color.sgr());
                    }
                    active = wanted;
                }

                out.push(if ch == CONTINUATION { ' ' } else { ch });
            }

            if active.0.is_some() || !active.1.is_plain() {
                out.push_str(SGR_RESET);
            }
        }

        out
    }
}

impl fmt::Display for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::BoxChars;
    use crate::color::NamedColor;
    use crate::width::display_width;

    #[test]
    fn invalid_size() {
        assert!(matches!(
            Canvas::new(0, 5),
            Err(RenderError::InvalidSize { .. })
        ));
        assert!(matches!(
            Canvas::new(5, -1),
            Err(RenderError::InvalidSize { .. })
        ));
    }

    #[test]
    fn set_get_round_trip() {
        let mut canvas = Canvas::new(4, 2).unwrap();

        canvas.set(Point::new(1, 1), 'x').unwrap();
        assert_eq!(canvas.get(Point::new(1, 1)), 'x');

        // Off-canvas reads never fail.
        assert_eq!(canvas.get(Point::new(9, 9)), ' ');
        assert_eq!(canvas.get(Point::new(-1, 0)), ' ');

        // Off-canvas writes do.
        assert!(matches!(
            canvas.set(Point::new(4, 0), 'x'),
            Err(RenderError::OutOfBounds(_))
        ));
    }

    #[test]
    fn merge_lines_to_junctions() {
        assert_eq!(merge_glyphs('─', '│'), '┼');
        assert_eq!(merge_glyphs('┌', '─'), '┬');
        assert_eq!(merge_glyphs('┌', '│'), '├');
        assert_eq!(merge_glyphs('┌', '┘'), '┼');
        assert_eq!(merge_glyphs('╭', '─'), '┬');
        assert_eq!(merge_glyphs('-', '|'), '+');
        assert_eq!(merge_glyphs('│', '├'), '├');
    }

    #[test]
    fn merge_is_commutative() {
        let glyphs = ['─', '│', '┌', '┐', '└', '┘', '├', '┤', '┬', '┴', '┼'];

        for a in glyphs {
            for b in glyphs {
                assert_eq!(
                    merge_glyphs(a, b),
                    merge_glyphs(b, a),
                    "merge of {} and {} is not commutative",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn text_never_displaces_occupied_cells() {
        assert_eq!(merge_glyphs('─', 'A'), '─');
        assert_eq!(merge_glyphs('A', '─'), 'A');
        assert_eq!(merge_glyphs('A', 'B'), 'A');
    }

    #[test]
    fn arrows_dominate() {
        // A line never overwrites an arrowhead.
        assert_eq!(merge_glyphs('▶', '─'), '▶');
        assert_eq!(merge_glyphs('▲', '│'), '▲');
        // An arrowhead replaces a line.
        assert_eq!(merge_glyphs('─', '▶'), '▶');
        assert_eq!(merge_glyphs('|', 'v'), 'v');
    }

    #[test]
    fn double_borders_resist_merging() {
        assert_eq!(merge_glyphs('║', '─'), '║');
        assert_eq!(merge_glyphs('═', '│'), '═');
    }

    #[test]
    fn crossing_lines_on_canvas() {
        let mut canvas = Canvas::new(5, 3).unwrap();

        canvas.draw_horizontal_line(0, 1, 4, '─');
        canvas.draw_vertical_line(2, 0, 2, '│');

        assert_eq!(canvas.to_text(), "  │  \n──┼──\n  │  ");
    }

    #[test]
    fn overlapping_boxes_share_junctions() {
        let mut canvas = Canvas::new(7, 4).unwrap();

        canvas.draw_box(0, 0, 5, 3, &BoxChars::sharp()).unwrap();
        canvas.draw_box(2, 1, 5, 3, &BoxChars::sharp()).unwrap();

        // Outer corners stay perfect corners.
        assert_eq!(canvas.get(Point::new(0, 0)), '┌');
        assert_eq!(canvas.get(Point::new(6, 1)), '┐');
        assert_eq!(canvas.get(Point::new(0, 2)), '└');
        assert_eq!(canvas.get(Point::new(6, 3)), '┘');

        // Crossings resolve to four-way junctions.
        assert_eq!(canvas.get(Point::new(4, 1)), '┼');
        assert_eq!(canvas.get(Point::new(2, 2)), '┼');
    }

    #[test]
    fn box_out_of_bounds() {
        let mut canvas = Canvas::new(5, 3).unwrap();

        assert!(matches!(
            canvas.draw_box(2, 0, 5, 3, &BoxChars::sharp()),
            Err(RenderError::OutOfBounds(_))
        ));
    }

    #[test]
    fn cjk_text_with_continuations() {
        let mut canvas = Canvas::new(20, 1).unwrap();

        canvas.draw_text(0, 0, "Hi你好");

        assert_eq!(canvas.get(Point::new(0, 0)), 'H');
        assert_eq!(canvas.get(Point::new(1, 0)), 'i');
        assert_eq!(canvas.get(Point::new(2, 0)), '你');
        assert_eq!(canvas.get(Point::new(3, 0)), CONTINUATION);
        assert_eq!(canvas.get(Point::new(4, 0)), '好');
        assert_eq!(canvas.get(Point::new(5, 0)), CONTINUATION);

        let row = canvas.to_text();
        assert_eq!(display_width(&row), 20);
        assert_eq!(display_width("Hi你好"), 6);
    }

    #[test]
    fn wide_glyph_at_right_edge_is_dropped() {
        let mut canvas = Canvas::new(2, 1).unwrap();

        canvas.draw_text(0, 0, "a你");
        assert_eq!(canvas.get(Point::new(0, 0)), 'a');
        // The wide glyph would straddle the edge; the cell stays empty.
        assert_eq!(canvas.get(Point::new(1, 0)), ' ');
    }

    #[test]
    fn zero_width_marks_are_skipped() {
        let mut canvas = Canvas::new(4, 1).unwrap();

        canvas.draw_text(0, 0, "e\u{0301}f");
        assert_eq!(canvas.get(Point::new(0, 0)), 'e');
        assert_eq!(canvas.get(Point::new(1, 0)), 'f');
    }

    #[test]
    fn rows_have_exact_width() {
        let mut canvas = Canvas::new(6, 2).unwrap();

        canvas.draw_text(0, 0, "你好x");
        canvas.draw_text(0, 1, "ab");

        for row in canvas.to_text().split('\n') {
            assert_eq!(display_width(row), 6);
        }
    }

    #[test]
    fn clear_resets_everything() {
        let mut canvas = Canvas::with_color(3, 1).unwrap();

        canvas.set(Point::new(0, 0), 'x').unwrap();
        canvas.set_color(Point::new(0, 0), AnsiColor::Named(NamedColor::Red));
        canvas.clear();

        assert_eq!(canvas.to_text(), "   ");
        assert_eq!(canvas.to_ansi_text(), "   ");
    }

    #[test]
    fn junction_resolver() {
        let mut canvas = Canvas::new(3, 3).unwrap();

        // A cross of lines around the center cell.
        canvas.set(Point::new(1, 0), '│').unwrap();
        canvas.set(Point::new(1, 2), '│').unwrap();
        canvas.set(Point::new(0, 1), '─').unwrap();
        canvas.set(Point::new(2, 1), '─').unwrap();

        assert_eq!(canvas.resolve_junction(Point::new(1, 1)), Some('┼'));

        // Remove the east neighbour: a tee remains.
        canvas.set_raw(Point::new(2, 1), ' ').unwrap();
        assert_eq!(canvas.resolve_junction(Point::new(1, 1)), Some('┤'));

        // No connecting neighbours at a far corner.
        assert_eq!(canvas.resolve_junction(Point::new(2, 2)), None);
    }

    #[test]
    fn ansi_serialization_resets_at_changes_and_eol() {
        let mut canvas = Canvas::with_color(3, 1).unwrap();

        canvas.draw_text(0, 0, "abc");
        canvas.set_color(Point::new(0, 0), AnsiColor::Named(NamedColor::Red));
        canvas.set_color(Point::new(1, 0), AnsiColor::Named(NamedColor::Red));

        assert_eq!(canvas.to_ansi_text(), "\x1b[31mab\x1b[0mc");
    }

    #[test]
    fn plain_canvas_ignores_color_writes() {
        let mut canvas = Canvas::new(2, 1).unwrap();

        assert!(!canvas.supports_color());
        canvas.set_color(Point::new(0, 0), AnsiColor::Named(NamedColor::Red));
        canvas.draw_text(0, 0, "ab");
        assert_eq!(canvas.to_ansi_text(), "ab");
    }
}
