//! Drawing nodes, paths and labels onto the canvas.
//!
//! The renderers hold no canvas state; each call borrows the canvas for
//! its duration and leaves nothing behind. Segment and border cells go
//! through the canvas merge function so crossings become junctions, while
//! labels write straight into the grid (a merged label would lose against
//! the line glyphs it sits on).
use crate::canvas::Canvas;
use crate::charset::{shadow_glyph, BoxChars, LineSet};
use crate::color::{AnsiColor, TextStyle};
use crate::config::{RenderMode, UnicodeLevel};
use crate::diagram::{LineKind, Node};
use crate::error::RenderError;
use crate::geometry::{Direction, Point};
use crate::width::{char_width, display_width, truncate, truncate_with_ellipsis};

/// Per-connection drawing attributes, resolved from hints and the arrow
/// configuration before drawing starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathStyle {
    pub kind: LineKind,
    pub arrow_start: bool,
    pub arrow_end: bool,
    pub color: Option<AnsiColor>,
    pub bold: bool,
}

/// Draws orthogonal paths: straight segments, a corner glyph at every
/// direction change, and optional arrowheads at the ends.
#[derive(Debug, Clone)]
pub struct PathRenderer {
    lines: LineSet,
    mode: RenderMode,
}

impl PathRenderer {
    pub fn new(lines: LineSet, mode: RenderMode) -> Self {
        Self { lines, mode }
    }

    pub fn draw(&self, canvas: &mut Canvas, points: &[Point], style: &PathStyle) {
        if points.len() < 2 {
            return;
        }

        let (horizontal, vertical) = self.lines.stroke(style.kind);

        // Segment pass: the cells strictly between vertices. Vertices are
        // written by the corner and endpoint passes.
        for window in points.windows(2) {
            let (a, b) = (window[0], window[1]);
            if a.y == b.y {
                let (lo, hi) = (a.x.min(b.x), a.x.max(b.x));
                if hi - lo >= 2 {
                    canvas.draw_horizontal_line(lo + 1, a.y, hi - 1, horizontal);
                }
            } else {
                let (lo, hi) = (a.y.min(b.y), a.y.max(b.y));
                if hi - lo >= 2 {
                    canvas.draw_vertical_line(a.x, lo + 1, hi - 1, vertical);
                }
            }
        }

        // Corner pass.
        for i in 1..points.len() - 1 {
            let incoming = points[i - 1].vh_direction(&points[i]);
            let outgoing = points[i].vh_direction(&points[i + 1]);

            let glyph = match (incoming, outgoing) {
                (Some(inc), Some(out)) if inc == out => {
                    // Colinear vertex left over from leg concatenation.
                    if inc.is_horizontal() {
                        horizontal
                    } else {
                        vertical
                    }
                }
                (Some(inc), Some(out)) => self.corner_for_turn(inc, out),
                _ => continue,
            };

            self.place_vertex(canvas, points[i], glyph);
        }

        // Endpoints: a line stub, then the arrowheads on top.
        let first_direction = points[0].vh_direction(&points[1]);
        let last_direction = points[points.len() - 2].vh_direction(&points[points.len() - 1]);

        if let Some(direction) = first_direction {
            let stub = if direction.is_horizontal() { horizontal } else { vertical };
            let _ = canvas.set(points[0], stub);

            if style.arrow_start {
                // The start arrow points back at the source.
                let _ = canvas.set(points[0], self.lines.arrow(direction.opposite()));
            }
        }
        if let Some(direction) = last_direction {
            let stub = if direction.is_horizontal() { horizontal } else { vertical };
            let _ = canvas.set(points[points.len() - 1], stub);

            if style.arrow_end {
                let _ = canvas.set(points[points.len() - 1], self.lines.arrow(direction));
            }
        }

        if canvas.supports_color() {
            self.paint(canvas, points, style);
        }
    }

    /// Corner glyph for a turn, selected by incoming and outgoing travel
    /// direction. The glyph's arms must point back at the previous cell
    /// and onward to the next one, e.g. travelling right then down needs
    /// west and south arms, which is `╮`.
    fn corner_for_turn(&self, incoming: Direction, outgoing: Direction) -> char {
        use Direction::*;

        match (incoming, outgoing) {
            (Right, Down) | (Up, Left) => self.lines.corner_tr,
            (Right, Up) | (Down, Left) => self.lines.corner_br,
            (Left, Down) | (Up, Right) => self.lines.corner_tl,
            (Left, Up) | (Down, Right) => self.lines.corner_bl,
            // Straight or reversing pairs never reach this point.
            _ => self.lines.horizontal,
        }
    }

    /// Writes a vertex glyph under the configured corner policy.
    fn place_vertex(&self, canvas: &mut Canvas, p: Point, glyph: char) {
        match self.mode {
            RenderMode::Standard => {
                let _ = canvas.set(p, glyph);
            }
            RenderMode::PreserveCorners => {
                let existing = canvas.get(p);

                if is_perfect_corner(existing) {
                    // An enclosing box keeps its corner.
                    return;
                }
                if existing == ' ' {
                    let _ = canvas.set(p, glyph);
                    return;
                }

                // Occupied by line geometry: recompute the junction from
                // the neighbours instead of merging blindly.
                match canvas.resolve_junction(p) {
                    Some(resolved) => {
                        let _ = canvas.set_raw(p, resolved);
                    }
                    None => {
                        let _ = canvas.set(p, glyph);
                    }
                }
            }
        }
    }

    /// Applies the path color and weight to every cell of the polyline.
    fn paint(&self, canvas: &mut Canvas, points: &[Point], style: &PathStyle) {
        let Some(color) = style.color else {
            if !style.bold {
                return;
            }
            for cell in polyline_cells(points) {
                canvas.set_style(cell, TextStyle::new(true, false));
            }
            return;
        };

        let text_style = TextStyle::new(style.bold, false);
        for cell in polyline_cells(points) {
            canvas.set_color(cell, color);
            if !text_style.is_plain() {
                canvas.set_style(cell, text_style);
            }
        }
    }
}

/// A perfect box corner, which preserve-corners mode refuses to touch.
fn is_perfect_corner(c: char) -> bool {
    matches!(
        c,
        '┌' | '┐' | '└' | '┘' | '╭' | '╮' | '╰' | '╯' | '╔' | '╗' | '╚' | '╝' | '+'
    )
}

/// Every cell a polyline covers, consecutive duplicates removed.
fn polyline_cells(points: &[Point]) -> Vec<Point> {
    let mut cells = vec![];

    for window in points.windows(2) {
        let Some(direction) = window[0].vh_direction(&window[1]) else {
            continue;
        };

        let mut p = window[0];
        if !cells.is_empty() {
            p = p.step(direction);
        }
        loop {
            cells.push(p);
            if p == window[1] {
                break;
            }
            p = p.step(direction);
        }
    }

    cells
}

/// Draws one node: optional shadow, border, then text.
#[derive(Debug, Clone)]
pub struct NodeRenderer {
    level: UnicodeLevel,
}

impl NodeRenderer {
    pub fn new(level: UnicodeLevel) -> Self {
        Self { level }
    }

    pub fn draw(&self, canvas: &mut Canvas, node: &Node) -> Result<(), RenderError> {
        let rect = node.rect();

        // Shadow first, so the border and neighbouring geometry win over
        // it wherever they overlap.
        if let Some(density) = node.shadow() {
            let glyph = shadow_glyph(density);

            for y in rect.min_y() + 1..=rect.max_y() + 1 {
                let _ = canvas.set(Point::new(rect.max_x() + 1, y), glyph);
            }
            for x in rect.min_x() + 1..=rect.max_x() {
                let _ = canvas.set(Point::new(x, rect.max_y() + 1), glyph);
            }
        }

        let border = BoxChars::for_style(node.style(), self.level);
        canvas.draw_box(rect.min_x(), rect.min_y(), rect.width(), rect.height(), &border)?;

        let interior = (rect.width() - 2).max(0) as usize;
        let colored = canvas.supports_color();
        let text_style = TextStyle::new(node.bold(), node.italic());
        let text_color = node.text_color().or_else(|| node.color());

        for (i, line) in node.text.iter().enumerate() {
            let row = rect.min_y() + 1 + i as i32;
            if row >= rect.max_y() {
                break;
            }

            let clipped = truncate(line, interior);
            let used = display_width(clipped);
            let x = if node.centered_text() {
                rect.min_x() + 1 + ((interior - used) / 2) as i32
            } else {
                rect.min_x() + 1
            };

            canvas.draw_text(x, row, clipped);

            if colored {
                for cx in x..x + used as i32 {
                    let cell = Point::new(cx, row);
                    if let Some(color) = text_color {
                        canvas.set_color(cell, color);
                    }
                    if !text_style.is_plain() {
                        canvas.set_style(cell, text_style);
                    }
                }
            }
        }

        if colored {
            if let Some(color) = node.color() {
                for x in rect.min_x()..=rect.max_x() {
                    canvas.set_color(Point::new(x, rect.min_y()), color);
                    canvas.set_color(Point::new(x, rect.max_y()), color);
                }
                for y in rect.min_y()..=rect.max_y() {
                    canvas.set_color(Point::new(rect.min_x(), y), color);
                    canvas.set_color(Point::new(rect.max_x(), y), color);
                }
            }
        }

        Ok(())
    }
}

/// Overlays connection labels onto their paths.
#[derive(Debug, Clone)]
pub struct LabelRenderer {
    max_length: usize,
}

impl LabelRenderer {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Writes `[label]` centered on the longest segment that can hold it,
    /// preferring horizontal segments. Labels write directly into the
    /// grid; merging would keep the line glyphs underneath instead.
    pub fn draw(&self, canvas: &mut Canvas, points: &[Point], label: &str) {
        if label.is_empty() || points.len() < 2 {
            return;
        }

        let text = format!("[{}]", truncate_with_ellipsis(label, self.max_length));
        let cells_wide = display_width(&text) as i32;
        let cells_tall = text.chars().count() as i32;

        let mut best_horizontal: Option<(Point, Point, i32)> = None;
        let mut best_vertical: Option<(Point, Point, i32)> = None;

        for window in points.windows(2) {
            let (a, b) = (window[0], window[1]);
            let length = a.manhattan_distance(&b) as i32 + 1;

            if a.y == b.y && a.x != b.x {
                if best_horizontal.map_or(true, |(_, _, l)| length > l) {
                    best_horizontal = Some((a, b, length));
                }
            } else if a.x == b.x && a.y != b.y {
                if best_vertical.map_or(true, |(_, _, l)| length > l) {
                    best_vertical = Some((a, b, length));
                }
            }
        }

        // A horizontal run that fits wins; a vertical run is the fallback.
        if let Some((a, b, length)) = best_horizontal {
            if length >= cells_wide + 2 {
                let mid = (a.x + b.x) / 2;
                self.write_horizontal(canvas, Point::new(mid - cells_wide / 2, a.y), &text);
                return;
            }
        }

        if let Some((a, b, length)) = best_vertical {
            if length >= cells_tall + 2 {
                let mid = (a.y + b.y) / 2;
                self.write_vertical(canvas, Point::new(a.x, mid - cells_tall / 2), &text);
            }
        }
    }

    fn write_horizontal(&self, canvas: &mut Canvas, start: Point, text: &str) {
        let mut x = start.x;

        for ch in text.chars() {
            match char_width(ch) {
                0 => continue,
                1 => {
                    let _ = canvas.set_raw(Point::new(x, start.y), ch);
                    x += 1;
                }
                _ => {
                    let _ = canvas.set_raw(Point::new(x, start.y), ch);
                    let _ = canvas.set_raw(Point::new(x + 1, start.y), crate::canvas::CONTINUATION);
                    x += 2;
                }
            }
        }
    }

    fn write_vertical(&self, canvas: &mut Canvas, start: Point, text: &str) {
        for (i, ch) in text.chars().enumerate() {
            let _ = canvas.set_raw(Point::new(start.x, start.y + i as i32), ch);
        }
    }
}
