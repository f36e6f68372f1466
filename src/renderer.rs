//! The rendering pipeline.
//!
//! A render is a pure function of `(diagram, options)`: lay out the boxes
//! (box diagrams only; sequence diagrams arrive pre-placed), route every
//! connection, size a canvas around everything the routes touched, then
//! draw boxes, paths and labels and serialize. Nothing here talks to a
//! terminal; the caller decides what to do with the final string.
use crate::canvas::Canvas;
use crate::charset::LineSet;
use crate::config::{ArrowType, RenderOptions};
use crate::diagram::{Diagram, DiagramKind};
use crate::error::RenderError;
use crate::geometry::{Point, Rect, Size};
use crate::layout::{BoxLayoutEngine, LayoutEngine};
use crate::render::{LabelRenderer, NodeRenderer, PathRenderer, PathStyle};
use crate::route::{RoutedPath, Router};
use log::debug;
use std::io::Write;

pub trait Renderer {
    fn render(&self, diagram: &Diagram, writer: &mut impl Write) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Default)]
pub struct TextRenderer {
    options: RenderOptions,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Runs the whole pipeline and returns the canvas serialization.
    pub fn render_to_string(&self, diagram: &Diagram) -> Result<String, RenderError> {
        // The pipeline works on its own copy; layout never mutates the
        // caller's diagram.
        let mut diagram = diagram.clone();

        if diagram.kind() == DiagramKind::Box {
            let engine = BoxLayoutEngine::new(self.options.layout.clone());
            let placements = engine.place_nodes(&diagram)?;

            for node in diagram.nodes_mut() {
                if let Some(rect) = placements.get(&node.id) {
                    node.set_rect(*rect);
                }
            }
        }

        let mut router = Router::new(self.options.route.clone());
        let routed = router.route_all(&diagram)?;

        // Size the canvas around everything drawn: boxes (plus their
        // shadow strips) and every routed cell, then shift out of negative
        // space where loops or detours wandered above or left of origin.
        let bounds = drawing_bounds(&diagram, &routed);
        let dx = -bounds.min_x().min(0);
        let dy = -bounds.min_y().min(0);

        let width = bounds.max_x() + dx + 1;
        let height = bounds.max_y() + dy + 1;
        debug!("render: canvas {}x{}, offset ({}, {})", width, height, dx, dy);

        let mut canvas = if self.options.color {
            Canvas::with_color(width, height)?
        } else {
            Canvas::new(width, height)?
        };

        for node in diagram.nodes_mut() {
            node.x += dx;
            node.y += dy;
        }
        let routed: Vec<RoutedPath> = routed
            .into_iter()
            .map(|mut path| {
                for p in &mut path.points {
                    *p = p.translate(dx, dy);
                }
                for port in [&mut path.source_port, &mut path.target_port] {
                    if let Some(port) = port {
                        port.point = port.point.translate(dx, dy);
                    }
                }
                path
            })
            .collect();

        // Boxes first so preserve-corners mode can see them, then paths,
        // then labels over the finished lines.
        let node_renderer = NodeRenderer::new(self.options.unicode);
        let mut ids: Vec<_> = diagram.nodes().map(|n| n.id).collect();
        ids.sort();
        for id in ids {
            node_renderer.draw(&mut canvas, diagram.get_node(id).unwrap())?;
        }

        let lines = LineSet::for_level(self.options.unicode);
        let path_renderer = PathRenderer::new(lines, self.options.mode);

        for path in &routed {
            let connection = diagram.get_connection(path.connection).unwrap();

            let arrow = if connection.bidirectional() {
                ArrowType::Both
            } else {
                self.options.arrows.arrow_for(connection.id)
            };
            let style = PathStyle {
                kind: connection.line_kind(),
                arrow_start: matches!(arrow, ArrowType::Start | ArrowType::Both),
                arrow_end: matches!(arrow, ArrowType::End | ArrowType::Both),
                color: connection.color(),
                bold: connection.bold(),
            };

            path_renderer.draw(&mut canvas, &path.points, &style);
        }

        let label_renderer = LabelRenderer::new(self.options.max_label_length);
        for path in &routed {
            let connection = diagram.get_connection(path.connection).unwrap();
            label_renderer.draw(&mut canvas, &path.points, &connection.label);
        }

        Ok(if self.options.color {
            canvas.to_ansi_text()
        } else {
            canvas.to_text()
        })
    }
}

impl Renderer for TextRenderer {
    fn render(&self, diagram: &Diagram, writer: &mut impl Write) -> Result<(), RenderError> {
        let text = self.render_to_string(diagram)?;

        writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// The smallest rectangle covering every node (shadow strips included) and
/// every routed point.
fn drawing_bounds(diagram: &Diagram, routed: &[RoutedPath]) -> Rect {
    let mut bounds = Rect::default();

    for node in diagram.nodes() {
        let mut rect = node.rect();
        if node.shadow().is_some() {
            rect = Rect::from_xywh(
                rect.origin.x,
                rect.origin.y,
                rect.width() + 1,
                rect.height() + 1,
            );
        }
        bounds = bounds.union(&rect);
    }

    for path in routed {
        for p in &path.points {
            bounds = bounds.union(&Rect::new(*p, Size::new(1, 1)));
        }
    }

    if bounds.width() <= 0 || bounds.height() <= 0 {
        // An empty diagram still serializes to a single blank cell.
        return Rect::new(Point::zero(), Size::new(1, 1));
    }

    bounds
}
