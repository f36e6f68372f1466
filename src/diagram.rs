//! The diagram value object.
//!
//! A diagram is a flat collection of nodes and directed connections; edges
//! refer to nodes by id, never by pointer, so cyclic graphs need no shared
//! ownership. Geometry on a node is whatever the last layout pass assigned
//! (box diagrams) or whatever the caller supplied (sequence diagrams laid
//! out elsewhere).
//!
//! Visual knobs ride along as free-form string hints. The accessors on
//! [`Node`] and [`Connection`] parse the hints this crate understands;
//! unknown keys are preserved untouched for exporters.
use crate::color::AnsiColor;
use crate::error::RenderError;
use crate::geometry::{Point, Rect};
use derive_builder::Builder;
use derive_more::Display;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "{}", _0)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "{}", _0)]
pub struct ConnectionId(pub u32);

/// Which layout family the diagram belongs to. Sequence diagrams arrive with
/// node geometry already assigned by the sequence layout collaborator and
/// skip the box layout engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    Box,
    Sequence,
}

// Hint keys recognized by the renderers.
pub const HINT_STYLE: &str = "style";
pub const HINT_COLOR: &str = "color";
pub const HINT_TEXT_COLOR: &str = "textColor";
pub const HINT_BOLD: &str = "bold";
pub const HINT_ITALIC: &str = "italic";
pub const HINT_SHADOW: &str = "shadow";
pub const HINT_SHADOW_DENSITY: &str = "shadow-density";
pub const HINT_TEXT_ALIGN: &str = "text-align";
pub const HINT_BIDIRECTIONAL: &str = "bidirectional";

/// Border style of a node box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NodeStyle {
    #[default]
    Rounded,
    Simple,
    Double,
}

/// Shadow fill glyph selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShadowDensity {
    #[default]
    Light,
    Medium,
}

/// Stroke variant of a connection line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LineKind {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Thick,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Text lines shown inside the box, one per element. Line wrapping is
    /// the caller's responsibility; overlong lines are clipped at render
    /// time.
    pub text: Vec<String>,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    hints: BTreeMap<String, String>,
}

impl Node {
    pub fn new(id: NodeId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: vec![text.into()],
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            hints: BTreeMap::new(),
        }
    }

    pub fn with_lines(id: NodeId, lines: Vec<String>) -> Self {
        Self {
            id,
            text: lines,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            hints: BTreeMap::new(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_xywh(self.x, self.y, self.width, self.height)
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.origin.x;
        self.y = rect.origin.y;
        self.width = rect.size.width;
        self.height = rect.size.height;
    }

    pub fn center(&self) -> Point {
        self.rect().center()
    }

    // --- Hints

    pub fn hint(&self, key: &str) -> Option<&str> {
        self.hints.get(key).map(|s| s.as_str())
    }

    pub fn set_hint(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.hints.insert(key.into(), value.into());
    }

    pub fn hints(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hints.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn style(&self) -> NodeStyle {
        match self.hint(HINT_STYLE) {
            Some("simple") => NodeStyle::Simple,
            Some("double") => NodeStyle::Double,
            _ => NodeStyle::Rounded,
        }
    }

    pub fn color(&self) -> Option<AnsiColor> {
        self.hint(HINT_COLOR).and_then(|v| v.parse().ok())
    }

    pub fn text_color(&self) -> Option<AnsiColor> {
        self.hint(HINT_TEXT_COLOR).and_then(|v| v.parse().ok())
    }

    pub fn bold(&self) -> bool {
        self.hint(HINT_BOLD) == Some("true")
    }

    pub fn italic(&self) -> bool {
        self.hint(HINT_ITALIC) == Some("true")
    }

    /// Shadow density when the `shadow = southeast` hint is present.
    pub fn shadow(&self) -> Option<ShadowDensity> {
        if self.hint(HINT_SHADOW) != Some("southeast") {
            return None;
        }

        match self.hint(HINT_SHADOW_DENSITY) {
            Some("medium") => Some(ShadowDensity::Medium),
            _ => Some(ShadowDensity::Light),
        }
    }

    pub fn centered_text(&self) -> bool {
        self.hint(HINT_TEXT_ALIGN) == Some("center")
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: NodeId,
    pub to: NodeId,
    pub label: String,
    hints: BTreeMap<String, String>,
}

impl Connection {
    pub fn new(id: ConnectionId, from: NodeId, to: NodeId) -> Self {
        Self {
            id,
            from,
            to,
            label: String::new(),
            hints: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    // --- Hints

    pub fn hint(&self, key: &str) -> Option<&str> {
        self.hints.get(key).map(|s| s.as_str())
    }

    pub fn set_hint(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.hints.insert(key.into(), value.into());
    }

    pub fn line_kind(&self) -> LineKind {
        match self.hint(HINT_STYLE) {
            Some("dashed") => LineKind::Dashed,
            Some("dotted") => LineKind::Dotted,
            Some("thick") | Some("bold") => LineKind::Thick,
            _ => LineKind::Solid,
        }
    }

    pub fn color(&self) -> Option<AnsiColor> {
        self.hint(HINT_COLOR).and_then(|v| v.parse().ok())
    }

    pub fn bold(&self) -> bool {
        self.hint(HINT_BOLD) == Some("true")
    }

    pub fn bidirectional(&self) -> bool {
        self.hint(HINT_BIDIRECTIONAL) == Some("true")
    }
}

#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct DiagramMetadata {
    #[builder(setter(into))]
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct Diagram {
    kind: DiagramKind,
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    pub metadata: DiagramMetadata,
}

impl Diagram {
    pub fn new(kind: DiagramKind) -> Self {
        Self {
            kind,
            nodes: vec![],
            connections: vec![],
            metadata: DiagramMetadata::default(),
        }
    }

    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    // --- Nodes

    pub fn add_node(&mut self, node: Node) -> Result<NodeId, RenderError> {
        if self.get_node(node.id).is_some() {
            return Err(RenderError::DuplicateNode(node.id));
        }

        let id = node.id;
        self.nodes.push(node);
        Ok(id)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn nodes_mut(&mut self) -> impl ExactSizeIterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    // --- Connections

    pub fn connect(&mut self, connection: Connection) -> Result<ConnectionId, RenderError> {
        if self.get_connection(connection.id).is_some() {
            return Err(RenderError::DuplicateConnection(connection.id));
        }

        let id = connection.id;
        self.connections.push(connection);
        Ok(id)
    }

    pub fn get_connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn connections(&self) -> impl ExactSizeIterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Verifies that every connection endpoint names an existing node.
    pub fn check_references(&self) -> Result<(), RenderError> {
        for connection in &self.connections {
            for endpoint in [connection.from, connection.to] {
                if self.get_node(endpoint).is_none() {
                    return Err(RenderError::InvalidReference {
                        connection: connection.id,
                        node: endpoint,
                    });
                }
            }
        }

        Ok(())
    }
}
