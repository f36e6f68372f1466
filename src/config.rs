//! Configuration surface of the rendering pipeline.
//!
//! Everything here is plain data with defaults; a render is a pure function
//! of `(diagram, options)`. No environment variables or persisted state are
//! consulted.
use crate::diagram::ConnectionId;
use derive_builder::Builder;
use std::collections::BTreeMap;

/// Spacing and size clamps applied by the box layout engine.
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct LayoutOptions {
    /// Gap between layers (and between components), in cells.
    pub horizontal_spacing: i32,
    /// Gap between stacked nodes within one layer, in cells.
    pub vertical_spacing: i32,
    pub min_node_width: i32,
    pub min_node_height: i32,
    /// Text lines longer than this are clipped, never wrapped.
    pub max_node_width: i32,
    /// A layer holding more nodes than this is split into sub-columns.
    pub max_nodes_per_column: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            horizontal_spacing: 5,
            vertical_spacing: 2,
            min_node_width: 5,
            min_node_height: 3,
            max_node_width: 40,
            max_nodes_per_column: 6,
        }
    }
}

/// Cost weights of the A* search.
///
/// The heuristic is Manhattan distance times `straight`, which stays
/// admissible as long as `straight` is the cheapest possible move.
/// `proximity` is added when a step lands next to a blocked cell; a negative
/// value makes paths hug obstacles.
#[derive(Debug, Clone, Copy, Builder)]
#[builder(default)]
pub struct PathCost {
    pub straight: i32,
    pub turn: i32,
    pub proximity: i32,
}

impl Default for PathCost {
    fn default() -> Self {
        Self {
            straight: 10,
            turn: 20,
            proximity: 0,
        }
    }
}

/// Corner policy where a path vertex coincides with existing geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderMode {
    /// Merge path corners with whatever occupies the cell; box edges
    /// upgrade to tees and crosses.
    #[default]
    Standard,
    /// Leave perfect box corners intact; recompute junctions from
    /// neighbour connectivity elsewhere.
    PreserveCorners,
}

/// Terminal capability tier driving glyph selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnicodeLevel {
    #[default]
    Full,
    Extended,
    Basic,
    None,
}

impl UnicodeLevel {
    /// Whether box-drawing glyphs are available at this tier.
    pub fn has_box_drawing(&self) -> bool {
        matches!(self, UnicodeLevel::Full | UnicodeLevel::Extended)
    }
}

/// Arrowhead placement for a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrowType {
    None,
    #[default]
    End,
    Start,
    Both,
}

/// Default arrow placement plus per-connection overrides.
#[derive(Debug, Clone, Default)]
pub struct ArrowConfig {
    pub default_type: ArrowType,
    overrides: BTreeMap<ConnectionId, ArrowType>,
}

impl ArrowConfig {
    pub fn new(default_type: ArrowType) -> Self {
        Self {
            default_type,
            overrides: BTreeMap::new(),
        }
    }

    pub fn set_override(&mut self, id: ConnectionId, arrow: ArrowType) {
        self.overrides.insert(id, arrow);
    }

    pub fn arrow_for(&self, id: ConnectionId) -> ArrowType {
        self.overrides.get(&id).copied().unwrap_or(self.default_type)
    }
}

/// Order in which a batch of connections is routed. Earlier connections
/// reserve ports first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RouteOrdering {
    /// Sort by `(from, to, id)`. The default; the mode under which renders
    /// are guaranteed byte-identical.
    #[default]
    IdSorted,
    /// Sort by squared center-to-center distance, shortest first, with the
    /// `(from, to, id)` triple as tie-break.
    NearestFirst,
}

#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct RouteOptions {
    pub cost: PathCost,
    pub ordering: RouteOrdering,
    /// How far a perpendicular waypoint may step out from its port.
    pub max_waypoint_distance: i32,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            cost: PathCost::default(),
            ordering: RouteOrdering::default(),
            max_waypoint_distance: 3,
        }
    }
}

/// Top-level options consumed by [`crate::renderer::TextRenderer`].
#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct RenderOptions {
    pub layout: LayoutOptions,
    pub route: RouteOptions,
    pub mode: RenderMode,
    pub unicode: UnicodeLevel,
    pub arrows: ArrowConfig,
    /// Display-width limit of a connection label before `..` truncation.
    pub max_label_length: usize,
    /// Allocate color/style grids and emit SGR sequences.
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            route: RouteOptions::default(),
            mode: RenderMode::default(),
            unicode: UnicodeLevel::default(),
            arrows: ArrowConfig::default(),
            max_label_length: 16,
            color: false,
        }
    }
}
