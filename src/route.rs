//! Connection routing.
//!
//! Routing runs per connection in two phases. A cheap *rough* pass from
//! box center to box center picks which side the connection leaves and
//! enters; ports are then reserved near the geometrically preferred cells,
//! and a *final* pass routes port → waypoint → waypoint → port against the
//! full obstacle model.
//!
//! ```svgbob
//!  +--------+ port                       port +--------+
//!  |        o--*                           *--o        |
//!  |  src   |  | waypoint         waypoint |  |  dst   |
//!  +--------+  `--------------*------------'  +--------+
//! ```
//!
//! The obstacle model forces paths to keep one clear cell away from foreign
//! boxes and to approach them perpendicularly: a second virtual ring is
//! blocked except where the axis lines through the edge centers cross it,
//! so near-diagonal corner cuts are banned while straight-in approaches
//! stay open.
use crate::config::{RouteOptions, RouteOrdering};
use crate::diagram::{Connection, ConnectionId, Diagram, NodeId};
use crate::error::RenderError;
use crate::geometry::{Point, Rect, Side};
use crate::pathfind::{coalesce, FoundPath, GridPathFinder};
use crate::port::{Port, PortManager};
use log::{debug, trace};
use std::collections::HashSet;
use std::f64::consts::PI;

/// Width/height ratio above which a self-loop runs over the top edge
/// instead of the right edge.
const SELF_LOOP_WIDE_RATIO: f64 = 1.5;

/// Fraction of a quadrant counted as "near the boundary", where the side
/// choice falls back to port congestion.
const BOUNDARY_BAND_DEG: f64 = 90.0 * 0.2;

/// An orthogonal path produced for one connection, immutable once routed.
/// The reserved ports ride along for the renderer, which needs to know
/// where arrowheads sit; self-loops carry no ports.
#[derive(Debug, Clone)]
pub struct RoutedPath {
    pub connection: ConnectionId,
    pub points: Vec<Point>,
    pub cost: i64,
    pub source_port: Option<Port>,
    pub target_port: Option<Port>,
}

/// Obstacle predicate for one connection, built from the placed nodes and
/// the ports other connections hold.
struct ObstacleMap {
    source: Rect,
    target: Rect,
    foreign: Vec<Rect>,
    /// Edge centers of foreign nodes stay passable no matter what.
    foreign_centers: HashSet<Point>,
    /// Ports reserved by other connections, on any node.
    foreign_ports: HashSet<Point>,
    /// Rough mode only blocks foreign boxes themselves.
    rough: bool,
}

impl ObstacleMap {
    fn new(
        diagram: &Diagram,
        connection: &Connection,
        ports: &PortManager,
        rough: bool,
    ) -> Self {
        let source = diagram
            .get_node(connection.from)
            .map(|n| n.rect())
            .unwrap_or_default();
        let target = diagram
            .get_node(connection.to)
            .map(|n| n.rect())
            .unwrap_or_default();

        let mut foreign = vec![];
        let mut foreign_centers = HashSet::new();
        for node in diagram.nodes() {
            if node.id == connection.from || node.id == connection.to {
                continue;
            }

            let rect = node.rect();
            for side in [Side::North, Side::South, Side::East, Side::West] {
                foreign_centers.insert(rect.side_center(side));
            }
            foreign.push(rect);
        }

        let foreign_ports = ports
            .iter()
            .filter(|p| p.owner != connection.id)
            .map(|p| p.point)
            .collect();

        Self {
            source,
            target,
            foreign,
            foreign_centers,
            foreign_ports,
            rough,
        }
    }

    fn blocked(&self, p: &Point) -> bool {
        if self.rough {
            return self.foreign.iter().any(|r| r.contains(p));
        }

        // Edge centers of foreign nodes are passable even inside the
        // padded rings.
        if self.foreign_centers.contains(p) {
            return false;
        }

        // The endpoints' interiors are off-limits; their borders are not,
        // so paths may hug their own boxes.
        if self.source.contains_interior(p) || self.target.contains_interior(p) {
            return true;
        }

        for rect in &self.foreign {
            if rect.expand(1).contains(p) {
                return true;
            }

            // Virtual approach corridor: the second ring is blocked except
            // on the axis lines through the edge centers.
            let center = rect.center();
            if rect.expand(2).on_border(p) && p.x != center.x && p.y != center.y {
                return true;
            }
        }

        self.foreign_ports.contains(p)
    }
}

#[derive(Debug)]
pub struct Router {
    options: RouteOptions,
    finder: GridPathFinder,
    ports: PortManager,
}

impl Router {
    pub fn new(options: RouteOptions) -> Self {
        let finder = GridPathFinder::new(options.cost);

        Self {
            options,
            finder,
            ports: PortManager::new(),
        }
    }

    pub fn ports(&self) -> &PortManager {
        &self.ports
    }

    /// Routes every connection of the diagram against its placed nodes.
    ///
    /// Connections are processed in a deterministic order; each one sees
    /// the ports reserved by all earlier ones. Any failure aborts the whole
    /// batch, releases every reservation and reports the offending
    /// connection.
    pub fn route_all(&mut self, diagram: &Diagram) -> Result<Vec<RoutedPath>, RenderError> {
        diagram.check_references()?;
        self.ports.reset();

        let mut order: Vec<&Connection> = diagram.connections().collect();
        match self.options.ordering {
            RouteOrdering::IdSorted => {
                order.sort_by_key(|c| (c.from, c.to, c.id));
            }
            RouteOrdering::NearestFirst => {
                order.sort_by_key(|c| {
                    let from = diagram.get_node(c.from).map(|n| n.center()).unwrap_or_default();
                    let to = diagram.get_node(c.to).map(|n| n.center()).unwrap_or_default();
                    (from.distance_squared(&to), c.from, c.to, c.id)
                });
            }
        }

        let bounds = self.search_bounds(diagram);
        let mut routed = Vec::with_capacity(order.len());

        for connection in order {
            match self.route_one(diagram, connection, &bounds) {
                Ok(path) => routed.push(path),
                Err(err) => {
                    debug!("routing aborted at connection {}: {}", connection.id, err);
                    self.ports.reset();
                    return Err(err);
                }
            }
        }

        Ok(routed)
    }

    /// The search area: everything the nodes cover, with enough margin for
    /// ports, corridors and waypoints.
    fn search_bounds(&self, diagram: &Diagram) -> Rect {
        let mut bounds = Rect::default();
        for node in diagram.nodes() {
            bounds = bounds.union(&node.rect());
        }

        bounds.expand(4 + self.options.max_waypoint_distance)
    }

    fn route_one(
        &mut self,
        diagram: &Diagram,
        connection: &Connection,
        bounds: &Rect,
    ) -> Result<RoutedPath, RenderError> {
        if connection.is_self_loop() {
            let rect = diagram
                .get_node(connection.from)
                .map(|n| n.rect())
                .unwrap_or_default();

            return Ok(RoutedPath {
                connection: connection.id,
                points: self_loop_points(&rect),
                cost: 0,
                source_port: None,
                target_port: None,
            });
        }

        let source = diagram.get_node(connection.from).unwrap().rect();
        let target = diagram.get_node(connection.to).unwrap().rect();

        // Phase 1: a rough center-to-center path over foreign boxes only,
        // and side classification from the center-to-center angle.
        let rough = ObstacleMap::new(diagram, connection, &self.ports, true);
        match self
            .finder
            .find(source.center(), target.center(), bounds, &|p| rough.blocked(p))
        {
            Some(path) => trace!(
                "connection {}: rough path cost {}",
                connection.id,
                path.cost
            ),
            None => debug!(
                "connection {}: no rough path, classifying by angle only",
                connection.id
            ),
        }

        let dx = (target.center().x - source.center().x) as f64;
        let dy = (target.center().y - source.center().y) as f64;
        let angle = dy.atan2(dx);
        let reverse = angle + PI;

        let exit_side = self.pick_side(connection.from, angle);
        let entry_side = self.pick_side(connection.to, reverse);

        // Phase 2: reserve ports near the preferred cells. A failed target
        // reservation gives the source port back before surfacing.
        let source_port = self.reserve_with_fallback(
            connection.from,
            &source,
            exit_side,
            connection.id,
            angle,
        )?;

        let target_port = match self.reserve_with_fallback(
            connection.to,
            &target,
            entry_side,
            connection.id,
            reverse,
        ) {
            Ok(port) => port,
            Err(err) => {
                self.ports.release(&source_port);
                return Err(err);
            }
        };

        // Phase 3: the final path against the full obstacle model, routed
        // through perpendicular waypoints.
        let obstacles = ObstacleMap::new(diagram, connection, &self.ports, false);
        let blocked = |p: &Point| obstacles.blocked(p);

        let source_waypoint = self.waypoint(&source_port, &blocked);
        let target_waypoint = self.waypoint(&target_port, &blocked);

        let legs = [
            (source_port.point, source_waypoint),
            (source_waypoint, target_waypoint),
            (target_waypoint, target_port.point),
        ];

        let mut points: Vec<Point> = vec![];
        let mut cost = 0i64;

        for (from, to) in legs {
            if from == to {
                continue;
            }

            let Some(FoundPath {
                points: leg_points,
                cost: leg_cost,
            }) = self.finder.find(from, to, bounds, &blocked)
            else {
                self.ports.release(&source_port);
                self.ports.release(&target_port);
                return Err(RenderError::NoPath(connection.id));
            };

            // Drop the duplicate join point between legs.
            let skip = usize::from(!points.is_empty());
            points.extend(leg_points.into_iter().skip(skip));
            cost += leg_cost;
        }

        let points = coalesce(&points);

        if points.len() < 2 {
            self.ports.release(&source_port);
            self.ports.release(&target_port);
            return Err(RenderError::NoPath(connection.id));
        }

        Ok(RoutedPath {
            connection: connection.id,
            points,
            cost,
            source_port: Some(source_port),
            target_port: Some(target_port),
        })
    }

    /// Side selection by angle quadrant, with the congestion tie-break
    /// inside the boundary band.
    fn pick_side(&self, node: NodeId, angle: f64) -> Side {
        let degrees = normalize_degrees(angle.to_degrees());
        let primary = side_for_angle(degrees);

        // Quadrant boundaries at -45°, 45°, 135°, 225° (and 315°, which is
        // -45° again after normalization).
        for (boundary, a, b) in [
            (-45.0, Side::North, Side::East),
            (45.0, Side::East, Side::South),
            (135.0, Side::South, Side::West),
            (225.0, Side::West, Side::North),
            (315.0, Side::North, Side::East),
        ] {
            if (degrees - boundary).abs() < BOUNDARY_BAND_DEG {
                let occupied_a = self.ports.occupied(node, a);
                let occupied_b = self.ports.occupied(node, b);

                return if occupied_a < occupied_b {
                    a
                } else if occupied_b < occupied_a {
                    b
                } else {
                    primary
                };
            }
        }

        primary
    }

    /// Reserves a port on `side`, falling back once to the opposite-axis
    /// side when the candidates are gone.
    fn reserve_with_fallback(
        &mut self,
        node: NodeId,
        rect: &Rect,
        side: Side,
        owner: ConnectionId,
        angle: f64,
    ) -> Result<Port, RenderError> {
        let preferred = preferred_port_point(rect, side, angle);

        match self.ports.reserve(node, rect, side, owner, preferred) {
            Ok(port) => Ok(port),
            Err(first) => {
                let fallback = opposite_axis_side(side, angle);
                let preferred = preferred_port_point(rect, fallback, angle);

                debug!(
                    "node {}: {} side exhausted, retrying {}",
                    node, side, fallback
                );
                self.ports
                    .reserve(node, rect, fallback, owner, preferred)
                    .map_err(|_| first)
            }
        }
    }

    /// The first unobstructed cell stepping outward from a port along its
    /// side's normal, or the port itself when nothing within reach is
    /// clear.
    fn waypoint<F>(&self, port: &Port, blocked: &F) -> Point
    where
        F: Fn(&Point) -> bool,
    {
        let outward = port.side.outward();

        let mut p = port.point;
        for _ in 0..self.options.max_waypoint_distance {
            p = p.step(outward);
            if !blocked(&p) {
                return p;
            }
        }

        port.point
    }
}

/// Normalizes an angle in degrees into `[-45, 315)` so that each quadrant
/// is a contiguous interval.
fn normalize_degrees(mut degrees: f64) -> f64 {
    while degrees < -45.0 {
        degrees += 360.0;
    }
    while degrees >= 315.0 {
        degrees -= 360.0;
    }

    degrees
}

/// Quadrant lookup: East `[-45, 45)`, South `[45, 135)`, West `[135, 225)`,
/// North `[225, 315)`. `0°` points East and `90°` South (y grows downward).
fn side_for_angle(degrees: f64) -> Side {
    if degrees < 45.0 {
        Side::East
    } else if degrees < 135.0 {
        Side::South
    } else if degrees < 225.0 {
        Side::West
    } else {
        Side::North
    }
}

/// The fallback side on the other axis, leaning toward the target.
fn opposite_axis_side(side: Side, angle: f64) -> Side {
    if side.is_horizontal() {
        if angle.cos() >= 0.0 {
            Side::East
        } else {
            Side::West
        }
    } else if angle.sin() >= 0.0 {
        Side::South
    } else {
        Side::North
    }
}

/// The cell the router would ideally attach to: the edge center, offset
/// along the edge by the angle's projection, clamped to the edge interior.
fn preferred_port_point(rect: &Rect, side: Side, angle: f64) -> Point {
    if side.is_horizontal() {
        let half = (rect.width() / 2 - 1).max(0) as f64;
        let offset = (angle.cos() * half).round() as i32;
        let x = (rect.mid_x() + offset).clamp(rect.min_x() + 1, rect.max_x() - 1);
        let y = match side {
            Side::North => rect.min_y() - 1,
            _ => rect.max_y() + 1,
        };

        Point::new(x, y)
    } else {
        let half = (rect.height() / 2 - 1).max(0) as f64;
        let offset = (angle.sin() * half).round() as i32;
        let y = (rect.mid_y() + offset).clamp(rect.min_y() + 1, rect.max_y() - 1);
        let x = match side {
            Side::East => rect.max_x() + 1,
            _ => rect.min_x() - 1,
        };

        Point::new(x, y)
    }
}

/// The fixed five-point loop a self-referencing connection renders as.
/// Wide boxes loop over the top edge into the east side; others exit the
/// east side and come back up into the south edge.
///
/// ```svgbob
///   .----------.
///   |          |
/// +-*----+     |
/// | wide |     |
/// +------+     |
///        ^     |
///        `-----'
/// ```
fn self_loop_points(rect: &Rect) -> Vec<Point> {
    let stub = ((rect.width().max(rect.height())) / 2).clamp(3, 8);
    let wide = rect.width() as f64 >= rect.height() as f64 * SELF_LOOP_WIDE_RATIO;

    if wide {
        vec![
            Point::new(rect.mid_x(), rect.min_y() - 1),
            Point::new(rect.mid_x(), rect.min_y() - stub),
            Point::new(rect.max_x() + stub, rect.min_y() - stub),
            Point::new(rect.max_x() + stub, rect.mid_y()),
            Point::new(rect.max_x() + 1, rect.mid_y()),
        ]
    } else {
        vec![
            Point::new(rect.max_x() + 1, rect.mid_y()),
            Point::new(rect.max_x() + stub, rect.mid_y()),
            Point::new(rect.max_x() + stub, rect.max_y() + stub),
            Point::new(rect.mid_x(), rect.max_y() + stub),
            Point::new(rect.mid_x(), rect.max_y() + 1),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{DiagramKind, Node};

    fn placed_node(id: u32, x: i32, y: i32, width: i32, height: i32) -> Node {
        let mut node = Node::new(NodeId(id), format!("n{}", id));
        node.set_rect(Rect::from_xywh(x, y, width, height));
        node
    }

    fn two_node_diagram() -> Diagram {
        let mut diagram = Diagram::new(DiagramKind::Box);
        diagram.add_node(placed_node(1, 0, 0, 6, 3)).unwrap();
        diagram.add_node(placed_node(2, 12, 0, 6, 3)).unwrap();
        diagram
            .connect(Connection::new(ConnectionId(1), NodeId(1), NodeId(2)))
            .unwrap();
        diagram
    }

    #[test]
    fn side_quadrants() {
        assert_eq!(side_for_angle(0.0), Side::East);
        assert_eq!(side_for_angle(90.0), Side::South);
        assert_eq!(side_for_angle(180.0), Side::West);
        assert_eq!(side_for_angle(270.0), Side::North);
        assert_eq!(side_for_angle(44.9), Side::East);
        assert_eq!(side_for_angle(45.0), Side::South);
    }

    #[test]
    fn degrees_normalization() {
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(320.0), -40.0);
        assert_eq!(normalize_degrees(0.0), 0.0);
    }

    #[test]
    fn preferred_point_leans_toward_the_target() {
        let rect = Rect::from_xywh(0, 0, 7, 5);

        // Heading straight East from the east side: the edge center row.
        let p = preferred_port_point(&rect, Side::East, 0.0);
        assert_eq!(p, Point::new(7, 2));

        // Heading south-east from the south side: pushed right.
        let p = preferred_port_point(&rect, Side::South, (45.0f64).to_radians());
        assert_eq!(p.y, 5);
        assert!(p.x > rect.mid_x());

        // Clamped inside the edge, never on the corner columns.
        let p = preferred_port_point(&rect, Side::South, 0.0);
        assert!(p.x <= rect.max_x() - 1);
    }

    #[test]
    fn straight_route_between_two_nodes() {
        let diagram = two_node_diagram();
        let mut router = Router::new(RouteOptions::default());

        let routed = router.route_all(&diagram).unwrap();
        assert_eq!(routed.len(), 1);

        let path = &routed[0];
        let source_port = path.source_port.unwrap();
        let target_port = path.target_port.unwrap();

        // Endpoint adherence: the path spans exactly port to port.
        assert_eq!(path.points.first(), Some(&source_port.point));
        assert_eq!(path.points.last(), Some(&target_port.point));

        // A side-by-side pair connects east to west on the shared row.
        assert_eq!(source_port.side, Side::East);
        assert_eq!(target_port.side, Side::West);
        assert_eq!(path.points, vec![Point::new(6, 1), Point::new(11, 1)]);
    }

    #[test]
    fn ports_stay_unique_across_connections() {
        let mut diagram = Diagram::new(DiagramKind::Box);
        diagram.add_node(placed_node(1, 0, 0, 6, 5)).unwrap();
        diagram.add_node(placed_node(2, 14, 0, 6, 5)).unwrap();
        for id in 1..=3 {
            diagram
                .connect(Connection::new(ConnectionId(id), NodeId(1), NodeId(2)))
                .unwrap();
        }

        let mut router = Router::new(RouteOptions::default());
        let routed = router.route_all(&diagram).unwrap();

        let mut seen = vec![];
        for path in &routed {
            for port in [path.source_port.unwrap(), path.target_port.unwrap()] {
                assert!(
                    !seen.contains(&(port.node, port.point)),
                    "port {:?} reserved twice",
                    port
                );
                seen.push((port.node, port.point));
            }
        }
    }

    #[test]
    fn routes_are_orthogonal() {
        let mut diagram = Diagram::new(DiagramKind::Box);
        diagram.add_node(placed_node(1, 0, 0, 6, 3)).unwrap();
        diagram.add_node(placed_node(2, 20, 8, 6, 3)).unwrap();
        diagram.add_node(placed_node(3, 10, 4, 6, 3)).unwrap();
        diagram
            .connect(Connection::new(ConnectionId(1), NodeId(1), NodeId(2)))
            .unwrap();

        let mut router = Router::new(RouteOptions::default());
        let routed = router.route_all(&diagram).unwrap();

        for window in routed[0].points.windows(2) {
            assert!(
                window[0].x == window[1].x || window[0].y == window[1].y,
                "diagonal segment {:?}",
                window
            );
        }
    }

    #[test]
    fn paths_avoid_foreign_boxes() {
        let mut diagram = Diagram::new(DiagramKind::Box);
        diagram.add_node(placed_node(1, 0, 2, 6, 3)).unwrap();
        diagram.add_node(placed_node(2, 22, 2, 6, 3)).unwrap();
        // A blocker squarely between the endpoints.
        diagram.add_node(placed_node(3, 11, 1, 6, 5)).unwrap();
        diagram
            .connect(Connection::new(ConnectionId(1), NodeId(1), NodeId(2)))
            .unwrap();

        let mut router = Router::new(RouteOptions::default());
        let routed = router.route_all(&diagram).unwrap();
        let blocker = Rect::from_xywh(11, 1, 6, 5);

        // Walk every cell of every segment; none may enter the blocker or
        // its one-cell padding.
        for window in routed[0].points.windows(2) {
            let direction = window[0].vh_direction(&window[1]).unwrap();
            let mut p = window[0];
            loop {
                assert!(
                    !blocker.expand(1).contains(&p),
                    "path cell {} violates the blocker padding",
                    p
                );
                if p == window[1] {
                    break;
                }
                p = p.step(direction);
            }
        }
    }

    #[test]
    fn batch_order_does_not_change_results() {
        let build = |ids: &[u32]| {
            let mut diagram = Diagram::new(DiagramKind::Box);
            diagram.add_node(placed_node(1, 0, 0, 6, 5)).unwrap();
            diagram.add_node(placed_node(2, 14, 0, 6, 5)).unwrap();
            diagram.add_node(placed_node(3, 28, 0, 6, 5)).unwrap();
            for &id in ids {
                let (from, to) = match id {
                    1 => (NodeId(1), NodeId(2)),
                    2 => (NodeId(2), NodeId(3)),
                    _ => (NodeId(1), NodeId(3)),
                };
                diagram
                    .connect(Connection::new(ConnectionId(id), from, to))
                    .unwrap();
            }
            diagram
        };

        let mut router = Router::new(RouteOptions::default());
        let a = router.route_all(&build(&[1, 2, 3])).unwrap();
        let mut router = Router::new(RouteOptions::default());
        let b = router.route_all(&build(&[3, 1, 2])).unwrap();

        let points_a: Vec<_> = a.iter().map(|p| (p.connection, p.points.clone())).collect();
        let points_b: Vec<_> = b.iter().map(|p| (p.connection, p.points.clone())).collect();
        assert_eq!(points_a, points_b);
    }

    #[test]
    fn dangling_reference_fails_the_batch() {
        let mut diagram = Diagram::new(DiagramKind::Box);
        diagram.add_node(placed_node(1, 0, 0, 6, 3)).unwrap();
        diagram
            .connect(Connection::new(ConnectionId(1), NodeId(1), NodeId(9)))
            .unwrap();

        let mut router = Router::new(RouteOptions::default());
        assert!(matches!(
            router.route_all(&diagram),
            Err(RenderError::InvalidReference { .. })
        ));
    }

    #[test]
    fn self_loop_on_a_tall_node_uses_the_east_side() {
        let rect = Rect::from_xywh(0, 0, 6, 6);
        let points = self_loop_points(&rect);

        assert_eq!(points.len(), 5);
        assert_eq!(points[0], Point::new(6, 3));
        assert_eq!(points[4], Point::new(3, 6));

        // Orthogonal throughout.
        for window in points.windows(2) {
            assert!(window[0].vh_direction(&window[1]).is_some());
        }
    }

    #[test]
    fn self_loop_on_a_wide_node_uses_the_top_edge() {
        let rect = Rect::from_xywh(0, 0, 12, 3);
        let points = self_loop_points(&rect);

        assert_eq!(points.len(), 5);
        // Exits above the top edge.
        assert_eq!(points[0], Point::new(6, -1));
        // Comes back into the east side.
        assert_eq!(points[4], Point::new(12, 1));
    }

    #[test]
    fn self_loop_stub_is_clamped() {
        let small = self_loop_points(&Rect::from_xywh(0, 0, 5, 3));
        let wide_span = small[1].x - small[0].x;
        assert!(wide_span.abs() <= 8);

        let large = self_loop_points(&Rect::from_xywh(0, 0, 40, 3));
        // Stub length saturates at 8 even for a very wide node.
        assert_eq!(large[0].y - large[1].y, 7);
    }
}
