//! Port reservation.
//!
//! A port is a cell one unit outside a node border where exactly one
//! connection may attach. The manager hands out ports near a geometric
//! hint, keeps them reserved for the rest of the render, and refuses a
//! side once its candidate cells are gone. State is per render; [`reset`]
//! must run before the manager is reused.
//!
//! [`reset`]: PortManager::reset
use crate::diagram::{ConnectionId, NodeId};
use crate::error::RenderError;
use crate::geometry::{Point, Rect, Side};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// A reserved attachment cell. Identity is the full tuple; two ports never
/// share a `(node, point)` pair within one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port {
    pub node: NodeId,
    pub side: Side,
    pub point: Point,
    pub owner: ConnectionId,
}

#[derive(Debug, Default)]
pub struct PortManager {
    reserved: BTreeMap<(NodeId, Side), SmallVec<[Port; 4]>>,
}

impl PortManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The candidate port cells of a side: the run one unit outside the
    /// border, minus the cell nearest each corner, where connections would
    /// collide with the perpendicular sides' traffic.
    pub fn candidates(rect: &Rect, side: Side) -> Vec<Point> {
        match side {
            Side::North => {
                let y = rect.min_y() - 1;
                (rect.min_x() + 1..rect.max_x()).map(|x| Point::new(x, y)).collect()
            }
            Side::South => {
                let y = rect.max_y() + 1;
                (rect.min_x() + 1..rect.max_x()).map(|x| Point::new(x, y)).collect()
            }
            Side::West => {
                let x = rect.min_x() - 1;
                (rect.min_y() + 1..rect.max_y()).map(|y| Point::new(x, y)).collect()
            }
            Side::East => {
                let x = rect.max_x() + 1;
                (rect.min_y() + 1..rect.max_y()).map(|y| Point::new(x, y)).collect()
            }
        }
    }

    /// Reserves the free candidate nearest `preferred` by Manhattan
    /// distance. Ties go to the lower coordinate along the edge, which the
    /// ascending candidate order provides.
    pub fn reserve(
        &mut self,
        node: NodeId,
        rect: &Rect,
        side: Side,
        owner: ConnectionId,
        preferred: Point,
    ) -> Result<Port, RenderError> {
        let taken = self.reserved.entry((node, side)).or_default();

        let mut best: Option<Point> = None;
        let mut best_distance = u32::MAX;

        for candidate in Self::candidates(rect, side) {
            if taken.iter().any(|p| p.point == candidate) {
                continue;
            }

            let distance = candidate.manhattan_distance(&preferred);
            if distance < best_distance {
                best = Some(candidate);
                best_distance = distance;
            }
        }

        let Some(point) = best else {
            return Err(RenderError::PortExhausted { node, side });
        };

        let port = Port {
            node,
            side,
            point,
            owner,
        };
        taken.push(port);
        Ok(port)
    }

    /// Removes a reservation by identity. Unknown ports are ignored.
    pub fn release(&mut self, port: &Port) {
        if let Some(taken) = self.reserved.get_mut(&(port.node, port.side)) {
            taken.retain(|p| p != port);
        }
    }

    /// Removes every reservation held by one connection. Used when a batch
    /// aborts and already-routed connections must give their ports back.
    pub fn release_owned_by(&mut self, owner: ConnectionId) {
        for taken in self.reserved.values_mut() {
            taken.retain(|p| p.owner != owner);
        }
    }

    /// Number of ports currently reserved on one side of a node. The
    /// router's congestion tie-break reads this.
    pub fn occupied(&self, node: NodeId, side: Side) -> usize {
        self.reserved
            .get(&(node, side))
            .map_or(0, |taken| taken.len())
    }

    /// All reservations, in deterministic `(node, side)` order.
    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.reserved.values().flat_map(|taken| taken.iter())
    }

    pub fn is_reserved(&self, node: NodeId, point: &Point) -> bool {
        self.iter().any(|p| p.node == node && p.point == *point)
    }

    /// Forgets every reservation. Must run between renders; a stale manager
    /// refuses ports that nothing is using anymore.
    pub fn reset(&mut self) {
        self.reserved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect() -> Rect {
        // A 6x3 node at the origin.
        Rect::from_xywh(0, 0, 6, 3)
    }

    #[test]
    fn candidates_exclude_corner_cells() {
        let north = PortManager::candidates(&rect(), Side::North);
        assert_eq!(
            north,
            vec![
                Point::new(1, -1),
                Point::new(2, -1),
                Point::new(3, -1),
                Point::new(4, -1)
            ]
        );

        let east = PortManager::candidates(&rect(), Side::East);
        assert_eq!(east, vec![Point::new(6, 1)]);
    }

    #[test]
    fn reserve_prefers_the_hint() {
        let mut ports = PortManager::new();

        let port = ports
            .reserve(NodeId(1), &rect(), Side::North, ConnectionId(1), Point::new(4, -1))
            .unwrap();
        assert_eq!(port.point, Point::new(4, -1));
    }

    #[test]
    fn ties_break_toward_lower_coordinate() {
        let mut ports = PortManager::new();

        // (2,-1) and (4,-1) are equidistant from the hint; the lower x wins.
        let port = ports
            .reserve(NodeId(1), &rect(), Side::North, ConnectionId(1), Point::new(3, -1))
            .unwrap();
        assert_eq!(port.point, Point::new(3, -1));

        let port = ports
            .reserve(NodeId(1), &rect(), Side::North, ConnectionId(2), Point::new(3, -1))
            .unwrap();
        assert_eq!(port.point, Point::new(2, -1));
    }

    #[test]
    fn no_point_is_reserved_twice() {
        let mut ports = PortManager::new();

        let hint = Point::new(2, -1);
        let a = ports
            .reserve(NodeId(1), &rect(), Side::North, ConnectionId(1), hint)
            .unwrap();
        let b = ports
            .reserve(NodeId(1), &rect(), Side::North, ConnectionId(2), hint)
            .unwrap();

        assert_ne!(a.point, b.point);
        assert!(ports.is_reserved(NodeId(1), &a.point));
        assert!(ports.is_reserved(NodeId(1), &b.point));
    }

    #[test]
    fn side_exhaustion() {
        let mut ports = PortManager::new();

        // The east side of a height-3 node has exactly one candidate.
        let hint = Point::new(6, 1);
        ports
            .reserve(NodeId(1), &rect(), Side::East, ConnectionId(1), hint)
            .unwrap();

        let err = ports
            .reserve(NodeId(1), &rect(), Side::East, ConnectionId(2), hint)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::PortExhausted {
                node: NodeId(1),
                side: Side::East
            }
        ));
    }

    #[test]
    fn release_frees_the_cell() {
        let mut ports = PortManager::new();

        let hint = Point::new(6, 1);
        let port = ports
            .reserve(NodeId(1), &rect(), Side::East, ConnectionId(1), hint)
            .unwrap();

        ports.release(&port);
        assert_eq!(ports.occupied(NodeId(1), Side::East), 0);
        assert!(ports
            .reserve(NodeId(1), &rect(), Side::East, ConnectionId(2), hint)
            .is_ok());
    }

    #[test]
    fn release_owned_by_clears_a_whole_connection() {
        let mut ports = PortManager::new();

        ports
            .reserve(NodeId(1), &rect(), Side::North, ConnectionId(7), Point::new(1, -1))
            .unwrap();
        ports
            .reserve(NodeId(2), &rect(), Side::South, ConnectionId(7), Point::new(1, 3))
            .unwrap();
        ports
            .reserve(NodeId(1), &rect(), Side::North, ConnectionId(8), Point::new(4, -1))
            .unwrap();

        ports.release_owned_by(ConnectionId(7));

        assert_eq!(ports.occupied(NodeId(1), Side::North), 1);
        assert_eq!(ports.occupied(NodeId(2), Side::South), 0);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut ports = PortManager::new();

        ports
            .reserve(NodeId(1), &rect(), Side::East, ConnectionId(1), Point::new(6, 1))
            .unwrap();
        ports.reset();
        assert_eq!(ports.occupied(NodeId(1), Side::East), 0);
    }
}
