//! Grid path finding.
//!
//! A* over an implicit four-connected grid. The cost model distinguishes
//! straight moves from turns and can reward hugging obstacles; the
//! heuristic is Manhattan distance times the straight cost, which never
//! over-estimates as long as a straight move is the cheapest one.
//!
//! Ties in the frontier are broken by insertion order, which makes the
//! search fully deterministic: equal-cost layouts expand in the order they
//! were discovered, on every run and platform.
use crate::config::PathCost;
use crate::geometry::{Direction, Point, Rect};
use smallvec::SmallVec;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// The output of one search: the visited cells reduced to segment
/// endpoints, and the accumulated cost of the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundPath {
    pub points: Vec<Point>,
    pub cost: i64,
}

/// Search state: a cell plus the direction it was entered from. The same
/// cell entered from a different direction is a different state, because
/// the cost of leaving it differs.
type State = (Point, Option<Direction>);

#[derive(Debug, Clone)]
pub struct GridPathFinder {
    cost: PathCost,
}

impl GridPathFinder {
    pub fn new(cost: PathCost) -> Self {
        Self { cost }
    }

    /// Finds an orthogonal path from `start` to `goal` avoiding every cell
    /// the predicate blocks, searching inside `bounds`. The first and last
    /// points of the result equal the inputs. Returns `None` when the goal
    /// is unreachable.
    pub fn find<F>(&self, start: Point, goal: Point, bounds: &Rect, blocked: &F) -> Option<FoundPath>
    where
        F: Fn(&Point) -> bool,
    {
        if start == goal {
            return Some(FoundPath {
                points: vec![start],
                cost: 0,
            });
        }

        let straight = self.cost.straight as i64;

        // (f, insertion order) priority; the counter is strictly monotonic.
        let mut open: BinaryHeap<Reverse<(i64, u64, Point, Option<Direction>)>> = BinaryHeap::new();
        let mut sequence: u64 = 0;
        let mut best_g: HashMap<State, i64> = HashMap::new();
        let mut came_from: HashMap<State, State> = HashMap::new();

        let h = |p: &Point| p.manhattan_distance(&goal) as i64 * straight;

        best_g.insert((start, None), 0);
        open.push(Reverse((h(&start), sequence, start, None)));

        while let Some(Reverse((_, _, point, entered))) = open.pop() {
            let state = (point, entered);
            let g = best_g[&state];

            if point == goal {
                let cells = self.reconstruct(&came_from, state);
                return Some(FoundPath {
                    points: self.simplify(cells, blocked),
                    cost: g,
                });
            }

            let successors: SmallVec<[Direction; 4]> = Direction::ALL
                .iter()
                .copied()
                .filter(|d| entered.map_or(true, |e| *d != e.opposite()))
                .collect();

            for direction in successors {
                let next = point.step(direction);

                if !bounds.contains(&next) {
                    continue;
                }
                if next != goal && blocked(&next) {
                    continue;
                }

                let mut step_cost = straight;
                if let Some(entered) = entered {
                    if entered != direction {
                        step_cost += self.cost.turn as i64;
                    }
                }
                if self.touches_obstacle(&next, blocked) {
                    step_cost += self.cost.proximity as i64;
                }

                let next_state = (next, Some(direction));
                let tentative = g + step_cost;

                if best_g
                    .get(&next_state)
                    .map_or(true, |&known| tentative < known)
                {
                    best_g.insert(next_state, tentative);
                    came_from.insert(next_state, state);
                    sequence += 1;
                    open.push(Reverse((tentative + h(&next), sequence, next, Some(direction))));
                }
            }
        }

        None
    }

    fn touches_obstacle<F>(&self, p: &Point, blocked: &F) -> bool
    where
        F: Fn(&Point) -> bool,
    {
        if self.cost.proximity == 0 {
            return false;
        }

        Direction::ALL.iter().any(|d| blocked(&p.step(*d)))
    }

    fn reconstruct(&self, came_from: &HashMap<State, State>, mut state: State) -> Vec<Point> {
        let mut cells = vec![state.0];

        while let Some(previous) = came_from.get(&state) {
            cells.push(previous.0);
            state = *previous;
        }

        cells.reverse();
        cells
    }

    /// Reduces a cell walk to segment endpoints and runs the
    /// turn-minimization pass: for each corner `b` between `a` and `c`, the
    /// opposite corner of the `a`–`c` rectangle replaces it when the
    /// re-routed legs are unobstructed and the total number of turns does
    /// not grow.
    fn simplify<F>(&self, cells: Vec<Point>, blocked: &F) -> Vec<Point>
    where
        F: Fn(&Point) -> bool,
    {
        let mut points = coalesce(&cells);

        let mut i = 1;
        while i + 1 < points.len() {
            let (a, b, c) = (points[i - 1], points[i], points[i + 1]);
            let alternative = if b == Point::new(a.x, c.y) {
                Point::new(c.x, a.y)
            } else {
                Point::new(a.x, c.y)
            };

            if alternative != b
                && segment_is_clear(&a, &alternative, blocked)
                && segment_is_clear(&alternative, &c, blocked)
            {
                let mut candidate = points.clone();
                candidate[i] = alternative;
                let candidate = coalesce(&candidate);

                if is_orthogonal_walk(&candidate) && count_turns(&candidate) <= count_turns(&points)
                {
                    let shrunk = candidate.len() < points.len();
                    points = candidate;
                    // Stay on the same index only when vertices were
                    // merged away; advancing otherwise keeps the pass from
                    // flipping one corner back and forth.
                    if shrunk {
                        continue;
                    }
                }
            }

            i += 1;
        }

        points
    }
}

/// Collapses colinear runs, keeping only segment endpoints. Consecutive
/// duplicates are dropped as well.
pub fn coalesce(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());

    for &p in points {
        if out.last() == Some(&p) {
            continue;
        }

        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            if (a.x == b.x && b.x == p.x) || (a.y == b.y && b.y == p.y) {
                *out.last_mut().unwrap() = p;
                continue;
            }
        }

        out.push(p);
    }

    out
}

/// Number of direction changes along a vertex list.
pub fn count_turns(points: &[Point]) -> usize {
    points.len().saturating_sub(2)
}

/// Whether every consecutive pair shares a row or a column and no segment
/// doubles back on the previous one.
fn is_orthogonal_walk(points: &[Point]) -> bool {
    for window in points.windows(2) {
        if window[0].vh_direction(&window[1]).is_none() {
            return false;
        }
    }
    for window in points.windows(3) {
        let d1 = window[0].vh_direction(&window[1]);
        let d2 = window[1].vh_direction(&window[2]);
        if let (Some(d1), Some(d2)) = (d1, d2) {
            if d1.opposite() == d2 {
                return false;
            }
        }
    }

    true
}

/// Whether every cell of the axis-aligned segment, endpoints excluded, is
/// free.
fn segment_is_clear<F>(a: &Point, b: &Point, blocked: &F) -> bool
where
    F: Fn(&Point) -> bool,
{
    let Some(direction) = a.vh_direction(b) else {
        // Zero-length segments are trivially clear.
        return a == b;
    };

    let mut p = a.step(direction);
    while p != *b {
        if blocked(&p) {
            return false;
        }
        p = p.step(direction);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder() -> GridPathFinder {
        GridPathFinder::new(PathCost::default())
    }

    fn open_bounds() -> Rect {
        Rect::from_xywh(-5, -5, 40, 40)
    }

    fn unblocked(_: &Point) -> bool {
        false
    }

    #[test]
    fn straight_line() {
        let path = finder()
            .find(Point::new(0, 0), Point::new(6, 0), &open_bounds(), &unblocked)
            .unwrap();

        assert_eq!(path.points, vec![Point::new(0, 0), Point::new(6, 0)]);
        assert_eq!(path.cost, 60);
    }

    #[test]
    fn single_turn() {
        let path = finder()
            .find(Point::new(0, 0), Point::new(4, 3), &open_bounds(), &unblocked)
            .unwrap();

        // One corner; both L-shapes cost the same, insertion order picks one
        // deterministically.
        assert_eq!(path.points.len(), 3);
        assert_eq!(path.points.first(), Some(&Point::new(0, 0)));
        assert_eq!(path.points.last(), Some(&Point::new(4, 3)));
        assert_eq!(path.cost, 90);
    }

    #[test]
    fn detours_around_a_wall() {
        // A vertical wall at x = 3 with a gap at y = 5.
        let blocked = |p: &Point| p.x == 3 && p.y != 5;

        let path = finder()
            .find(Point::new(0, 0), Point::new(6, 0), &open_bounds(), &blocked)
            .unwrap();

        assert_eq!(path.points.first(), Some(&Point::new(0, 0)));
        assert_eq!(path.points.last(), Some(&Point::new(6, 0)));

        // The gap is the only way through; some segment must cover it.
        let mut cells = vec![];
        for window in path.points.windows(2) {
            let direction = window[0].vh_direction(&window[1]).unwrap();
            let mut p = window[0];
            while p != window[1] {
                cells.push(p);
                p = p.step(direction);
            }
        }
        cells.push(*path.points.last().unwrap());
        assert!(cells.contains(&Point::new(3, 5)));
    }

    #[test]
    fn no_path_when_walled_in() {
        // A solid ring around the start.
        let blocked = |p: &Point| {
            let d = p.manhattan_distance(&Point::new(0, 0));
            p.x.abs().max(p.y.abs()) == 2 && d <= 4
        };

        let result = finder().find(Point::new(0, 0), Point::new(10, 0), &open_bounds(), &blocked);
        assert!(result.is_none());
    }

    #[test]
    fn search_respects_bounds() {
        let bounds = Rect::from_xywh(0, 0, 5, 1);

        // The only route around the wall would leave the one-row corridor.
        let blocked = |p: &Point| p.x == 2;
        let result = finder().find(Point::new(0, 0), Point::new(4, 0), &bounds, &blocked);
        assert!(result.is_none());
    }

    #[test]
    fn trivial_when_start_equals_goal() {
        let path = finder()
            .find(Point::new(3, 3), Point::new(3, 3), &open_bounds(), &unblocked)
            .unwrap();

        assert_eq!(path.points, vec![Point::new(3, 3)]);
        assert_eq!(path.cost, 0);
    }

    #[test]
    fn deterministic_across_runs() {
        let blocked = |p: &Point| (p.x == 4 && (2..8).contains(&p.y)) || (p.y == 4 && p.x > 6);

        let a = finder().find(Point::new(0, 4), Point::new(12, 4), &open_bounds(), &blocked);
        let b = finder().find(Point::new(0, 4), Point::new(12, 4), &open_bounds(), &blocked);

        assert_eq!(a, b);
    }

    #[test]
    fn coalesce_collapses_colinear_runs() {
        let cells = vec![
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(2, 0),
            Point::new(2, 1),
            Point::new(2, 2),
        ];

        assert_eq!(
            coalesce(&cells),
            vec![Point::new(0, 0), Point::new(2, 0), Point::new(2, 2)]
        );
    }

    #[test]
    fn coalesce_drops_duplicates() {
        let cells = vec![Point::new(0, 0), Point::new(0, 0), Point::new(3, 0)];
        assert_eq!(coalesce(&cells), vec![Point::new(0, 0), Point::new(3, 0)]);
    }

    #[test]
    fn turn_count() {
        assert_eq!(count_turns(&[Point::new(0, 0), Point::new(5, 0)]), 0);
        assert_eq!(
            count_turns(&[Point::new(0, 0), Point::new(5, 0), Point::new(5, 5)]),
            1
        );
    }
}
