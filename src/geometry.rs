//! Integer cell geometry.
//!
//! Every coordinate in this crate is a terminal cell: the origin is the
//! top-left corner, `x` grows rightward and `y` grows downward. Signed
//! integers are used so that intermediate results (ports one cell outside a
//! node, loop stubs above the top row) can temporarily leave the canvas;
//! the renderer translates everything back into non-negative space before
//! drawing.
use derive_more::Display;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display(fmt = "({}, {})", x, y)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { x: 0, y: 0 }
    }

    /// Returns the Manhattan distance from this `Point` to a specified point.
    pub fn manhattan_distance(&self, other: &Point) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Returns the squared Euclidean distance. Used for nearest-first
    /// connection ordering where only comparisons matter.
    pub fn distance_squared(&self, other: &Point) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// The neighbouring point one cell away in `direction`.
    pub fn step(&self, direction: Direction) -> Point {
        let (dx, dy) = direction.delta();
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    /// Direction from this point to an axis-aligned neighbour point.
    ///
    /// Both points must share a row or a column; diagonal pairs have no
    /// vertical-or-horizontal direction and return `None`.
    pub fn vh_direction(&self, other: &Point) -> Option<Direction> {
        if self.x == other.x && self.y != other.y {
            if other.y < self.y {
                Some(Direction::Up)
            } else {
                Some(Direction::Down)
            }
        } else if self.y == other.y && self.x != other.x {
            if other.x < self.x {
                Some(Direction::Left)
            } else {
                Some(Direction::Right)
            }
        } else {
            None
        }
    }
}

/// A movement along the grid. Paths only ever travel in these four
/// directions; diagonals do not exist in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum Direction {
    #[display(fmt = "up")]
    Up,
    #[display(fmt = "down")]
    Down,
    #[display(fmt = "left")]
    Left,
    #[display(fmt = "right")]
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub const fn delta(&self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub const fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub const fn is_horizontal(&self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }
}

/// One of the four borders of a node rectangle. Ports live one cell outside
/// a side; the side also fixes the outward normal used for waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum Side {
    #[display(fmt = "north")]
    North,
    #[display(fmt = "south")]
    South,
    #[display(fmt = "east")]
    East,
    #[display(fmt = "west")]
    West,
}

impl Side {
    /// The outward normal of the side.
    pub const fn outward(&self) -> Direction {
        match self {
            Side::North => Direction::Up,
            Side::South => Direction::Down,
            Side::East => Direction::Right,
            Side::West => Direction::Left,
        }
    }

    /// `true` for the two sides whose border runs horizontally.
    pub const fn is_horizontal(&self) -> bool {
        matches!(self, Side::North | Side::South)
    }

    pub const fn opposite(&self) -> Side {
        match self {
            Side::North => Side::South,
            Side::South => Side::North,
            Side::East => Side::West,
            Side::West => Side::East,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self {
            width: 0,
            height: 0,
        }
    }
}

/// Corners and centers of a cell rectangle.
///
/// The rectangle covers the cells `min_x()..=max_x()` × `min_y()..=max_y()`;
/// `max_x`/`max_y` name the last covered cell, not the one past it.
///
/// ```svgbob
///           minX    midX    maxX
///   (origin) *----------*----------*
///            |                     |
///            |                     |
///            * (center) *          * midY
///            |                     |
///            |                     |
///            *----------*----------* maxY
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    pub const fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    #[inline]
    pub fn min_x(&self) -> i32 {
        self.origin.x
    }

    #[inline]
    pub fn mid_x(&self) -> i32 {
        self.origin.x + self.size.width / 2
    }

    #[inline]
    pub fn max_x(&self) -> i32 {
        self.origin.x + self.size.width - 1
    }

    #[inline]
    pub fn min_y(&self) -> i32 {
        self.origin.y
    }

    #[inline]
    pub fn mid_y(&self) -> i32 {
        self.origin.y + self.size.height / 2
    }

    #[inline]
    pub fn max_y(&self) -> i32 {
        self.origin.y + self.size.height - 1
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.size.height
    }

    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    /// The cell at the middle of a side's border run.
    pub fn side_center(&self, side: Side) -> Point {
        match side {
            Side::North => Point::new(self.mid_x(), self.min_y()),
            Side::South => Point::new(self.mid_x(), self.max_y()),
            Side::East => Point::new(self.max_x(), self.mid_y()),
            Side::West => Point::new(self.min_x(), self.mid_y()),
        }
    }

    /// Returns a rectangle grown by `d` cells on every side (`d` may be
    /// negative to shrink; a rectangle shrunk past empty keeps zero size).
    pub fn expand(&self, d: i32) -> Rect {
        let width = (self.size.width + d * 2).max(0);
        let height = (self.size.height + d * 2).max(0);

        Rect::from_xywh(self.origin.x - d, self.origin.y - d, width, height)
    }

    /// Whether the rectangle covers the cell, border included.
    pub fn contains(&self, point: &Point) -> bool {
        self.size.width > 0
            && self.size.height > 0
            && point.x >= self.min_x()
            && point.x <= self.max_x()
            && point.y >= self.min_y()
            && point.y <= self.max_y()
    }

    /// Whether the cell lies strictly inside the rectangle, border excluded.
    pub fn contains_interior(&self, point: &Point) -> bool {
        point.x > self.min_x()
            && point.x < self.max_x()
            && point.y > self.min_y()
            && point.y < self.max_y()
    }

    /// Whether the cell lies on the rectangle's one-cell border ring.
    pub fn on_border(&self, point: &Point) -> bool {
        self.contains(point) && !self.contains_interior(point)
    }

    /// Whether two cell rectangles share at least one cell.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.size.width > 0
            && self.size.height > 0
            && other.size.width > 0
            && other.size.height > 0
            && self.min_x() <= other.max_x()
            && other.min_x() <= self.max_x()
            && self.min_y() <= other.max_y()
            && other.min_y() <= self.max_y()
    }

    /// The smallest rectangle covering both operands.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.size.width <= 0 || self.size.height <= 0 {
            return *other;
        }
        if other.size.width <= 0 || other.size.height <= 0 {
            return *self;
        }

        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());

        Rect::from_xywh(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }
}
