//! Grid geometry: cells, directions and the per-planet map snapshot.
//!
//! All coordinates are integers. Distances are compared squared to
//! avoid square roots, the same way the engine reports attack and
//! vision ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An integer coordinate on one planet's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl Cell {
    /// Create a new cell.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell in `dir` (or `self` for [`Direction::Center`]).
    #[must_use]
    pub const fn add(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Squared Euclidean distance.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> u32 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx * dx + dy * dy
    }

    /// Chebyshev distance: number of 8-directional steps on an open grid.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// True if `other` is one of the 8 neighbours or the cell itself.
    #[must_use]
    pub fn is_adjacent_to(self, other: Self) -> bool {
        self.distance_squared(other) <= 2
    }

    /// Direction of the first step from `self` toward `other`.
    #[must_use]
    pub fn direction_to(self, other: Self) -> Direction {
        Direction::from_delta((other.x - self.x).signum(), (other.y - self.y).signum())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Compass direction of a single step. `y` grows to the north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// +y
    North,
    /// +x +y
    Northeast,
    /// +x
    East,
    /// +x -y
    Southeast,
    /// -y
    South,
    /// -x -y
    Southwest,
    /// -x
    West,
    /// -x +y
    Northwest,
    /// No movement.
    Center,
}

impl Direction {
    /// The 8 movement directions in iteration order.
    pub const ALL: [Self; 8] = [
        Self::North,
        Self::Northeast,
        Self::East,
        Self::Southeast,
        Self::South,
        Self::Southwest,
        Self::West,
        Self::Northwest,
    ];

    /// Diagonal offsets, used to space structures apart.
    pub const DIAGONALS: [Self; 4] = [
        Self::Northeast,
        Self::Northwest,
        Self::Southeast,
        Self::Southwest,
    ];

    /// Cell offset for this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::Northeast => (1, 1),
            Self::East => (1, 0),
            Self::Southeast => (1, -1),
            Self::South => (0, -1),
            Self::Southwest => (-1, -1),
            Self::West => (-1, 0),
            Self::Northwest => (-1, 1),
            Self::Center => (0, 0),
        }
    }

    /// Direction for a unit offset; anything else maps to `Center`.
    #[must_use]
    pub const fn from_delta(dx: i32, dy: i32) -> Self {
        match (dx, dy) {
            (0, 1) => Self::North,
            (1, 1) => Self::Northeast,
            (1, 0) => Self::East,
            (1, -1) => Self::Southeast,
            (0, -1) => Self::South,
            (-1, -1) => Self::Southwest,
            (-1, 0) => Self::West,
            (-1, 1) => Self::Northwest,
            _ => Self::Center,
        }
    }
}

/// The two maps a match is played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Planet {
    /// Home planet; every match starts here.
    #[default]
    Earth,
    /// Launch destination.
    Mars,
}

impl Planet {
    /// The planet rockets from this one fly to.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Earth => Self::Mars,
            Self::Mars => Self::Earth,
        }
    }
}

/// A cell on a specific planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapLocation {
    /// Planet the cell belongs to.
    pub planet: Planet,
    /// Grid coordinate.
    pub cell: Cell,
}

impl MapLocation {
    /// Create a new map location.
    #[must_use]
    pub const fn new(planet: Planet, cell: Cell) -> Self {
        Self { planet, cell }
    }
}

/// Static terrain snapshot of one planet.
///
/// Holds passability and the resource deposits present at match start.
/// The engine owns the live state; the controller only reads this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanetMap {
    planet: Planet,
    width: u32,
    height: u32,
    /// Row-major passability.
    passable: Vec<bool>,
    /// Row-major starting karbonite.
    karbonite: Vec<u32>,
}

impl PlanetMap {
    /// Create a fully passable map without deposits.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(planet: Planet, width: u32, height: u32) -> Self {
        assert!(width > 0, "PlanetMap width must be positive");
        assert!(height > 0, "PlanetMap height must be positive");

        let cell_count = (width as usize) * (height as usize);
        Self {
            planet,
            width,
            height,
            passable: vec![true; cell_count],
            karbonite: vec![0; cell_count],
        }
    }

    /// Planet this map describes.
    #[must_use]
    pub const fn planet(&self) -> Planet {
        self.planet
    }

    /// Map width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn index(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| (cell.y as usize) * (self.width as usize) + (cell.x as usize))
    }

    /// Check if a cell lies on the map.
    #[must_use]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// Check if a cell is on the map and passable terrain.
    #[must_use]
    pub fn is_passable(&self, cell: Cell) -> bool {
        self.index(cell).is_some_and(|i| self.passable[i])
    }

    /// Set terrain passability. Returns `false` if out of bounds.
    pub fn set_passable(&mut self, cell: Cell, passable: bool) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.passable[i] = passable;
                true
            }
            None => false,
        }
    }

    /// Karbonite present at match start; zero out of bounds.
    #[must_use]
    pub fn initial_karbonite(&self, cell: Cell) -> u32 {
        self.index(cell).map_or(0, |i| self.karbonite[i])
    }

    /// Set a starting deposit. Returns `false` if out of bounds.
    pub fn set_initial_karbonite(&mut self, cell: Cell, amount: u32) -> bool {
        match self.index(cell) {
            Some(i) => {
                self.karbonite[i] = amount;
                true
            }
            None => false,
        }
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height as i32).flat_map(move |y| (0..self.width as i32).map(move |x| Cell::new(x, y)))
    }

    /// All passable cells in row-major order.
    pub fn passable_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.cells().filter(move |&c| self.is_passable(c))
    }
}
