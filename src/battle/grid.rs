//! Square grid coordinates for battle maps
//!
//! Weapon reach and adjacency use Chebyshev distance, vision and barrage
//! radii use Manhattan distance, and movement expands over the 4-neighbourhood.

use serde::{Deserialize, Serialize};

/// Grid coordinate (x grows east, y grows south)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// max(|dx|, |dy|)
    pub fn chebyshev(&self, other: &Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }

    /// |dx| + |dy|
    pub fn manhattan(&self, other: &Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Orthogonal neighbours (movement graph)
    pub fn neighbors(&self) -> [GridCoord; 4] {
        [
            self.offset(1, 0),
            self.offset(0, -1),
            self.offset(-1, 0),
            self.offset(0, 1),
        ]
    }

    /// All tiles with Manhattan distance <= range (inclusive of self)
    pub fn tiles_within_manhattan(&self, range: u32) -> Vec<GridCoord> {
        let range = range as i32;
        let mut results = Vec::new();
        for dy in -range..=range {
            let span = range - dy.abs();
            for dx in -span..=span {
                results.push(self.offset(dx, dy));
            }
        }
        results
    }

    /// All tiles with Chebyshev distance <= range (inclusive of self)
    pub fn tiles_within_chebyshev(&self, range: u32) -> Vec<GridCoord> {
        let range = range as i32;
        let mut results = Vec::with_capacity(((2 * range + 1) * (2 * range + 1)) as usize);
        for dy in -range..=range {
            for dx in -range..=range {
                results.push(self.offset(dx, dy));
            }
        }
        results
    }

    /// Bresenham line from self to other (inclusive of both ends)
    pub fn line_to(&self, other: &Self) -> Vec<GridCoord> {
        let dx = (other.x - self.x).abs();
        let dy = -(other.y - self.y).abs();
        let sx = if self.x < other.x { 1 } else { -1 };
        let sy = if self.y < other.y { 1 } else { -1 };

        let mut results = Vec::with_capacity((dx.max(-dy) + 1) as usize);
        let mut x = self.x;
        let mut y = self.y;
        let mut err = dx + dy;

        loop {
            results.push(GridCoord::new(x, y));
            if x == other.x && y == other.y {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        results
    }

    /// Unit step towards `other` if the two tiles share a row, column or diagonal
    pub fn straight_direction_to(&self, other: &Self) -> Option<Direction> {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx == 0 && dy == 0 {
            return None;
        }
        if dx != 0 && dy != 0 && dx.abs() != dy.abs() {
            return None;
        }
        Direction::from_step(dx.signum(), dy.signum())
    }
}

/// The eight compass steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// Offset for one step in this direction
    pub fn step(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::NorthEast => (1, -1),
            Direction::East => (1, 0),
            Direction::SouthEast => (1, 1),
            Direction::South => (0, 1),
            Direction::SouthWest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::NorthWest => (-1, -1),
        }
    }

    pub fn from_step(dx: i32, dy: i32) -> Option<Self> {
        match (dx, dy) {
            (0, -1) => Some(Direction::North),
            (1, -1) => Some(Direction::NorthEast),
            (1, 0) => Some(Direction::East),
            (1, 1) => Some(Direction::SouthEast),
            (0, 1) => Some(Direction::South),
            (-1, 1) => Some(Direction::SouthWest),
            (-1, 0) => Some(Direction::West),
            (-1, -1) => Some(Direction::NorthWest),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::NorthEast => Direction::SouthWest,
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::South => Direction::North,
            Direction::SouthWest => Direction::NorthEast,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
        }
    }
}

/// Number of tiles in a `width` x `height` grid, computed in `usize`
pub fn tile_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}
