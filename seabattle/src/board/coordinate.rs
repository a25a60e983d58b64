use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

/// The coordinates of a cell on the board. `x` grows to the right and `y` grows upwards,
/// so `(0, 0)` is the bottom-left cell.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// Horizontal position of the cell.
    pub x: usize,
    /// Vertical position of the cell.
    pub y: usize,
}

impl Coordinate {
    /// Construct a [`Coordinate`] from the given `x` and `y`.
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Move this coordinate by the given [`Offset`]. Returns `None` if the result would
    /// have a negative component. Does not check any board bounds.
    pub fn offset(self, offset: Offset) -> Option<Self> {
        let x = usize::try_from(self.x as i64 + i64::from(offset.dx)).ok()?;
        let y = usize::try_from(self.y as i64 + i64::from(offset.dy)).ok()?;
        Some(Self { x, y })
    }
}

impl From<(usize, usize)> for Coordinate {
    /// Construct a [`Coordinate`] from the given `(x, y)` pair.
    fn from((x, y): (usize, usize)) -> Self {
        Self::new(x, y)
    }
}

impl From<Coordinate> for (usize, usize) {
    /// Convert the [`Coordinate`] into an `(x, y)` pair.
    fn from(coord: Coordinate) -> Self {
        (coord.x, coord.y)
    }
}

/// Signed displacement of a ship part from the ship's pivot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    /// The pivot itself.
    pub const ZERO: Offset = Offset { dx: 0, dy: 0 };

    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

impl From<(i32, i32)> for Offset {
    fn from((dx, dy): (i32, i32)) -> Self {
        Self::new(dx, dy)
    }
}
