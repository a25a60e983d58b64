//! Implements the rectangular board the game is played on.
use serde::{Deserialize, Serialize};

use crate::board::{Coordinate, Orientation};

/// Simple rectangular dimensions. Cells are linearized row by row starting from the
/// bottom-left cell, so index `y * width + x` holds [`Coordinate`] `(x, y)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RectDimensions {
    /// Width of the board. This cooresponds to the `x` [`Coordinate`].
    width: usize,
    /// Height of the board. This cooresponds to the `y` [`Coordinate`].
    height: usize,
}

impl RectDimensions {
    /// Create new [`RectDimensions`] with the specified width and height.
    /// Panics if `width * height` exceeds `usize::max_value()` or if `width` or `height` is 0.
    pub fn new(width: usize, height: usize) -> Self {
        match Self::try_new(width, height) {
            Some(dim) => dim,
            None => {
                if width == 0 || height == 0 {
                    panic!("RectDimensions must be nonzero, got {}x{}", width, height);
                } else {
                    panic!(
                        "RectDimensions too large: {} * {} > {}",
                        width,
                        height,
                        usize::max_value()
                    );
                }
            }
        }
    }

    /// Create new [`RectDimensions`] with the specified width and height.
    /// Returns `None` if `width * height` exceeds `usize::max_value()` or if `width` or `height`
    /// is 0.
    pub fn try_new(width: usize, height: usize) -> Option<Self> {
        if width == 0 || height == 0 {
            None
        } else {
            width.checked_mul(height).map(|_| Self { width, height })
        }
    }

    /// Get the width of these [`RectDimensions`].
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the height of these [`RectDimensions`].
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells on the board. Shot grids are allocated with this length.
    pub fn total_size(&self) -> usize {
        self.width * self.height
    }

    /// Returns true if `index` names a cell on this board.
    pub fn contains_index(&self, index: usize) -> bool {
        index < self.total_size()
    }

    /// Convert a coordinate to a linear index within this dimension.
    /// Returns `None` if the coordinate is out of range for the dimension.
    pub fn try_linearize(&self, coord: &Coordinate) -> Option<usize> {
        if coord.x < self.width && coord.y < self.height {
            Some(coord.y * self.width + coord.x)
        } else {
            None
        }
    }

    /// Convert a linear index back into a [`Coordinate`]. Indexes past the end of the
    /// board produce coordinates past the top row.
    pub fn un_linearize(&self, idx: usize) -> Coordinate {
        Coordinate {
            x: idx % self.width,
            y: idx / self.width,
        }
    }

    /// Index of the cell one step from `index` in the given direction, if that cell is
    /// on the board. Horizontal steps never wrap onto the neighbouring row.
    pub fn step(&self, index: usize, dir: Orientation) -> Option<usize> {
        if !self.contains_index(index) {
            return None;
        }
        self.un_linearize(index)
            .offset(dir.step())
            .and_then(|coord| self.try_linearize(&coord))
    }

    /// Check whether a footprint with the given unrotated extents, anchored at `pivot`
    /// and turned to `orientation`, lies entirely on the board. Footprints extend right
    /// and down from the pivot when facing `Right`; each quarter turn rotates that
    /// quadrant counter-clockwise.
    pub fn fits(
        &self,
        width: usize,
        height: usize,
        pivot: Coordinate,
        orientation: Orientation,
    ) -> bool {
        if width == 0 || height == 0 || self.try_linearize(&pivot).is_none() {
            return false;
        }
        let (w, h) = if orientation.is_vertical() {
            (height, width)
        } else {
            (width, height)
        };
        let reaches_right = pivot.x.saturating_add(w) <= self.width;
        let reaches_left = pivot.x + 1 >= w;
        let reaches_up = pivot.y.saturating_add(h) <= self.height;
        let reaches_down = pivot.y + 1 >= h;
        match orientation {
            Orientation::Right => reaches_right && reaches_down,
            Orientation::Up => reaches_right && reaches_up,
            Orientation::Left => reaches_left && reaches_up,
            Orientation::Down => reaches_left && reaches_down,
        }
    }
}

impl Default for RectDimensions {
    /// Construct the default rectangular dimensions, a 10x10 board.
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
        }
    }
}
