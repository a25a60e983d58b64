//! Write-once turn grids. Both the shot grid and the ship-damage track are grids of
//! cells that start unmarked and record the turn on which they were first marked.

use std::ops::{Index, Range};

use serde::{Deserialize, Serialize};

/// Turn number. The first turn of a battle is `1`.
pub type Turn = u32;

/// Fixed-length array of cells which each record the turn they were marked on. Once a
/// cell holds a turn it never changes again.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TurnGrid {
    cells: Box<[Option<Turn>]>,
}

impl TurnGrid {
    /// Construct a grid with `len` unmarked cells.
    pub fn new(len: usize) -> Self {
        Self {
            cells: vec![None; len].into_boxed_slice(),
        }
    }

    /// Number of cells in the grid.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Get the turn the cell at `idx` was marked on. Returns `None` if the cell is
    /// unmarked or out of range.
    pub fn turn(&self, idx: usize) -> Option<Turn> {
        self.cells.get(idx).copied().flatten()
    }

    /// Returns true if the cell at `idx` exists and has been marked.
    pub fn is_marked(&self, idx: usize) -> bool {
        self.turn(idx).is_some()
    }

    /// Record `turn` into the cell at `idx`. Returns `false` without changing anything
    /// if the cell is out of range or was already marked.
    pub fn mark(&mut self, idx: usize, turn: Turn) -> bool {
        match self.cells.get_mut(idx) {
            Some(cell @ None) => {
                *cell = Some(turn);
                true
            }
            _ => false,
        }
    }

    /// Find the first unmarked cell within `range`.
    pub fn first_unmarked_in(&self, range: Range<usize>) -> Option<usize> {
        let end = range.end.min(self.cells.len());
        (range.start..end).find(|&idx| self.cells[idx].is_none())
    }

    /// Count the marked cells.
    pub fn marked_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Iterate over every cell in index order.
    pub fn iter(&self) -> impl '_ + Iterator<Item = Option<Turn>> {
        self.cells.iter().copied()
    }
}

impl Index<usize> for TurnGrid {
    type Output = Option<Turn>;

    fn index(&self, idx: usize) -> &Self::Output {
        &self.cells[idx]
    }
}
