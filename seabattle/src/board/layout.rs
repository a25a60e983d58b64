//! Fleet placement: computing the cells ships cover and validating whole fleets.
use serde::{Deserialize, Serialize};

use crate::{
    board::{CannotPlaceReason, Coordinate, Orientation, PlaceError},
    ships::{Ruleset, ShapeProjection, ShipIndex},
};

/// Where a ship's pivot sits and which way the ship faces.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ShipPose {
    pub pivot: Coordinate,
    pub orientation: Orientation,
}

impl ShipPose {
    pub fn new(pivot: Coordinate, orientation: Orientation) -> Self {
        Self { pivot, orientation }
    }
}

/// A fleet as submitted by a player: the cell grid plus, for each ship in rank order,
/// its orientation and pivot. The three records describe the same placement and must
/// agree with each other.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FleetSubmission {
    /// For every board cell, the ship occupying it.
    pub cells: Vec<Option<ShipIndex>>,
    pub orientations: Vec<Orientation>,
    pub pivots: Vec<Coordinate>,
}

impl FleetSubmission {
    /// Build a submission from one pose per ship, rasterizing the cell grid. Fails the
    /// same way [`validate_fleet`] would.
    pub fn from_poses(rules: &Ruleset, poses: &[ShipPose]) -> Result<Self, PlaceError> {
        let cells = rasterize(rules, poses)?;
        Ok(Self {
            cells: cells.into_vec(),
            orientations: poses.iter().map(|pose| pose.orientation).collect(),
            pivots: poses.iter().map(|pose| pose.pivot).collect(),
        })
    }

    /// Iterate the poses described by the parallel pivot and orientation records.
    pub fn poses(&self) -> impl '_ + Iterator<Item = ShipPose> {
        self.pivots
            .iter()
            .zip(self.orientations.iter())
            .map(|(&pivot, &orientation)| ShipPose { pivot, orientation })
    }
}

/// A validated, concealed fleet placement.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct FleetLayout {
    cells: Box<[Option<ShipIndex>]>,
    poses: Vec<ShipPose>,
}

impl FleetLayout {
    /// The ship occupying the cell at `idx`, if any.
    pub fn ship_at(&self, idx: usize) -> Option<ShipIndex> {
        self.cells.get(idx).copied().flatten()
    }

    /// Pose of every ship, in rank order.
    pub fn poses(&self) -> &[ShipPose] {
        &self.poses
    }

    /// Iterate over every occupied cell and the ship occupying it.
    pub fn occupied(&self) -> impl '_ + Iterator<Item = (usize, ShipIndex)> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell.map(|ship| (idx, ship)))
    }
}

/// Compute which cells the given ship covers in the given pose. Returns `None` if any
/// part falls off the board or the ship doesn't exist.
pub fn occupied_cells(rules: &Ruleset, ship: ShipIndex, pose: ShipPose) -> Option<ShapeProjection> {
    let dim = rules.dimensions();
    rules
        .ship_type(ship)
        .and_then(|ty| ty.footprint.project(pose, &dim))
}

/// Validate a full fleet submission. Every ship must lie on the board, no two ships may
/// share a cell, and the submitted cell grid must be exactly the cells the poses cover.
/// Nothing is accepted unless everything is.
pub fn validate_fleet(rules: &Ruleset, fleet: &FleetSubmission) -> Result<FleetLayout, PlaceError> {
    if fleet.pivots.len() != rules.ship_count() || fleet.orientations.len() != rules.ship_count()
    {
        return Err(PlaceError::new(CannotPlaceReason::WrongShipCount, None));
    }
    let poses: Vec<_> = fleet.poses().collect();
    let cells = rasterize(rules, &poses)?;
    if fleet.cells.len() != cells.len() {
        return Err(PlaceError::new(CannotPlaceReason::CellMismatch, None));
    }
    if let Some(idx) = (0..cells.len()).find(|&idx| fleet.cells[idx] != cells[idx]) {
        return Err(PlaceError::new(
            CannotPlaceReason::CellMismatch,
            fleet.cells[idx].or(cells[idx]),
        ));
    }
    Ok(FleetLayout { cells, poses })
}

/// Project every ship and build the cell grid. Bounds are checked for every ship before
/// any overlap is reported.
fn rasterize(rules: &Ruleset, poses: &[ShipPose]) -> Result<Box<[Option<ShipIndex>]>, PlaceError> {
    if poses.len() != rules.ship_count() {
        return Err(PlaceError::new(CannotPlaceReason::WrongShipCount, None));
    }
    let projections = poses
        .iter()
        .enumerate()
        .map(|(ship, &pose)| {
            occupied_cells(rules, ship, pose)
                .ok_or_else(|| PlaceError::new(CannotPlaceReason::OutOfBounds, Some(ship)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let mut cells = vec![None; rules.dimensions().total_size()].into_boxed_slice();
    for (ship, projection) in projections.into_iter().enumerate() {
        for idx in projection {
            if cells[idx].is_some() {
                return Err(PlaceError::new(CannotPlaceReason::Overlap, Some(ship)));
            }
            cells[idx] = Some(ship);
        }
    }
    Ok(cells)
}

/// A fleet being arranged one ship at a time, as a player drags ships around before
/// submitting. Moving a ship never collides with the cells it is moving away from.
#[derive(Debug, Clone)]
pub struct FleetDraft<'a> {
    rules: &'a Ruleset,

    /// Grid of cells occupied by ships placed so far.
    cells: Box<[Option<ShipIndex>]>,

    /// Pose of each ship, if it has been placed.
    poses: Vec<Option<ShipPose>>,
}

impl<'a> FleetDraft<'a> {
    /// Begin arranging an empty fleet.
    pub fn new(rules: &'a Ruleset) -> Self {
        Self {
            rules,
            cells: vec![None; rules.dimensions().total_size()].into_boxed_slice(),
            poses: vec![None; rules.ship_count()],
        }
    }

    /// Checks if every ship has been placed.
    pub fn ready(&self) -> bool {
        self.poses.iter().all(Option::is_some)
    }

    /// Get an iterator over the ships which still need to be placed.
    pub fn pending_ships(&self) -> impl '_ + Iterator<Item = ShipIndex> {
        self.poses
            .iter()
            .enumerate()
            .filter_map(|(ship, pose)| if pose.is_none() { Some(ship) } else { None })
    }

    /// The pose of the given ship, if placed.
    pub fn pose(&self, ship: ShipIndex) -> Option<ShipPose> {
        self.poses.get(ship).copied().flatten()
    }

    /// The ship occupying the cell at `idx`, if any.
    pub fn ship_at(&self, idx: usize) -> Option<ShipIndex> {
        self.cells.get(idx).copied().flatten()
    }

    /// Check where the ship would go without placing it. A cell currently held by the
    /// same ship does not count as a collision.
    pub fn check_placement(&self, ship: ShipIndex, pose: ShipPose) -> Result<ShapeProjection, PlaceError> {
        if ship >= self.poses.len() {
            return Err(PlaceError::new(CannotPlaceReason::WrongShipCount, Some(ship)));
        }
        let projection = occupied_cells(self.rules, ship, pose)
            .ok_or_else(|| PlaceError::new(CannotPlaceReason::OutOfBounds, Some(ship)))?;
        match projection
            .iter()
            .find(|&&idx| matches!(self.cells[idx], Some(other) if other != ship))
        {
            Some(_) => Err(PlaceError::new(CannotPlaceReason::Overlap, Some(ship))),
            None => Ok(projection),
        }
    }

    /// Place or move the ship. On failure the draft is unchanged.
    pub fn place(&mut self, ship: ShipIndex, pose: ShipPose) -> Result<(), PlaceError> {
        let projection = self.check_placement(ship, pose)?;
        self.unplace(ship);
        for idx in projection {
            self.cells[idx] = Some(ship);
        }
        self.poses[ship] = Some(pose);
        Ok(())
    }

    /// Clear the placement of the ship, returning its previous pose if it had one.
    pub fn unplace(&mut self, ship: ShipIndex) -> Option<ShipPose> {
        let pose = self.poses.get_mut(ship)?.take()?;
        for cell in self.cells.iter_mut() {
            if *cell == Some(ship) {
                *cell = None;
            }
        }
        Some(pose)
    }

    /// Remove every ship.
    pub fn clear(&mut self) {
        for ship in 0..self.poses.len() {
            self.unplace(ship);
        }
    }

    /// Build the submission for this draft if every ship has been placed.
    pub fn submission(&self) -> Option<FleetSubmission> {
        let poses = self.poses.iter().copied().collect::<Option<Vec<_>>>()?;
        Some(FleetSubmission {
            cells: self.cells.to_vec(),
            orientations: poses.iter().map(|pose| pose.orientation).collect(),
            pivots: poses.iter().map(|pose| pose.pivot).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn right(x: usize, y: usize) -> ShipPose {
        ShipPose::new(Coordinate::new(x, y), Orientation::Right)
    }

    /// One ship per row for the standard rules, starting at row 1 so the flagship's
    /// second row stays on the board. The gunboat's hook hangs into the submarine's row,
    /// so it sits further right.
    fn rows() -> Vec<ShipPose> {
        (0..9)
            .map(|ship| if ship == 6 { right(5, 7) } else { right(0, ship + 1) })
            .collect()
    }

    #[test]
    fn accepts_disjoint_fleet() {
        let rules = Ruleset::standard();
        let fleet = FleetSubmission::from_poses(&rules, &rows()).unwrap();
        let layout = validate_fleet(&rules, &fleet).unwrap();
        assert_eq!(layout.ship_at(10), Some(0));
        assert_eq!(layout.ship_at(0), Some(0));
        assert_eq!(layout.occupied().count(), 25 + 2);
    }

    #[test]
    fn rejects_out_of_bounds() {
        let rules = Ruleset::standard();
        let mut poses = rows();
        poses[1] = right(6, 2);
        let err = FleetSubmission::from_poses(&rules, &poses).unwrap_err();
        assert_eq!(err.reason(), CannotPlaceReason::OutOfBounds);
        assert_eq!(err.ship(), Some(1));
    }

    #[test]
    fn rejects_overlap() {
        let rules = Ruleset::standard();
        let mut poses = rows();
        // Battleship covers (0,3)-(3,3); drop the cruiser onto it vertically.
        poses[3] = ShipPose::new(Coordinate::new(2, 3), Orientation::Up);
        let err = FleetSubmission::from_poses(&rules, &poses).unwrap_err();
        assert_eq!(err.reason(), CannotPlaceReason::Overlap);
    }

    #[test]
    fn rejects_inconsistent_records() {
        let rules = Ruleset::standard();
        let mut fleet = FleetSubmission::from_poses(&rules, &rows()).unwrap();
        fleet.cells[99] = Some(4);
        let err = validate_fleet(&rules, &fleet).unwrap_err();
        assert_eq!(err.reason(), CannotPlaceReason::CellMismatch);

        let mut fleet = FleetSubmission::from_poses(&rules, &rows()).unwrap();
        fleet.pivots.pop();
        let err = validate_fleet(&rules, &fleet).unwrap_err();
        assert_eq!(err.reason(), CannotPlaceReason::WrongShipCount);
    }

    #[test]
    fn draft_moves_ship_over_itself() {
        let rules = Ruleset::standard();
        let mut draft = FleetDraft::new(&rules);
        draft.place(1, right(0, 5)).unwrap();
        // Shift the carrier one cell right; it overlaps its own old cells only.
        draft.place(1, right(1, 5)).unwrap();
        assert_eq!(draft.ship_at(50), None);
        assert_eq!(draft.ship_at(55), Some(1));
        draft.place(2, right(0, 6)).unwrap();
        let err = draft.place(2, ShipPose::new(Coordinate::new(2, 4), Orientation::Up));
        assert_eq!(err.unwrap_err().reason(), CannotPlaceReason::Overlap);
        assert_eq!(draft.pose(2), Some(right(0, 6)));
        assert!(!draft.ready());
        assert!(draft.submission().is_none());
    }

    #[test]
    fn draft_submission_validates() {
        let rules = Ruleset::standard();
        let mut draft = FleetDraft::new(&rules);
        for (ship, pose) in rows().into_iter().enumerate() {
            draft.place(ship, pose).unwrap();
        }
        assert_eq!(draft.pending_ships().count(), 0);
        let fleet = draft.submission().unwrap();
        assert!(validate_fleet(&rules, &fleet).is_ok());
        draft.clear();
        assert_eq!(draft.pending_ships().count(), 9);
    }
}
