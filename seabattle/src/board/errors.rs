//! Errors used when validating fleet placements.

use std::fmt::{self, Debug};

use thiserror::Error;

use crate::ships::ShipIndex;

/// Reason why a fleet placement was rejected.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum CannotPlaceReason {
    /// Part of a ship would lie off the board.
    #[error("a ship does not fit inside the board")]
    OutOfBounds,
    /// Two ships would occupy the same cell.
    #[error("two ships overlap")]
    Overlap,
    /// The submission did not provide exactly one pivot and orientation per ship.
    #[error("the submission does not describe every ship exactly once")]
    WrongShipCount,
    /// The submitted cell grid disagrees with the cells the pivots and orientations
    /// cover.
    #[error("the cell grid does not match the ship pivots and orientations")]
    CellMismatch,
}

/// Error caused when a player submits an invalid fleet. The whole submission is rejected;
/// nothing is applied.
#[derive(Error, Copy, Clone, Eq, PartialEq)]
#[error("could not place fleet: {reason}")]
pub struct PlaceError {
    #[source]
    reason: CannotPlaceReason,
    ship: Option<ShipIndex>,
}

impl Debug for PlaceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.ship {
            Some(ship) => write!(f, "{} (ship {})", self, ship),
            None => fmt::Display::fmt(self, f),
        }
    }
}

impl PlaceError {
    /// Construct a placement error from a reason and the ship that triggered it.
    pub(crate) fn new(reason: CannotPlaceReason, ship: Option<ShipIndex>) -> Self {
        Self { reason, ship }
    }

    /// Get the reason placement was rejected.
    pub fn reason(&self) -> CannotPlaceReason {
        self.reason
    }

    /// The ship whose placement failed, if the failure is attributable to one ship.
    pub fn ship(&self) -> Option<ShipIndex> {
        self.ship
    }
}
