//! Types that make up the game board: coordinates, dimensions, orientation, the
//! write-once turn grids, and fleet placement.

pub use self::{
    coordinate::{Coordinate, Offset},
    dimensions::RectDimensions,
    errors::{CannotPlaceReason, PlaceError},
    grid::{Turn, TurnGrid},
    layout::{occupied_cells, validate_fleet, FleetDraft, FleetLayout, FleetSubmission, ShipPose},
    orientation::Orientation,
};

mod coordinate;
mod dimensions;
mod errors;
mod grid;
mod layout;
mod orientation;
