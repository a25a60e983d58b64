//! Types used for defining ships, their shapes, and the rule tables they are read from.
use serde::{Deserialize, Serialize};

pub use self::{
    footprint::{Footprint, ShapeProjection},
    ruleset::{Ruleset, RulesetConfig, RulesetError, ShipInstance, DEFAULT_SCAN_ATTEMPTS},
};

mod footprint;
mod ruleset;

/// Identifies one ship within a player's fleet: the position of the ship in the
/// ruleset's rank-ordered list of ship instances.
pub type ShipIndex = usize;

/// Immutable definition of a kind of ship.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ShipType {
    /// Display name of the ship type.
    pub name: String,

    /// Smallest rank is the highest ranked ship. Ships are ordered by rank everywhere a
    /// fleet is listed, including the damage track.
    pub rank: u32,

    /// How many ships of this type each player has.
    pub amount: usize,

    /// Cells the ship covers, relative to its pivot.
    pub footprint: Footprint,

    /// Bomb ships punish whoever hits them with a skipped turn instead of taking damage.
    #[serde(default)]
    pub bomb: bool,
}

impl ShipType {
    /// Construct a ship type that takes damage normally.
    pub fn new<N: Into<String>>(name: N, rank: u32, amount: usize, footprint: Footprint) -> Self {
        Self {
            name: name.into(),
            rank,
            amount,
            footprint,
            bomb: false,
        }
    }

    /// Turn this ship type into a bomb.
    pub fn into_bomb(mut self) -> Self {
        self.bomb = true;
        self
    }
}
