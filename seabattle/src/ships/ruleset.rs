//! The immutable rule tables a session is constructed with.
use std::{collections::HashSet, convert::TryFrom, ops::Range};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    board::{Offset, RectDimensions},
    ships::{Footprint, ShipIndex, ShipType},
};

/// Default number of random regions an area scan tries before reporting nothing.
pub const DEFAULT_SCAN_ATTEMPTS: usize = 32;

fn default_scan_attempts() -> usize {
    DEFAULT_SCAN_ATTEMPTS
}

/// Raw, unvalidated rule tables as they appear in configuration.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct RulesetConfig {
    #[serde(default)]
    pub dimensions: RectDimensions,

    /// Ship types available to each player. Need not be sorted.
    pub ships: Vec<ShipType>,

    #[serde(default = "default_scan_attempts")]
    pub scan_attempts: usize,
}

/// Reason a set of rule tables was rejected.
#[derive(Debug, Error)]
pub enum RulesetError {
    #[error("board dimensions must be nonzero and addressable, got {width}x{height}")]
    BadDimensions { width: usize, height: usize },

    #[error("the ruleset defines no ships")]
    NoShips,

    #[error("two ship types share rank {rank}")]
    DuplicateRank { rank: u32 },

    #[error("ship {name:?} has an empty footprint")]
    EmptyFootprint { name: String },

    #[error("ship {name:?} must list its pivot first, have no repeated parts, and extend right and down")]
    NonCanonicalFootprint { name: String },

    #[error("ship {name:?} cannot fit on the board in any orientation")]
    ShipTooLarge { name: String },

    #[error("the ruleset has no ship that can take damage")]
    NoHealth,

    #[error("could not parse ruleset: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One concrete ship in a fleet: a ship type expanded by its amount.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShipInstance {
    /// Index of this ship's type in [`Ruleset::ship_types`].
    pub kind: usize,

    /// Which copy of its type this ship is, starting at 0.
    pub ordinal: usize,

    /// This ship's slice of the damage track. `None` for bombs.
    pub damage: Option<Range<usize>>,
}

/// Validated rule tables: board size and rank-ordered ship types, with the fleet
/// expanded into individual ship instances.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RulesetConfig", into = "RulesetConfig")]
pub struct Ruleset {
    config: RulesetConfig,
    instances: Vec<ShipInstance>,
    damage_len: usize,
}

impl Ruleset {
    /// Validate the given configuration.
    pub fn new(mut config: RulesetConfig) -> Result<Self, RulesetError> {
        let (width, height) = (config.dimensions.width(), config.dimensions.height());
        let dim = RectDimensions::try_new(width, height)
            .ok_or(RulesetError::BadDimensions { width, height })?;
        if config.ships.is_empty() {
            return Err(RulesetError::NoShips);
        }
        config.ships.sort_by_key(|ship| ship.rank);
        let mut ranks = HashSet::new();
        for ship in config.ships.iter() {
            if !ranks.insert(ship.rank) {
                return Err(RulesetError::DuplicateRank { rank: ship.rank });
            }
            if ship.footprint.is_empty() {
                return Err(RulesetError::EmptyFootprint {
                    name: ship.name.clone(),
                });
            }
            if !ship.footprint.is_canonical() {
                return Err(RulesetError::NonCanonicalFootprint {
                    name: ship.name.clone(),
                });
            }
            let (w, h) = ship.footprint.extents();
            if (w > dim.width() || h > dim.height()) && (h > dim.width() || w > dim.height()) {
                return Err(RulesetError::ShipTooLarge {
                    name: ship.name.clone(),
                });
            }
        }

        let mut instances = Vec::new();
        let mut damage_len = 0;
        for (kind, ship) in config.ships.iter().enumerate() {
            for ordinal in 0..ship.amount {
                let damage = if ship.bomb {
                    None
                } else {
                    let start = damage_len;
                    damage_len += ship.footprint.len();
                    Some(start..damage_len)
                };
                instances.push(ShipInstance {
                    kind,
                    ordinal,
                    damage,
                });
            }
        }
        if damage_len == 0 {
            return Err(RulesetError::NoHealth);
        }
        Ok(Self {
            config,
            instances,
            damage_len,
        })
    }

    /// The standard rules: a 10x10 board with seven warships totalling 25 cells and two
    /// single-cell mines.
    pub fn standard() -> Self {
        let gunboat = Footprint::new(vec![
            Offset::new(0, 0),
            Offset::new(1, 0),
            Offset::new(2, 0),
            Offset::new(0, -1),
        ]);
        let config = RulesetConfig {
            dimensions: RectDimensions::new(10, 10),
            ships: vec![
                ShipType::new("flagship", 0, 1, Footprint::rect(3, 2)),
                ShipType::new("carrier", 1, 1, Footprint::line(5)),
                ShipType::new("battleship", 2, 1, Footprint::line(4)),
                ShipType::new("cruiser", 3, 1, Footprint::line(3)),
                ShipType::new("destroyer", 4, 1, Footprint::line(2)),
                ShipType::new("submarine", 5, 1, Footprint::line(1)),
                ShipType::new("gunboat", 6, 1, gunboat),
                ShipType::new("mine", 7, 2, Footprint::line(1)).into_bomb(),
            ],
            scan_attempts: DEFAULT_SCAN_ATTEMPTS,
        };
        match Self::new(config) {
            Ok(rules) => rules,
            Err(err) => unreachable!("standard ruleset is invalid: {}", err),
        }
    }

    /// Parse and validate a ruleset from JSON.
    pub fn from_json(json: &str) -> Result<Self, RulesetError> {
        let config: RulesetConfig = serde_json::from_str(json)?;
        Self::new(config)
    }

    /// Get the board [`RectDimensions`].
    pub fn dimensions(&self) -> RectDimensions {
        self.config.dimensions
    }

    /// Ship types in rank order.
    pub fn ship_types(&self) -> &[ShipType] {
        &self.config.ships
    }

    /// Every ship in a fleet, in rank order. A [`ShipIndex`] indexes this list.
    pub fn ships(&self) -> &[ShipInstance] {
        &self.instances
    }

    /// Number of ships in each fleet.
    pub fn ship_count(&self) -> usize {
        self.instances.len()
    }

    /// Get the type of the given ship.
    pub fn ship_type(&self, ship: ShipIndex) -> Option<&ShipType> {
        self.instances
            .get(ship)
            .map(|instance| &self.config.ships[instance.kind])
    }

    /// Returns true if the given ship is a bomb.
    pub fn is_bomb(&self, ship: ShipIndex) -> bool {
        self.ship_type(ship).map_or(false, |ty| ty.bomb)
    }

    /// The given ship's slice of the damage track.
    pub fn damage_slice(&self, ship: ShipIndex) -> Option<Range<usize>> {
        self.instances
            .get(ship)
            .and_then(|instance| instance.damage.clone())
    }

    /// Length of the damage track: one entry per part of every non-bomb ship.
    pub fn damage_track_len(&self) -> usize {
        self.damage_len
    }

    /// Health each fleet starts a battle with.
    pub fn starting_health(&self) -> usize {
        self.damage_len
    }

    /// How many regions an area scan tries before giving up.
    pub fn scan_attempts(&self) -> usize {
        self.config.scan_attempts
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<RulesetConfig> for Ruleset {
    type Error = RulesetError;

    fn try_from(config: RulesetConfig) -> Result<Self, Self::Error> {
        Self::new(config)
    }
}

impl From<Ruleset> for RulesetConfig {
    fn from(rules: Ruleset) -> Self {
        rules.config
    }
}
