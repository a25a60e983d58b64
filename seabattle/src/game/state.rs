//! The replicated state of one session.
use std::fmt;

use enumflags2::BitFlags;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    board::{FleetLayout, Orientation, Turn, TurnGrid},
    ships::Ruleset,
};

/// Identifies a player within a session.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        PlayerId::new(id)
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        PlayerId(id)
    }
}

/// Lifecycle phase of a session.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Fewer than two players have joined.
    Waiting,
    /// Both players have joined and are arranging their fleets.
    Placing,
    /// Both fleets are down and shots are being fired.
    Battle,
    /// One fleet has been destroyed.
    Result,
    /// A player declined a rematch. Nothing further happens in this session.
    Leave,
}

/// The four special abilities. Each may be used once per player per battle.
#[derive(BitFlags, Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AbilityKind {
    /// Make the opponent skip their next turn.
    Stun = 0b0001,
    /// Count the ships under a random unshot region of the opponent's board.
    Scan = 0b0010,
    /// Reveal one unshot cell of an opponent ship.
    Reveal = 0b0100,
    /// Fire two adjacent cells in one submission.
    Multishot = 0b1000,
}

/// Serializes the ability-use record as its raw bits.
mod ability_bits {
    use enumflags2::BitFlags;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::AbilityKind;

    pub(super) fn serialize<S: Serializer>(
        flags: &BitFlags<AbilityKind>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(flags.bits())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BitFlags<AbilityKind>, D::Error> {
        u8::deserialize(deserializer).map(BitFlags::from_bits_truncate)
    }
}

/// Everything the session tracks for one player.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub(crate) id: PlayerId,

    /// Cells this player has fired at on the opponent's board.
    pub(crate) shots: TurnGrid,

    /// Damage taken by this player's own fleet, one entry per ship part in rank order.
    pub(crate) damage: TurnGrid,

    /// Remaining health of this player's fleet.
    pub(crate) health: usize,

    /// Abilities this player has already used this battle.
    #[serde(with = "ability_bits")]
    pub(crate) used: BitFlags<AbilityKind>,

    /// This player will lose their next turn when the opponent next misses.
    pub(crate) skip_pending: bool,

    /// Direction of an activated multi-shot waiting for its volley.
    pub(crate) armed: Option<Orientation>,

    /// The concealed placement, once submitted.
    pub(crate) layout: Option<FleetLayout>,

    /// This player has asked for a rematch.
    pub(crate) rematch: bool,
}

impl PlayerState {
    pub(crate) fn new(id: PlayerId, rules: &Ruleset) -> Self {
        Self {
            id,
            shots: TurnGrid::new(rules.dimensions().total_size()),
            damage: TurnGrid::new(rules.damage_track_len()),
            health: rules.starting_health(),
            used: BitFlags::empty(),
            skip_pending: false,
            armed: None,
            layout: None,
            rematch: false,
        }
    }

    /// Discard everything from the previous battle, keeping only the player's identity.
    pub(crate) fn reset(&mut self, rules: &Ruleset) {
        *self = Self::new(self.id.clone(), rules);
    }

    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    /// This player's shot grid.
    pub fn shots(&self) -> &TurnGrid {
        &self.shots
    }

    /// The damage track of this player's own fleet.
    pub fn damage(&self) -> &TurnGrid {
        &self.damage
    }

    pub fn health(&self) -> usize {
        self.health
    }

    /// Whether the given ability has been used this battle.
    pub fn has_used(&self, ability: AbilityKind) -> bool {
        self.used.contains(ability)
    }

    pub fn used_abilities(&self) -> BitFlags<AbilityKind> {
        self.used
    }

    pub fn skip_pending(&self) -> bool {
        self.skip_pending
    }

    /// The direction of an activated multi-shot, if one is waiting to be fired.
    pub fn armed(&self) -> Option<Orientation> {
        self.armed
    }

    /// Whether this player's fleet has been accepted.
    pub fn has_placed(&self) -> bool {
        self.layout.is_some()
    }

    pub fn wants_rematch(&self) -> bool {
        self.rematch
    }
}

/// The full state of one session. This is the value that gets replicated to observers
/// and the value a session is saved and restored from.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub(crate) phase: Phase,

    /// Joined players, in join order. Never more than two.
    pub(crate) players: Vec<PlayerState>,

    pub(crate) turn_owner: Option<PlayerId>,

    /// Current turn number, starting at 1 each battle.
    pub(crate) turn: Turn,

    pub(crate) winner: Option<PlayerId>,

    /// Who started the previous battle, so a rematch can hand the start to the other.
    pub(crate) last_starter: Option<PlayerId>,

    pub(crate) rematching: bool,

    /// Seed for the next random draw. Advanced after every draw.
    pub(crate) rng_seed: u64,
}

impl SessionState {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            phase: Phase::Waiting,
            players: Vec::with_capacity(2),
            turn_owner: None,
            turn: 1,
            winner: None,
            last_starter: None,
            rematching: false,
            rng_seed: seed,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    /// Get the state of the player with the given ID.
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|player| &player.id == id)
    }

    /// Get the opponent of the player with the given ID.
    pub fn opponent(&self, id: &PlayerId) -> Option<&PlayerState> {
        let idx = self.index_of(id)?;
        self.players.get(1 - idx)
    }

    pub fn turn_owner(&self) -> Option<&PlayerId> {
        self.turn_owner.as_ref()
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn winner(&self) -> Option<&PlayerId> {
        self.winner.as_ref()
    }

    pub(crate) fn index_of(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|player| &player.id == id)
    }

    /// Index of the given player if both players are present and it is their turn.
    pub(crate) fn owner_index(&self, id: &PlayerId) -> Option<usize> {
        if self.players.len() != 2 || self.turn_owner.as_ref() != Some(id) {
            return None;
        }
        self.index_of(id)
    }

    /// Split the players into the one at `idx` and their opponent.
    pub(crate) fn pair_mut(&mut self, idx: usize) -> (&mut PlayerState, &mut PlayerState) {
        let (first, second) = self.players.split_at_mut(1);
        if idx == 0 {
            (&mut first[0], &mut second[0])
        } else {
            (&mut second[0], &mut first[0])
        }
    }

    /// Get a generator for one random decision and advance the stored seed, so a
    /// restored session makes the same decisions as the one it was saved from.
    pub(crate) fn rng(&mut self) -> StdRng {
        let mut rng = StdRng::seed_from_u64(self.rng_seed);
        self.rng_seed = rng.gen();
        rng
    }
}
