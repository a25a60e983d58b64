//! The change feed emitted by every state-mutating intent.
use serde::{Deserialize, Serialize};

use crate::{
    board::{Coordinate, Orientation, Turn},
    game::{AbilityKind, Phase, PlayerId},
};

/// One field-level change to a [`SessionState`](crate::game::SessionState). Observers
/// apply these in order to stay in sync with the authoritative state.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Change {
    Phase(Phase),
    TurnOwner(Option<PlayerId>),
    TurnCounter(Turn),
    Winner(Option<PlayerId>),
    /// `player` fired at `cell` of the opponent's board on `turn`.
    ShotCell {
        player: PlayerId,
        cell: usize,
        turn: Turn,
    },
    /// Part `part` of `player`'s own fleet was damaged on `turn`.
    DamageCell {
        player: PlayerId,
        part: usize,
        turn: Turn,
    },
    SkipPending {
        player: PlayerId,
        pending: bool,
    },
    AbilityUsed {
        player: PlayerId,
        ability: AbilityKind,
    },
    /// `player`'s multi-shot was activated, or consumed when `direction` is `None`.
    Armed {
        player: PlayerId,
        direction: Option<Orientation>,
    },
    PlayerJoined(PlayerId),
    PlayerLeft(PlayerId),
    FleetSubmitted(PlayerId),
    RematchConfirmed(PlayerId),
    /// Every player's battle state was cleared for a new round.
    BoardsReset,
}

/// A rectangle of board cells.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ScanRegion {
    /// Lower-left corner of the region.
    pub origin: Coordinate,
    pub width: usize,
    pub height: usize,
}

impl ScanRegion {
    /// Iterate the coordinates covered by this region.
    pub fn coordinates(self) -> impl Iterator<Item = Coordinate> {
        let ScanRegion {
            origin,
            width,
            height,
        } = self;
        (origin.y..origin.y + height)
            .flat_map(move |y| (origin.x..origin.x + width).map(move |x| Coordinate::new(x, y)))
    }
}

/// What an ability did.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// `target` will lose their next turn.
    Stun { target: PlayerId },
    /// `ship_count` distinct ships touch `region`. No region means none could be found.
    Scan {
        region: Option<ScanRegion>,
        ship_count: usize,
    },
    /// An unshot ship cell, or none if every ship cell has been shot.
    Reveal { cell: Option<usize> },
    /// The next volley may cover two cells in this direction.
    Multishot { direction: Orientation },
}

impl Effect {
    pub fn kind(&self) -> AbilityKind {
        match self {
            Effect::Stun { .. } => AbilityKind::Stun,
            Effect::Scan { .. } => AbilityKind::Scan,
            Effect::Reveal { .. } => AbilityKind::Reveal,
            Effect::Multishot { .. } => AbilityKind::Multishot,
        }
    }
}

/// Broadcast to all observers when an ability is used.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct AbilityEvent {
    pub actor: PlayerId,
    pub ability: AbilityKind,
    pub effect: Effect,
}

/// Dedicated notifications for presentation cues. Everything here is also visible in
/// the change feed.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Broadcast {
    Ability(AbilityEvent),
    /// `player` hit a bomb and owes a skipped turn.
    Bomb { player: PlayerId },
    /// `player`'s turn was consumed by a pending skip.
    Skip { player: PlayerId },
}

/// The output of one intent. Empty when the intent was ignored.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub changes: Vec<Change>,
    pub broadcasts: Vec<Broadcast>,
}

impl Update {
    /// True if the intent had no effect.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.broadcasts.is_empty()
    }

    pub(crate) fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub(crate) fn broadcast(&mut self, broadcast: Broadcast) {
        self.broadcasts.push(broadcast);
    }

    /// Append everything from `other` after the contents of this update.
    pub fn extend(&mut self, other: Update) {
        self.changes.extend(other.changes);
        self.broadcasts.extend(other.broadcasts);
    }
}
