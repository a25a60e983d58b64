//! The computer opponent. A [`Strategy`] only ever proposes intents; it never touches
//! session state itself.
use std::collections::HashSet;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::trace;

use crate::{
    board::{FleetDraft, FleetSubmission, Orientation, ShipPose},
    game::{
        AbilityKind, AbilityRequest, Broadcast, Change, Effect, PlayerId, PlayerState, Update,
    },
    ships::Ruleset,
};

/// How many times [`random_fleet`] starts over before giving up.
const PLACEMENT_RESTARTS: usize = 64;

/// Decision making for a computer-controlled player.
pub trait Strategy {
    /// Arrange a fleet for a new battle.
    fn place_fleet(&mut self, rules: &Ruleset) -> Option<FleetSubmission>;

    /// Choose the cells to fire at. `me` is the strategy's own player, whose shot grid
    /// and armed multi-shot are visible.
    fn choose_targets(&mut self, rules: &Ruleset, me: &PlayerState) -> Vec<usize>;

    /// Optionally use an ability before firing.
    fn choose_ability(&mut self, _rules: &Ruleset, _me: &PlayerState) -> Option<AbilityRequest> {
        None
    }

    /// See every update the session produces.
    fn observe(&mut self, _me: &PlayerId, _update: &Update) {}
}

/// Arrange every ship in a random legal pose. Each ship tries every pivot and
/// orientation in random order; if some ship cannot be placed at all, start over.
/// Returns `None` if no arrangement was found.
pub fn random_fleet<R: Rng>(rules: &Ruleset, rng: &mut R) -> Option<FleetSubmission> {
    let dim = rules.dimensions();
    let mut candidates: Vec<ShipPose> = (0..dim.total_size())
        .flat_map(|idx| {
            let pivot = dim.un_linearize(idx);
            (0..4)
                .filter_map(Orientation::from_index)
                .map(move |orientation| ShipPose::new(pivot, orientation))
        })
        .collect();
    for attempt in 0..PLACEMENT_RESTARTS {
        let mut draft = FleetDraft::new(rules);
        let placed = (0..rules.ship_count()).all(|ship| {
            candidates.shuffle(rng);
            candidates
                .iter()
                .any(|&pose| draft.place(ship, pose).is_ok())
        });
        if placed {
            return draft.submission();
        }
        trace!(attempt, "random fleet placement restarting");
    }
    None
}

/// Fires at random unshot cells, preferring any cell a reveal has pointed out. When
/// abilities are enabled it occasionally uses one it hasn't used yet.
#[derive(Debug, Clone)]
pub struct RandomStrategy {
    rng: StdRng,
    use_abilities: bool,

    /// Cells known to hold a ship, from reveals.
    leads: Vec<usize>,
}

impl RandomStrategy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            use_abilities: false,
            leads: Vec::new(),
        }
    }

    /// Let the strategy use special abilities.
    pub fn with_abilities(mut self) -> Self {
        self.use_abilities = true;
        self
    }
}

impl Strategy for RandomStrategy {
    fn place_fleet(&mut self, rules: &Ruleset) -> Option<FleetSubmission> {
        random_fleet(rules, &mut self.rng)
    }

    fn choose_targets(&mut self, rules: &Ruleset, me: &PlayerState) -> Vec<usize> {
        let dim = rules.dimensions();
        let shots = me.shots();
        let unshot: Vec<usize> = (0..shots.len()).filter(|&idx| !shots.is_marked(idx)).collect();

        if let Some(dir) = me.armed() {
            let free: HashSet<usize> = unshot.iter().copied().collect();
            let pairs: Vec<(usize, usize)> = unshot
                .iter()
                .filter_map(|&first| dim.step(first, dir).map(|second| (first, second)))
                .collect();
            let fresh: Vec<(usize, usize)> = pairs
                .iter()
                .copied()
                .filter(|(_, second)| free.contains(second))
                .collect();
            let pick = if fresh.is_empty() { &pairs } else { &fresh };
            if let Some(&(first, second)) = pick.choose(&mut self.rng) {
                return vec![first, second];
            }
        }

        while let Some(cell) = self.leads.pop() {
            if !shots.is_marked(cell) {
                return vec![cell];
            }
        }
        unshot.choose(&mut self.rng).map(|&cell| vec![cell]).unwrap_or_default()
    }

    fn choose_ability(&mut self, _rules: &Ruleset, me: &PlayerState) -> Option<AbilityRequest> {
        if !self.use_abilities || me.armed().is_some() || !self.rng.gen_bool(0.2) {
            return None;
        }
        let unused: Vec<AbilityKind> = [
            AbilityKind::Stun,
            AbilityKind::Scan,
            AbilityKind::Reveal,
            AbilityKind::Multishot,
        ]
        .iter()
        .copied()
        .filter(|&kind| !me.has_used(kind))
        .collect();
        Some(match unused.choose(&mut self.rng)? {
            AbilityKind::Stun => AbilityRequest::Stun,
            AbilityKind::Scan => AbilityRequest::Scan,
            AbilityKind::Reveal => AbilityRequest::Reveal,
            AbilityKind::Multishot => AbilityRequest::Multishot {
                direction: self.rng.gen(),
            },
        })
    }

    fn observe(&mut self, me: &PlayerId, update: &Update) {
        for broadcast in update.broadcasts.iter() {
            if let Broadcast::Ability(event) = broadcast {
                match &event.effect {
                    Effect::Reveal { cell: Some(cell) } if &event.actor == me => {
                        self.leads.push(*cell)
                    }
                    _ => {}
                }
            }
        }
        if update
            .changes
            .iter()
            .any(|change| matches!(change, Change::BoardsReset))
        {
            self.leads.clear();
        }
    }
}
