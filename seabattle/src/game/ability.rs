//! The four special abilities.
use std::collections::BTreeSet;

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    board::{Coordinate, FleetLayout, Orientation, TurnGrid},
    game::{
        AbilityEvent, AbilityKind, Broadcast, Change, Effect, Phase, PlayerId, ScanRegion,
        SessionState, Update,
    },
    ships::Ruleset,
};

/// An ability together with its parameters.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum AbilityRequest {
    Stun,
    Scan,
    Reveal,
    /// Arm a two-cell volley stepping in `direction` from its first target.
    Multishot { direction: Orientation },
}

impl AbilityRequest {
    pub fn kind(self) -> AbilityKind {
        match self {
            AbilityRequest::Stun => AbilityKind::Stun,
            AbilityRequest::Scan => AbilityKind::Scan,
            AbilityRequest::Reveal => AbilityKind::Reveal,
            AbilityRequest::Multishot { .. } => AbilityKind::Multishot,
        }
    }
}

/// Resolve an ability used by `user`. Only the turn owner may use an ability, and each
/// kind only once per battle. Using an ability never ends the turn.
pub(crate) fn use_ability(
    state: &mut SessionState,
    rules: &Ruleset,
    user: &PlayerId,
    request: AbilityRequest,
) -> Update {
    let mut update = Update::default();
    let kind = request.kind();
    if state.phase != Phase::Battle {
        trace!(%user, ?kind, phase = ?state.phase, "ability outside of battle ignored");
        return update;
    }
    let idx = match state.owner_index(user) {
        Some(idx) => idx,
        None => {
            trace!(%user, ?kind, "ability out of turn ignored");
            return update;
        }
    };
    if state.players[idx].used.contains(kind) {
        trace!(%user, ?kind, "ability already used");
        return update;
    }

    let mut rng = state.rng();
    let (me, them) = state.pair_mut(idx);
    let layout = match them.layout.as_ref() {
        Some(layout) => layout,
        None => return update,
    };
    me.used = me.used | kind;
    update.push(Change::AbilityUsed {
        player: me.id.clone(),
        ability: kind,
    });

    let effect = match request {
        AbilityRequest::Stun => {
            if !them.skip_pending {
                them.skip_pending = true;
                update.push(Change::SkipPending {
                    player: them.id.clone(),
                    pending: true,
                });
            }
            Effect::Stun {
                target: them.id.clone(),
            }
        }
        AbilityRequest::Scan => scan(rules, &me.shots, layout, &mut rng),
        AbilityRequest::Reveal => {
            let unshot: Vec<usize> = layout
                .occupied()
                .map(|(cell, _)| cell)
                .filter(|&cell| !me.shots.is_marked(cell))
                .collect();
            Effect::Reveal {
                cell: unshot.choose(&mut rng).copied(),
            }
        }
        AbilityRequest::Multishot { direction } => {
            me.armed = Some(direction);
            update.push(Change::Armed {
                player: me.id.clone(),
                direction: Some(direction),
            });
            Effect::Multishot { direction }
        }
    };
    debug!(%user, ?effect, "ability used");
    update.broadcast(Broadcast::Ability(AbilityEvent {
        actor: me.id.clone(),
        ability: effect.kind(),
        effect,
    }));
    update
}

/// Try random 2x3 and 3x2 regions the user hasn't fired into yet and count the distinct
/// ships underneath the first one found.
fn scan<R: Rng>(
    rules: &Ruleset,
    shots: &TurnGrid,
    layout: &FleetLayout,
    rng: &mut R,
) -> Effect {
    let dim = rules.dimensions();
    let shapes: Vec<(usize, usize)> = [(2, 3), (3, 2)]
        .iter()
        .copied()
        .filter(|&(w, h)| w <= dim.width() && h <= dim.height())
        .collect();
    let unshot = |region: ScanRegion| {
        region.coordinates().all(|coord| {
            dim.try_linearize(&coord)
                .map_or(false, |idx| !shots.is_marked(idx))
        })
    };
    for _ in 0..rules.scan_attempts() {
        let (width, height) = match shapes.choose(rng) {
            Some(&shape) => shape,
            None => break,
        };
        let origin = Coordinate::new(
            rng.gen_range(0, dim.width() - width + 1),
            rng.gen_range(0, dim.height() - height + 1),
        );
        let region = ScanRegion {
            origin,
            width,
            height,
        };
        if !unshot(region) {
            continue;
        }
        let ships: BTreeSet<_> = region
            .coordinates()
            .filter_map(|coord| dim.try_linearize(&coord))
            .filter_map(|idx| layout.ship_at(idx))
            .collect();
        return Effect::Scan {
            region: Some(region),
            ship_count: ships.len(),
        };
    }
    Effect::Scan {
        region: None,
        ship_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::{battle, tiny_rules};

    fn event(update: &Update) -> &Effect {
        match update.broadcasts.last() {
            Some(Broadcast::Ability(event)) => {
                assert_eq!(event.ability, event.effect.kind());
                &event.effect
            }
            other => panic!("expected ability broadcast, got {:?}", other),
        }
    }

    #[test]
    fn stun_marks_opponent() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        let update = use_ability(&mut state, &rules, &"a".into(), AbilityRequest::Stun);
        assert_eq!(event(&update), &Effect::Stun { target: "b".into() });
        assert!(state.players()[1].skip_pending());
        assert!(state.players()[0].has_used(AbilityKind::Stun));
        assert_eq!(state.turn_owner(), Some(&"a".into()));
        assert_eq!(state.turn(), 1);
    }

    #[test]
    fn abilities_are_single_use() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        use_ability(&mut state, &rules, &"a".into(), AbilityRequest::Reveal);
        let before = state.clone();
        let update = use_ability(&mut state, &rules, &"a".into(), AbilityRequest::Reveal);
        assert!(update.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn abilities_need_the_turn() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        let before = state.clone();
        assert!(use_ability(&mut state, &rules, &"b".into(), AbilityRequest::Stun).is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn reveal_picks_unshot_ship_cell() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        state.players[0].shots.mark(0, 1);
        state.players[0].shots.mark(1, 1);
        state.players[0].shots.mark(15, 1);
        let update = use_ability(&mut state, &rules, &"a".into(), AbilityRequest::Reveal);
        // Only the mine is left.
        assert_eq!(event(&update), &Effect::Reveal { cell: Some(12) });
        assert!(!state.players()[0].shots().is_marked(12));
    }

    #[test]
    fn reveal_reports_nothing_when_every_ship_cell_is_shot() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        for cell in [0, 1, 12, 15].iter().copied() {
            state.players[0].shots.mark(cell, 1);
        }
        let update = use_ability(&mut state, &rules, &"a".into(), AbilityRequest::Reveal);
        assert_eq!(event(&update), &Effect::Reveal { cell: None });
    }

    #[test]
    fn scan_counts_ships_in_unshot_region() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        let update = use_ability(&mut state, &rules, &"a".into(), AbilityRequest::Scan);
        match event(&update) {
            Effect::Scan {
                region: Some(region),
                ship_count,
            } => {
                let dim = rules.dimensions();
                let expected: BTreeSet<_> = region
                    .coordinates()
                    .filter_map(|c| dim.try_linearize(&c))
                    .filter_map(|idx| state.players()[1].layout.as_ref().unwrap().ship_at(idx))
                    .collect();
                assert_eq!(*ship_count, expected.len());
                assert_eq!(region.width * region.height, 6);
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn scan_finds_nothing_on_a_shot_board() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        for cell in 0..16 {
            state.players[0].shots.mark(cell, 1);
        }
        let update = use_ability(&mut state, &rules, &"a".into(), AbilityRequest::Scan);
        assert_eq!(
            event(&update),
            &Effect::Scan {
                region: None,
                ship_count: 0
            }
        );
    }

    #[test]
    fn multishot_arms() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        use_ability(
            &mut state,
            &rules,
            &"a".into(),
            AbilityRequest::Multishot {
                direction: Orientation::Up,
            },
        );
        assert_eq!(state.players()[0].armed(), Some(Orientation::Up));
    }
}
