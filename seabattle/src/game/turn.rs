//! Shot resolution.
use tracing::{debug, info, trace};

use crate::{
    game::{Broadcast, Change, Phase, PlayerId, SessionState, Update},
    ships::Ruleset,
};

/// How a completed volley affects the turn.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Outcome {
    /// The shooter keeps the turn and the counter holds.
    Retain,
    /// The turn passes to the opponent.
    HandOff,
    /// The opponent's turn is consumed by their pending skip.
    Skip,
    /// The shooter hit a bomb.
    Bomb,
}

/// Resolve a volley of one or two target cells fired by `shooter`. Any precondition
/// failure leaves the state untouched and returns an empty update.
pub(crate) fn fire(
    state: &mut SessionState,
    rules: &Ruleset,
    shooter: &PlayerId,
    targets: &[usize],
) -> Update {
    let mut update = Update::default();
    if state.phase != Phase::Battle {
        trace!(%shooter, phase = ?state.phase, "fire outside of battle ignored");
        return update;
    }
    let idx = match state.owner_index(shooter) {
        Some(idx) => idx,
        None => {
            trace!(%shooter, "fire out of turn ignored");
            return update;
        }
    };
    let dim = rules.dimensions();
    if targets.is_empty() || targets.len() > 2 || targets.iter().any(|&t| !dim.contains_index(t))
    {
        trace!(%shooter, ?targets, "fire with bad targets ignored");
        return update;
    }
    let armed = state.players[idx].armed;
    if let [first, second] = *targets {
        let legal = armed.map_or(false, |dir| dim.step(first, dir) == Some(second));
        if !legal {
            trace!(%shooter, ?targets, ?armed, "two-cell volley without a matching multi-shot ignored");
            return update;
        }
    }

    let turn = state.turn;
    let (me, them) = state.pair_mut(idx);
    let layout = match them.layout.as_ref() {
        Some(layout) => layout,
        None => return update,
    };
    debug!(%shooter, ?targets, turn, "resolving volley");
    if armed.is_some() {
        me.armed = None;
        update.push(Change::Armed {
            player: me.id.clone(),
            direction: None,
        });
    }

    let mut hit = false;
    let mut bomb = false;
    for &cell in targets {
        if !me.shots.mark(cell, turn) {
            continue;
        }
        update.push(Change::ShotCell {
            player: me.id.clone(),
            cell,
            turn,
        });
        let ship = match layout.ship_at(cell) {
            Some(ship) => ship,
            None => continue,
        };
        if rules.is_bomb(ship) {
            bomb = true;
            continue;
        }
        hit = true;
        let part = rules
            .damage_slice(ship)
            .and_then(|slice| them.damage.first_unmarked_in(slice));
        if let Some(part) = part {
            them.damage.mark(part, turn);
            them.health = them.health.saturating_sub(1);
            update.push(Change::DamageCell {
                player: them.id.clone(),
                part,
                turn,
            });
        }
    }

    if them.health == 0 {
        info!(winner = %me.id, turn, "fleet destroyed");
        state.winner = Some(shooter.clone());
        state.phase = Phase::Result;
        update.push(Change::Winner(state.winner.clone()));
        update.push(Change::Phase(Phase::Result));
        return update;
    }

    let outcome = if bomb {
        Outcome::Bomb
    } else if hit {
        Outcome::Retain
    } else if them.skip_pending {
        Outcome::Skip
    } else {
        Outcome::HandOff
    };
    debug!(%shooter, ?outcome, "volley resolved");

    let mut next_owner = me.id.clone();
    match outcome {
        Outcome::Retain => {}
        Outcome::HandOff => next_owner = them.id.clone(),
        Outcome::Skip => {
            them.skip_pending = false;
            update.push(Change::SkipPending {
                player: them.id.clone(),
                pending: false,
            });
            update.broadcast(Broadcast::Skip {
                player: them.id.clone(),
            });
        }
        Outcome::Bomb => {
            me.skip_pending = true;
            update.push(Change::SkipPending {
                player: me.id.clone(),
                pending: true,
            });
            update.broadcast(Broadcast::Bomb {
                player: me.id.clone(),
            });
            next_owner = them.id.clone();
        }
    }

    if outcome != Outcome::Retain {
        if state.turn_owner.as_ref() != Some(&next_owner) {
            state.turn_owner = Some(next_owner);
            update.push(Change::TurnOwner(state.turn_owner.clone()));
        }
        state.turn += 1;
        update.push(Change::TurnCounter(state.turn));
    }
    update
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::test_support::{battle, tiny_rules};

    fn owner(state: &SessionState) -> &str {
        state.turn_owner().map(PlayerId::as_str).unwrap_or("")
    }

    #[test]
    fn hit_retains_turn() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        let update = fire(&mut state, &rules, &"a".into(), &[0]);
        assert_eq!(
            update.changes,
            vec![
                Change::ShotCell {
                    player: "a".into(),
                    cell: 0,
                    turn: 1
                },
                Change::DamageCell {
                    player: "b".into(),
                    part: 0,
                    turn: 1
                },
            ]
        );
        assert_eq!(owner(&state), "a");
        assert_eq!(state.turn(), 1);
        assert_eq!(state.players()[1].health(), 2);
    }

    #[test]
    fn miss_hands_off() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        let update = fire(&mut state, &rules, &"a".into(), &[5]);
        assert_eq!(
            update.changes,
            vec![
                Change::ShotCell {
                    player: "a".into(),
                    cell: 5,
                    turn: 1
                },
                Change::TurnOwner(Some("b".into())),
                Change::TurnCounter(2),
            ]
        );
        assert_eq!(state.players()[0].health(), 3);
    }

    #[test]
    fn out_of_turn_and_out_of_range_are_ignored() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        let before = state.clone();
        assert!(fire(&mut state, &rules, &"b".into(), &[0]).is_empty());
        assert!(fire(&mut state, &rules, &"a".into(), &[16]).is_empty());
        assert!(fire(&mut state, &rules, &"a".into(), &[]).is_empty());
        assert!(fire(&mut state, &rules, &"a".into(), &[0, 1]).is_empty());
        assert!(fire(&mut state, &rules, &"c".into(), &[0]).is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn reshooting_counts_as_miss() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        fire(&mut state, &rules, &"a".into(), &[0]);
        let update = fire(&mut state, &rules, &"a".into(), &[0]);
        assert_eq!(
            update.changes,
            vec![Change::TurnOwner(Some("b".into())), Change::TurnCounter(2)]
        );
        assert_eq!(state.players()[0].shots().turn(0), Some(1));
        assert_eq!(state.players()[1].health(), 2);
    }

    #[test]
    fn damage_fills_ship_slice_in_order() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        // The sloop covers cells 0 and 1; hitting 1 first still marks part 0.
        fire(&mut state, &rules, &"a".into(), &[1]);
        assert_eq!(state.players()[1].damage().turn(0), Some(1));
        assert_eq!(state.players()[1].damage().turn(1), None);
    }

    #[test]
    fn bomb_penalizes_shooter() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        let update = fire(&mut state, &rules, &"a".into(), &[12]);
        assert_eq!(
            update.changes,
            vec![
                Change::ShotCell {
                    player: "a".into(),
                    cell: 12,
                    turn: 1
                },
                Change::SkipPending {
                    player: "a".into(),
                    pending: true
                },
                Change::TurnOwner(Some("b".into())),
                Change::TurnCounter(2),
            ]
        );
        assert_eq!(
            update.broadcasts,
            vec![Broadcast::Bomb { player: "a".into() }]
        );
        assert_eq!(state.players()[1].health(), 3);

        // b misses: a's pending skip is consumed and b goes again.
        let update = fire(&mut state, &rules, &"b".into(), &[5]);
        assert_eq!(owner(&state), "b");
        assert_eq!(state.turn(), 3);
        assert!(!state.players()[0].skip_pending());
        assert_eq!(
            update.broadcasts,
            vec![Broadcast::Skip { player: "a".into() }]
        );

        // b misses again: now the turn hands back to a.
        fire(&mut state, &rules, &"b".into(), &[6]);
        assert_eq!(owner(&state), "a");
        assert_eq!(state.turn(), 4);
    }

    #[test]
    fn victory_ends_battle() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        fire(&mut state, &rules, &"a".into(), &[0]);
        fire(&mut state, &rules, &"a".into(), &[1]);
        let update = fire(&mut state, &rules, &"a".into(), &[15]);
        assert_eq!(state.phase(), Phase::Result);
        assert_eq!(state.winner(), Some(&"a".into()));
        assert_eq!(
            &update.changes[update.changes.len() - 2..],
            &[Change::Winner(Some("a".into())), Change::Phase(Phase::Result)]
        );
        assert!(fire(&mut state, &rules, &"a".into(), &[2]).is_empty());
    }

    #[test]
    fn armed_volley_fires_both_cells() {
        let rules = tiny_rules();
        let mut state = battle(&rules, "a");
        state.players[0].armed = Some(crate::board::Orientation::Right);
        // Wrong direction is ignored and keeps the arming.
        assert!(fire(&mut state, &rules, &"a".into(), &[0, 4]).is_empty());
        let update = fire(&mut state, &rules, &"a".into(), &[0, 1]);
        assert_eq!(state.players()[1].health(), 1);
        assert_eq!(state.players()[0].armed(), None);
        assert_eq!(
            update.changes[0],
            Change::Armed {
                player: "a".into(),
                direction: None
            }
        );
        assert_eq!(owner(&state), "a");
    }
}
