//! End-to-end scenarios driven through the public session API.

use std::sync::Arc;

use seabattle::{
    board::{Coordinate, FleetSubmission, Orientation, ShipPose},
    game::{AbilityKind, AbilityRequest, Broadcast, Change, Effect, Intent, Phase, PlayerId, Session},
    ships::Ruleset,
};

/// Every ship lined up along the left edge facing right, mines in the bottom right.
/// The flagship covers cells 80-82 and 90-92; cell 55 is open water; mines sit on 8 and 9.
fn left_edge_fleet(rules: &Ruleset) -> FleetSubmission {
    let right = |x, y| ShipPose::new(Coordinate::new(x, y), Orientation::Right);
    FleetSubmission::from_poses(
        rules,
        &[
            right(0, 9),
            right(0, 7),
            right(0, 6),
            right(0, 5),
            right(0, 4),
            right(0, 3),
            right(0, 2),
            right(9, 0),
            right(8, 0),
        ],
    )
    .unwrap()
}

/// A standard session in battle. Returns the session with the starting player first.
fn battle(seed: u64) -> (Session, PlayerId, PlayerId) {
    let rules = Arc::new(Ruleset::standard());
    let fleet = left_edge_fleet(&rules);
    let mut session = Session::new(rules, seed);
    let (alice, bob) = (PlayerId::new("alice"), PlayerId::new("bob"));
    session.join(&alice);
    session.join(&bob);
    session.place(&alice, &fleet).unwrap();
    session.place(&bob, &fleet).unwrap();
    let first = session.state().turn_owner().cloned().unwrap();
    let second = if first == alice { bob } else { alice };
    (session, first, second)
}

fn health(session: &Session, player: &PlayerId) -> usize {
    session.state().player(player).unwrap().health()
}

#[test]
fn two_fleets_start_battle() {
    let rules = Arc::new(Ruleset::standard());
    let fleet = left_edge_fleet(&rules);
    let mut session = Session::new(rules, 1);
    session.join(&"p1".into());
    assert_eq!(session.state().phase(), Phase::Waiting);
    session.join(&"p2".into());
    assert_eq!(session.state().phase(), Phase::Placing);

    let update = session.place(&"p1".into(), &fleet).unwrap();
    assert_eq!(update.changes, vec![Change::FleetSubmitted("p1".into())]);
    let update = session.place(&"p2".into(), &fleet).unwrap();
    assert_eq!(update.changes[0], Change::FleetSubmitted("p2".into()));
    assert_eq!(update.changes[1], Change::Phase(Phase::Battle));

    let state = session.state();
    assert_eq!(state.phase(), Phase::Battle);
    assert_eq!(state.turn(), 1);
    assert!(state.players().iter().all(|p| p.health() == 25));
}

#[test]
fn hit_keeps_turn() {
    let (mut session, p1, p2) = battle(3);
    let update = session.fire(&p1, &[90]);
    assert_eq!(
        update.changes,
        vec![
            Change::ShotCell {
                player: p1.clone(),
                cell: 90,
                turn: 1
            },
            Change::DamageCell {
                player: p2.clone(),
                part: 0,
                turn: 1
            },
        ]
    );
    assert_eq!(health(&session, &p2), 24);
    assert_eq!(session.state().turn_owner(), Some(&p1));
    assert_eq!(session.state().turn(), 1);
}

#[test]
fn miss_passes_turn() {
    let (mut session, p1, p2) = battle(4);
    session.fire(&p1, &[55]);
    assert_eq!(session.state().turn_owner(), Some(&p2));
    assert_eq!(session.state().turn(), 2);
    assert_eq!(health(&session, &p1), 25);
    assert_eq!(health(&session, &p2), 25);
}

#[test]
fn bomb_costs_the_shooter_a_turn() {
    let (mut session, p1, p2) = battle(5);
    let update = session.fire(&p1, &[9]);
    assert_eq!(update.broadcasts, vec![Broadcast::Bomb { player: p1.clone() }]);
    assert!(session.state().player(&p1).unwrap().skip_pending());
    assert_eq!(session.state().turn_owner(), Some(&p2));
    assert_eq!(session.state().turn(), 2);
    assert_eq!(health(&session, &p2), 25);

    // p2 misses, but p1's turn is forfeit so p2 goes again.
    let update = session.fire(&p2, &[55]);
    assert_eq!(update.broadcasts, vec![Broadcast::Skip { player: p1.clone() }]);
    assert_eq!(session.state().turn_owner(), Some(&p2));
    assert_eq!(session.state().turn(), 3);
    assert!(!session.state().player(&p1).unwrap().skip_pending());

    session.fire(&p2, &[56]);
    assert_eq!(session.state().turn_owner(), Some(&p1));
    assert_eq!(session.state().turn(), 4);
}

#[test]
fn stunned_opponent_loses_a_turn() {
    let (mut session, p1, p2) = battle(6);
    let update = session.use_ability(&p1, AbilityRequest::Stun);
    assert_eq!(
        update.broadcasts,
        vec![Broadcast::Ability(seabattle::game::AbilityEvent {
            actor: p1.clone(),
            ability: AbilityKind::Stun,
            effect: Effect::Stun { target: p2.clone() },
        })]
    );
    assert_eq!(session.state().turn_owner(), Some(&p1));

    session.fire(&p1, &[55]);
    assert_eq!(session.state().turn_owner(), Some(&p1));
    assert_eq!(session.state().turn(), 2);

    session.fire(&p1, &[56]);
    assert_eq!(session.state().turn_owner(), Some(&p2));
    assert_eq!(session.state().turn(), 3);
}

#[test]
fn multishot_fires_two_cells_once_per_battle() {
    let (mut session, p1, p2) = battle(7);
    session.use_ability(
        &p1,
        AbilityRequest::Multishot {
            direction: Orientation::Right,
        },
    );
    let update = session.fire(&p1, &[90, 91]);
    let damaged = update
        .changes
        .iter()
        .filter(|change| matches!(change, Change::DamageCell { .. }))
        .count();
    assert_eq!(damaged, 2);
    assert_eq!(health(&session, &p2), 23);
    assert_eq!(session.state().turn_owner(), Some(&p1));

    let before = session.snapshot();
    let update = session.use_ability(
        &p1,
        AbilityRequest::Multishot {
            direction: Orientation::Up,
        },
    );
    assert!(update.is_empty());
    assert_eq!(session.snapshot(), before);
    assert!(session.fire(&p1, &[92, 93]).is_empty());
}

#[test]
fn multishot_wraps_are_rejected() {
    let (mut session, p1, _) = battle(8);
    session.use_ability(
        &p1,
        AbilityRequest::Multishot {
            direction: Orientation::Right,
        },
    );
    // 19 is the right edge of row 1; 20 starts row 2.
    assert!(session.fire(&p1, &[19, 20]).is_empty());
    assert_eq!(
        session.state().player(&p1).unwrap().armed(),
        Some(Orientation::Right)
    );
    // A single shot consumes the arming.
    session.fire(&p1, &[90]);
    assert_eq!(session.state().player(&p1).unwrap().armed(), None);
}

#[test]
fn sinking_every_warship_wins() {
    let (mut session, p1, p2) = battle(9);
    let targets: Vec<usize> = session
        .layout_of(&p2)
        .unwrap()
        .occupied()
        .filter(|&(_, ship)| !session.rules().is_bomb(ship))
        .map(|(cell, _)| cell)
        .collect();
    assert_eq!(targets.len(), 25);
    assert!(session.fleet_of(&p2).is_none());
    for cell in targets {
        session.fire(&p1, &[cell]);
    }
    let state = session.state();
    assert_eq!(state.phase(), Phase::Result);
    assert_eq!(state.winner(), Some(&p1));
    assert_eq!(health(&session, &p2), 0);
    assert_eq!(session.fleet_of(&p2).unwrap().len(), 9);
    assert!(session.use_ability(&p1, AbilityRequest::Reveal).is_empty());
}

#[test]
fn leaving_mid_battle_resets_the_room() {
    let (mut session, p1, p2) = battle(10);
    session.fire(&p1, &[90]);
    session.leave(&p2);
    let state = session.state();
    assert_eq!(state.phase(), Phase::Waiting);
    assert_eq!(state.players().len(), 1);
    assert_eq!(health(&session, &p1), 25);
    assert!(session.fire(&p2, &[55]).is_empty());
}

#[test]
fn restored_session_replays_identically() {
    let (mut session, p1, p2) = battle(11);
    session.fire(&p1, &[90]);
    session.fire(&p1, &[55]);

    let json = serde_json::to_string(&session.snapshot()).unwrap();
    let mut restored = Session::restore(session.rules().clone(), serde_json::from_str(&json).unwrap());
    assert_eq!(restored.state(), session.state());

    let script = vec![
        (p2.clone(), Intent::UseAbility(AbilityRequest::Scan)),
        (p2.clone(), Intent::UseAbility(AbilityRequest::Reveal)),
        (p2.clone(), Intent::Fire(vec![91])),
        (p2.clone(), Intent::Fire(vec![9])),
        (p1.clone(), Intent::UseAbility(AbilityRequest::Reveal)),
        (p1.clone(), Intent::Fire(vec![56])),
        (p2.clone(), Intent::Fire(vec![57])),
        (p1.clone(), Intent::Rematch { accept: true }),
    ];
    for (player, intent) in script {
        let expected = session.apply(&player, intent.clone()).unwrap();
        let actual = restored.apply(&player, intent).unwrap();
        assert_eq!(actual, expected);
    }
    assert_eq!(restored.state(), session.state());
}
