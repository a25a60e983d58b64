//! The session controller: one match's lifecycle from join to leave.
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::{
    board::{validate_fleet, FleetLayout, FleetSubmission, PlaceError, ShipPose},
    game::{ability, turn, AbilityRequest, Change, Phase, PlayerId, PlayerState, SessionState, Update},
    ships::Ruleset,
};

/// Something a player asks the session to do.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    Join,
    Place(FleetSubmission),
    /// Fire at one cell, or two when a multi-shot is armed.
    Fire(Vec<usize>),
    UseAbility(AbilityRequest),
    Rematch { accept: bool },
    Leave,
}

/// What a player knows about a cell of the opponent's board.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CellView {
    Unknown,
    Miss,
    Hit,
    Bomb,
}

/// One match between two players. All rule evaluation happens here; callers feed in
/// intents and forward the resulting [`Update`]s.
#[derive(Debug, Clone)]
pub struct Session {
    rules: Arc<Ruleset>,
    state: SessionState,
}

impl Session {
    /// Create an empty session. All randomness in the session derives from `seed`.
    pub fn new(rules: Arc<Ruleset>, seed: u64) -> Self {
        Self {
            rules,
            state: SessionState::new(seed),
        }
    }

    /// Resume a session from a snapshot taken with the same rules.
    pub fn restore(rules: Arc<Ruleset>, state: SessionState) -> Self {
        Self { rules, state }
    }

    pub fn rules(&self) -> &Arc<Ruleset> {
        &self.rules
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Copy of the current state, suitable for serializing.
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    /// Apply any intent. Only a rejected fleet placement is reported as an error; every
    /// other illegal intent is ignored and produces an empty update.
    pub fn apply(&mut self, player: &PlayerId, intent: Intent) -> Result<Update, PlaceError> {
        Ok(match intent {
            Intent::Join => self.join(player),
            Intent::Place(fleet) => return self.place(player, &fleet),
            Intent::Fire(targets) => self.fire(player, &targets),
            Intent::UseAbility(request) => self.use_ability(player, request),
            Intent::Rematch { accept } => self.rematch(player, accept),
            Intent::Leave => self.leave(player),
        })
    }

    /// Add a player. The session starts placement once two players have joined.
    pub fn join(&mut self, player: &PlayerId) -> Update {
        let mut update = Update::default();
        if self.state.phase != Phase::Waiting
            || self.state.players.len() >= 2
            || self.state.index_of(player).is_some()
        {
            trace!(%player, phase = ?self.state.phase, "join ignored");
            return update;
        }
        debug!(%player, "player joined");
        self.state
            .players
            .push(PlayerState::new(player.clone(), &self.rules));
        update.push(Change::PlayerJoined(player.clone()));
        if self.state.players.len() == 2 {
            self.set_phase(Phase::Placing, &mut update);
        }
        update
    }

    /// Submit a fleet. The whole submission is rejected if any ship is off the board or
    /// overlaps another. Once both fleets are in, the battle starts.
    pub fn place(
        &mut self,
        player: &PlayerId,
        fleet: &FleetSubmission,
    ) -> Result<Update, PlaceError> {
        let mut update = Update::default();
        if self.state.phase != Phase::Placing {
            trace!(%player, phase = ?self.state.phase, "placement outside of placing ignored");
            return Ok(update);
        }
        let idx = match self.state.index_of(player) {
            Some(idx) if !self.state.players[idx].has_placed() => idx,
            _ => {
                trace!(%player, "placement from unknown or placed player ignored");
                return Ok(update);
            }
        };
        let layout = validate_fleet(&self.rules, fleet).map_err(|err| {
            debug!(%player, %err, "placement rejected");
            err
        })?;
        debug!(%player, "fleet placed");
        self.state.players[idx].layout = Some(layout);
        update.push(Change::FleetSubmitted(player.clone()));
        if self.state.players.iter().all(PlayerState::has_placed) {
            self.start_battle(&mut update);
        }
        Ok(update)
    }

    /// Fire at the opponent's board.
    pub fn fire(&mut self, player: &PlayerId, targets: &[usize]) -> Update {
        turn::fire(&mut self.state, &self.rules, player, targets)
    }

    /// Use one of the special abilities.
    pub fn use_ability(&mut self, player: &PlayerId, request: AbilityRequest) -> Update {
        ability::use_ability(&mut self.state, &self.rules, player, request)
    }

    /// Accept or decline a rematch. Once both players accept, every board is cleared and
    /// placement starts again. Declining ends the session.
    pub fn rematch(&mut self, player: &PlayerId, accept: bool) -> Update {
        let mut update = Update::default();
        let idx = match self.state.index_of(player) {
            Some(idx) => idx,
            None => {
                trace!(%player, "rematch from unknown player ignored");
                return update;
            }
        };
        let phase = self.state.phase;
        if !accept {
            match phase {
                Phase::Waiting | Phase::Placing | Phase::Result => {
                    info!(%player, "rematch declined");
                    self.set_phase(Phase::Leave, &mut update);
                }
                _ => trace!(%player, ?phase, "decline ignored"),
            }
            return update;
        }
        if !matches!(phase, Phase::Battle | Phase::Result) || self.state.players[idx].rematch {
            trace!(%player, ?phase, "rematch ignored");
            return update;
        }
        debug!(%player, "rematch confirmed");
        self.state.players[idx].rematch = true;
        update.push(Change::RematchConfirmed(player.clone()));
        if self.state.players.iter().all(PlayerState::wants_rematch) {
            self.reset_boards(&mut update);
            self.state.rematching = true;
            self.set_phase(Phase::Placing, &mut update);
        }
        update
    }

    /// Leave the session. Leaving after a result ends the session; leaving at any other
    /// time returns the session to waiting for a new opponent.
    pub fn leave(&mut self, player: &PlayerId) -> Update {
        let mut update = Update::default();
        let idx = match self.state.index_of(player) {
            Some(idx) if self.state.phase != Phase::Leave => idx,
            _ => {
                trace!(%player, "leave ignored");
                return update;
            }
        };
        info!(%player, phase = ?self.state.phase, "player left");
        if self.state.phase == Phase::Result {
            self.set_phase(Phase::Leave, &mut update);
            return update;
        }
        self.state.players.remove(idx);
        update.push(Change::PlayerLeft(player.clone()));
        self.reset_boards(&mut update);
        self.state.rematching = false;
        self.state.last_starter = None;
        self.set_phase(Phase::Waiting, &mut update);
        update
    }

    /// Ship poses of the given player's fleet. Only available once a battle has been won.
    pub fn fleet_of(&self, player: &PlayerId) -> Option<&[ShipPose]> {
        self.state.winner.as_ref()?;
        self.state
            .player(player)
            .and_then(|p| p.layout.as_ref())
            .map(FleetLayout::poses)
    }

    /// The given player's own concealed fleet. Only that player should be shown this.
    pub fn layout_of(&self, player: &PlayerId) -> Option<&FleetLayout> {
        self.state.player(player).and_then(|p| p.layout.as_ref())
    }

    /// What `player` has learned about the opponent's board from their own shots.
    pub fn target_view(&self, player: &PlayerId) -> Option<Vec<CellView>> {
        let me = self.state.player(player)?;
        let layout = self.state.opponent(player)?.layout.as_ref();
        Some(
            me.shots
                .iter()
                .enumerate()
                .map(|(cell, shot)| match (shot, layout.and_then(|l| l.ship_at(cell))) {
                    (None, _) => CellView::Unknown,
                    (Some(_), None) => CellView::Miss,
                    (Some(_), Some(ship)) if self.rules.is_bomb(ship) => CellView::Bomb,
                    (Some(_), Some(_)) => CellView::Hit,
                })
                .collect(),
        )
    }

    fn set_phase(&mut self, phase: Phase, update: &mut Update) {
        if self.state.phase != phase {
            info!(from = ?self.state.phase, to = ?phase, "phase changed");
            self.state.phase = phase;
            update.push(Change::Phase(phase));
        }
    }

    fn set_turn(&mut self, owner: Option<PlayerId>, turn: u32, update: &mut Update) {
        if self.state.turn_owner != owner {
            self.state.turn_owner = owner;
            update.push(Change::TurnOwner(self.state.turn_owner.clone()));
        }
        if self.state.turn != turn {
            self.state.turn = turn;
            update.push(Change::TurnCounter(turn));
        }
    }

    /// Clear all battle state, keeping who is in the session.
    fn reset_boards(&mut self, update: &mut Update) {
        for player in self.state.players.iter_mut() {
            player.reset(&self.rules);
        }
        update.push(Change::BoardsReset);
        if self.state.winner.take().is_some() {
            update.push(Change::Winner(None));
        }
        self.set_turn(None, 1, update);
    }

    fn start_battle(&mut self, update: &mut Update) {
        let previous = self
            .state
            .last_starter
            .as_ref()
            .and_then(|last| self.state.index_of(last));
        let starter = match previous {
            Some(last) if self.state.rematching => 1 - last,
            _ => self.state.rng().gen_range(0, 2),
        };
        let starter = self.state.players[starter].id.clone();
        info!(%starter, "battle started");
        self.state.last_starter = Some(starter.clone());
        self.state.rematching = false;
        self.set_phase(Phase::Battle, update);
        self.set_turn(Some(starter), 1, update);
    }
}
