//! Single-process play against a computer [`Strategy`]. The computer's decisions go
//! through the same intent queue as the human's, one at a time.
use std::{collections::VecDeque, sync::Arc};

use tracing::{debug, warn};

use crate::{
    bot::Strategy,
    board::PlaceError,
    game::{CellView, Intent, Phase, PlayerId, Session, Update},
    ships::Ruleset,
};

/// A match between a local human and a computer opponent.
#[derive(Debug)]
pub struct LocalMatch<S> {
    session: Session,
    human: PlayerId,
    computer: PlayerId,
    strategy: S,
    queue: VecDeque<(PlayerId, Intent)>,
}

impl<S: Strategy> LocalMatch<S> {
    /// Start a match. Both players join immediately and the computer places its fleet.
    pub fn new(rules: Arc<Ruleset>, seed: u64, strategy: S) -> Self {
        let mut game = Self {
            session: Session::new(rules, seed),
            human: PlayerId::new("player"),
            computer: PlayerId::new("enemy"),
            strategy,
            queue: VecDeque::new(),
        };
        game.queue.push_back((game.human.clone(), Intent::Join));
        game.queue.push_back((game.computer.clone(), Intent::Join));
        // Joining can't fail, and the computer's own rejections stop the drain.
        let _ = game.drain();
        game
    }

    pub fn human(&self) -> &PlayerId {
        &self.human
    }

    pub fn computer(&self) -> &PlayerId {
        &self.computer
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn rules(&self) -> &Ruleset {
        self.session.rules()
    }

    /// The human's view of the computer's board.
    pub fn target_view(&self) -> Vec<CellView> {
        self.session.target_view(&self.human).unwrap_or_default()
    }

    /// Submit an intent for the human, then let the computer respond until it is the
    /// human's move again. Returns everything that changed, in order.
    pub fn submit(&mut self, intent: Intent) -> Result<Update, PlaceError> {
        self.queue.push_back((self.human.clone(), intent));
        self.drain()
    }

    fn drain(&mut self) -> Result<Update, PlaceError> {
        let mut total = Update::default();
        loop {
            let (player, intent) = match self.queue.pop_front() {
                Some(next) => next,
                None => match self.computer_intent() {
                    Some(intent) => (self.computer.clone(), intent),
                    None => break,
                },
            };
            let from_computer = player == self.computer;
            let update = match self.session.apply(&player, intent) {
                Ok(update) => update,
                Err(err) if from_computer => {
                    warn!(%err, "computer fleet rejected");
                    break;
                }
                Err(err) => return Err(err),
            };
            if update.is_empty() {
                if from_computer {
                    warn!("computer made an illegal move");
                    break;
                }
                continue;
            }
            self.strategy.observe(&self.computer, &update);
            total.extend(update);
        }
        Ok(total)
    }

    /// What the computer wants to do next, if anything.
    fn computer_intent(&mut self) -> Option<Intent> {
        let state = self.session.state();
        let me = state.player(&self.computer)?;
        let rules = self.session.rules();
        match state.phase() {
            Phase::Placing if !me.has_placed() => {
                debug!("computer placing fleet");
                self.strategy.place_fleet(rules).map(Intent::Place)
            }
            Phase::Battle if state.turn_owner() == Some(&self.computer) => {
                match self.strategy.choose_ability(rules, me) {
                    Some(request) if !me.has_used(request.kind()) => {
                        Some(Intent::UseAbility(request))
                    }
                    _ => Some(Intent::Fire(self.strategy.choose_targets(rules, me))),
                }
            }
            Phase::Result if !me.wants_rematch() => state
                .player(&self.human)
                .filter(|human| human.wants_rematch())
                .map(|_| Intent::Rematch { accept: true }),
            _ => None,
        }
    }
}
