//! Runs sessions on their own worker threads. Each worker owns one [`Session`] and
//! serializes every intent submitted to it. Updates are pushed to observers through
//! unbounded channels, so a slow observer never holds up rule evaluation.
use std::{collections::HashMap, io, sync::Arc, thread};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    board::PlaceError,
    game::{Intent, PlayerId, Session, SessionState, Update},
    ships::Ruleset,
};

/// Identifies a session within a [`SessionHost`].
pub type SessionId = u64;

/// Error talking to a session worker.
#[derive(Debug, Error)]
pub enum HostError {
    /// The worker has shut down and accepts nothing further.
    #[error("session {0} is closed")]
    Closed(SessionId),

    #[error("could not start session worker: {0}")]
    Spawn(#[from] io::Error),
}

enum Command {
    Submit(PlayerId, Intent),
    Request(PlayerId, Intent, Sender<Result<Update, PlaceError>>),
    Subscribe(Sender<Update>),
    Snapshot(Sender<SessionState>),
    Close,
}

/// Cheap, cloneable handle for sending intents to one session worker.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: Sender<Command>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    fn send(&self, command: Command) -> Result<(), HostError> {
        self.commands
            .send(command)
            .map_err(|_| HostError::Closed(self.id))
    }

    /// Queue an intent without waiting for it to be resolved. A rejected placement is
    /// only logged.
    pub fn submit(&self, player: PlayerId, intent: Intent) -> Result<(), HostError> {
        self.send(Command::Submit(player, intent))
    }

    /// Queue an intent and wait for its result.
    pub fn request(
        &self,
        player: PlayerId,
        intent: Intent,
    ) -> Result<Result<Update, PlaceError>, HostError> {
        let (reply, result) = bounded(1);
        self.send(Command::Request(player, intent, reply))?;
        result.recv().map_err(|_| HostError::Closed(self.id))
    }

    /// Receive every non-empty [`Update`] the session produces from now on. Dropping the
    /// receiver unsubscribes.
    pub fn subscribe(&self) -> Result<Receiver<Update>, HostError> {
        let (observer, updates) = unbounded();
        self.send(Command::Subscribe(observer))?;
        Ok(updates)
    }

    /// Get a copy of the current session state.
    pub fn snapshot(&self) -> Result<SessionState, HostError> {
        let (reply, state) = bounded(1);
        self.send(Command::Snapshot(reply))?;
        state.recv().map_err(|_| HostError::Closed(self.id))
    }

    /// Ask the worker to stop after the commands already queued.
    pub fn close(&self) -> Result<(), HostError> {
        self.send(Command::Close)
    }
}

/// Owns the worker threads of many independent sessions.
#[derive(Debug)]
pub struct SessionHost {
    rules: Arc<Ruleset>,
    next_id: SessionId,
    workers: HashMap<SessionId, (SessionHandle, thread::JoinHandle<Session>)>,
}

impl SessionHost {
    /// Create a host whose sessions all play by `rules`.
    pub fn new(rules: Arc<Ruleset>) -> Self {
        Self {
            rules,
            next_id: 0,
            workers: HashMap::new(),
        }
    }

    /// Start a new empty session.
    pub fn open(&mut self, seed: u64) -> Result<SessionHandle, HostError> {
        self.start(Session::new(self.rules.clone(), seed))
    }

    /// Start a session from a saved state.
    pub fn restore(&mut self, state: SessionState) -> Result<SessionHandle, HostError> {
        self.start(Session::restore(self.rules.clone(), state))
    }

    /// Get the handle of a running session.
    pub fn get(&self, id: SessionId) -> Option<&SessionHandle> {
        self.workers.get(&id).map(|(handle, _)| handle)
    }

    /// Number of sessions this host is running.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Stop a session and wait for its worker, returning its final state. Returns `None`
    /// if there is no such session or its worker panicked.
    pub fn close(&mut self, id: SessionId) -> Option<SessionState> {
        let (handle, worker) = self.workers.remove(&id)?;
        // The worker may already have stopped, in which case join still succeeds.
        let _ = handle.close();
        match worker.join() {
            Ok(session) => {
                info!(session = id, "session closed");
                Some(session.snapshot())
            }
            Err(_) => {
                warn!(session = id, "session worker panicked");
                None
            }
        }
    }

    /// Close every session.
    pub fn shutdown(&mut self) -> Vec<(SessionId, SessionState)> {
        let mut ids: Vec<_> = self.workers.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.close(id).map(|state| (id, state)))
            .collect()
    }

    fn start(&mut self, session: Session) -> Result<SessionHandle, HostError> {
        let id = self.next_id;
        let (commands, queue) = unbounded();
        let worker = thread::Builder::new()
            .name(format!("session-{}", id))
            .spawn(move || run(id, session, queue))?;
        self.next_id += 1;
        let handle = SessionHandle { id, commands };
        self.workers.insert(id, (handle.clone(), worker));
        info!(session = id, "session opened");
        Ok(handle)
    }
}

impl Drop for SessionHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop for one session.
fn run(id: SessionId, mut session: Session, queue: Receiver<Command>) -> Session {
    let mut observers: Vec<Sender<Update>> = Vec::new();
    while let Ok(command) = queue.recv() {
        let update = match command {
            Command::Submit(player, intent) => match session.apply(&player, intent) {
                Ok(update) => update,
                Err(err) => {
                    debug!(session = id, %player, %err, "submitted placement rejected");
                    continue;
                }
            },
            Command::Request(player, intent, reply) => {
                let result = session.apply(&player, intent);
                let update = result.as_ref().ok().cloned().unwrap_or_default();
                if reply.send(result).is_err() {
                    debug!(session = id, %player, "requester went away");
                }
                update
            }
            Command::Subscribe(observer) => {
                observers.push(observer);
                continue;
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(session.snapshot());
                continue;
            }
            Command::Close => break,
        };
        if update.is_empty() {
            continue;
        }
        let before = observers.len();
        observers.retain(|observer| observer.send(update.clone()).is_ok());
        if observers.len() < before {
            debug!(session = id, pruned = before - observers.len(), "observers disconnected");
        }
    }
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::{CannotPlaceReason, FleetSubmission},
        game::{Change, Phase},
        game::test_support::{tiny_fleet, tiny_rules},
    };

    #[test]
    fn intents_reach_session_and_observers() {
        let mut host = SessionHost::new(Arc::new(tiny_rules()));
        let handle = host.open(4).unwrap();
        let updates = handle.subscribe().unwrap();
        handle.submit("a".into(), Intent::Join).unwrap();
        handle.submit("b".into(), Intent::Join).unwrap();

        assert_eq!(
            updates.recv().unwrap().changes,
            vec![Change::PlayerJoined("a".into())]
        );
        assert_eq!(
            updates.recv().unwrap().changes,
            vec![Change::PlayerJoined("b".into()), Change::Phase(Phase::Placing)]
        );
        assert_eq!(handle.snapshot().unwrap().phase(), Phase::Placing);
    }

    #[test]
    fn request_reports_rejected_placement() {
        let rules = tiny_rules();
        let fleet = tiny_fleet(&rules);
        let mut host = SessionHost::new(Arc::new(rules));
        let handle = host.open(4).unwrap();
        handle.request("a".into(), Intent::Join).unwrap().unwrap();
        handle.request("b".into(), Intent::Join).unwrap().unwrap();

        let bad = FleetSubmission {
            cells: fleet.cells.clone(),
            orientations: fleet.orientations.clone(),
            pivots: fleet.pivots[..1].to_vec(),
        };
        let err = handle
            .request("a".into(), Intent::Place(bad))
            .unwrap()
            .unwrap_err();
        assert_eq!(err.reason(), CannotPlaceReason::WrongShipCount);

        let update = handle
            .request("a".into(), Intent::Place(fleet))
            .unwrap()
            .unwrap();
        assert_eq!(update.changes, vec![Change::FleetSubmitted("a".into())]);
    }

    #[test]
    fn closed_session_rejects_commands() {
        let mut host = SessionHost::new(Arc::new(tiny_rules()));
        let handle = host.open(1).unwrap();
        handle.submit("a".into(), Intent::Join).unwrap();
        let state = host.close(handle.id()).unwrap();
        assert_eq!(state.players().len(), 1);
        assert!(host.is_empty());
        assert!(matches!(
            handle.submit("b".into(), Intent::Join),
            Err(HostError::Closed(_))
        ));
    }

    #[test]
    fn dropped_observers_are_pruned() {
        let mut host = SessionHost::new(Arc::new(tiny_rules()));
        let handle = host.open(1).unwrap();
        drop(handle.subscribe().unwrap());
        let kept = handle.subscribe().unwrap();
        handle.submit("a".into(), Intent::Join).unwrap();
        assert!(kept.recv().is_ok());
    }

    #[test]
    fn restored_sessions_continue() {
        let mut host = SessionHost::new(Arc::new(tiny_rules()));
        let first = host.open(1).unwrap();
        first.request("a".into(), Intent::Join).unwrap().unwrap();
        let saved = host.close(first.id()).unwrap();

        let second = host.restore(saved).unwrap();
        assert_ne!(first.id(), second.id());
        let update = second.request("b".into(), Intent::Join).unwrap().unwrap();
        assert!(update.changes.contains(&Change::Phase(Phase::Placing)));
        assert_eq!(host.shutdown().len(), 1);
    }
}
