//! The battle session: replicated state, the turn and ability resolvers, and the
//! controller that drives a match through its phases.
//!
//! [`Session`] is the entry point. Every intent mutates the [`SessionState`] on the
//! calling thread and returns an [`Update`] listing the field-level [`Change`]s it made,
//! so the same rules can run behind a network host or in a local single-player match.

pub use self::{
    ability::AbilityRequest,
    changes::{AbilityEvent, Broadcast, Change, Effect, ScanRegion, Update},
    session::{CellView, Intent, Session},
    state::{AbilityKind, Phase, PlayerId, PlayerState, SessionState},
};

mod ability;
mod changes;
mod session;
mod state;
mod turn;
