//! A deterministic rules engine for two-player battleship with special abilities, bomb
//! ships and rematches.
//!
//! The same [`game::Session`] drives both networked play, through the per-session
//! worker threads in [`host`], and local play against the computer in [`offline`].
//! Every intent returns an [`game::Update`] describing exactly which fields changed,
//! so observers never need to diff state.
//!
//! ```
//! use std::sync::Arc;
//! use seabattle::{game::{Phase, Session}, ships::Ruleset};
//!
//! let mut session = Session::new(Arc::new(Ruleset::standard()), 42);
//! session.join(&"alice".into());
//! session.join(&"bob".into());
//! assert_eq!(session.state().phase(), Phase::Placing);
//! ```

pub mod board;
pub mod bot;
pub mod game;
pub mod host;
pub mod offline;
pub mod ships;
