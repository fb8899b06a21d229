//! Game model for Holdout: the card catalog and the pure room state
//! machine.
//!
//! Nothing in this crate performs I/O. Every operation is a deterministic
//! transition on a [`Room`] given its inputs (randomness is injected for
//! card draws), which is what makes the elimination and game-end rules
//! testable without a server.
//!
//! # Key types
//!
//! - [`cards`] — the static attribute catalog and draw helper
//! - [`Player`] / [`Hand`] — a member and their five secret cards
//! - [`Room`] — membership, phase machine, votes, and projections
//! - [`GameError`] — why a transition was refused

pub mod cards;
mod error;
mod player;
mod room;

pub use error::GameError;
pub use player::{Hand, Player};
pub use room::{Room, VoteResolution};
