//! The Holdout server: a WebSocket front door, a single coordinator task
//! owning all rooms, and a periodic sweep for round timers.
//!
//! Layering, bottom up:
//!
//! - `holdout-protocol` — wire events and the JSON codec
//! - `holdout-game` — the pure room state machine
//! - this crate — sockets, the command queue, and the clock
//!
//! All game state lives in the [`Coordinator`]; socket tasks only decode,
//! encode, and forward.

mod config;
mod coordinator;
mod directory;
mod error;
mod server;

pub use config::ServerConfig;
pub use coordinator::{Command, Coordinator};
pub use error::ServerError;
pub use server::Server;
