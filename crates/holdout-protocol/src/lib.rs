//! Wire protocol for Holdout.
//!
//! This crate defines the language that clients and the server speak:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`RoomStateView`], etc.) —
//!   the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while encoding or
//!   decoding.
//!
//! The protocol layer sits between the transport (raw frames) and the game
//! model. It knows nothing about connections, rooms, or timers — only how
//! events and state projections are shaped.

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    CardCategory, ClientEvent, ConnectionId, Phase, PlayerView,
    PrivateStateView, RoomCode, RoomSettings, RoomStateView, Scenario,
    ServerEvent,
};
