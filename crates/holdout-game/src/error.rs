//! Error types for the game model.

use holdout_protocol::{ConnectionId, Phase};

/// Why a state transition was refused.
///
/// The coordinator drops most of these silently (they are client desync,
/// not user mistakes), but the model still names the reason so tests and
/// logs can tell them apart.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    /// The acting connection is not a member of the room.
    #[error("{0} is not a member of this room")]
    NotMember(ConnectionId),

    /// The acting player has been eliminated.
    #[error("{0} is not alive")]
    NotAlive(ConnectionId),

    /// The vote names a connection that is not an alive member.
    #[error("{0} is not a valid vote target")]
    UnknownTarget(ConnectionId),

    /// A player tried to vote for themselves.
    #[error("{0} cannot vote for themselves")]
    SelfVote(ConnectionId),

    /// The operation is not valid in the room's current phase.
    #[error("operation not allowed in phase {0}")]
    WrongPhase(Phase),
}
