//! Error taxonomy shared by the engine, the enumerator and the EV engine.
//!
//! All three failure classes are local to one call: an [`EngineError`] never
//! leaves state half-mutated and never needs cross-call recovery.

use crate::engine::{Camel, PlayerId, Position};

/// A rule breach reported to the caller. The state it was checked against is left untouched.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IllegalAction {
    #[error("tile position {position} is outside 2..={last}")]
    TileOutOfBounds { position: Position, last: Position },
    #[error("tile position {0} is occupied by camels")]
    TileOnOccupiedSpace(Position),
    #[error("tile position {position} touches the tile at {existing}")]
    TileTooClose { position: Position, existing: Position },
    #[error("player {0} already has a tile on the track this round")]
    TileAlreadyPlaced(PlayerId),
    #[error("no round tickets left for {0}")]
    TicketsExhausted(Camel),
    #[error("player {player} already used the overall card for {camel}")]
    CardConsumed { player: PlayerId, camel: Camel },
    #[error("{0} is not a racing camel")]
    NotRacing(Camel),
    #[error("{0} is not on the track")]
    CamelNotPlaced(Camel),
    #[error("the round is complete; no die can be drawn")]
    RoundComplete,
    #[error("die {0} has already been resolved this round")]
    DieNotInPool(String),
    #[error("the game is over")]
    GameOver,
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("illegal action: {0}")]
    IllegalAction(#[from] IllegalAction),
    /// An engine defect: the computation is aborted rather than returning a wrong answer.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("enumeration aborted by deadline after {nodes} nodes")]
    DeadlineExceeded { nodes: u64 },
    /// The board cannot resolve a die that may still be drawn.
    #[error("unplayable board: {0}")]
    UnplayableBoard(String),
}

impl EngineError {
    pub fn invariant(msg: impl Into<String>) -> Self { EngineError::InvariantViolation(msg.into()) }
}
