use std::fs;
use std::io;
use std::path::Path;

use crate::engine::GameState;
use crate::error::EngineError;

#[derive(thiserror::Error, Debug)]
pub enum SerializationError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
    #[error("invalid snapshot: {0}")]
    Invalid(#[from] EngineError),
}

/// Encode a state snapshot to postcard bytes.
pub fn to_postcard_bytes(state: &GameState) -> Result<Vec<u8>, SerializationError> {
    Ok(postcard::to_allocvec(state)?)
}

/// Decode a state snapshot from postcard bytes. The decoded track must hold
/// every placed camel exactly once, where its position says it is.
pub fn from_postcard_bytes(bytes: &[u8]) -> Result<GameState, SerializationError> {
    let state: GameState = postcard::from_bytes(bytes)?;
    state.board.track.check_invariants()?;
    Ok(state)
}

/// Write a postcard-encoded snapshot to a file.
pub fn write_postcard_to_path<P: AsRef<Path>>(path: P, state: &GameState) -> Result<(), SerializationError> {
    let bytes = to_postcard_bytes(state)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Read a postcard-encoded snapshot from a file.
pub fn read_postcard_from_path<P: AsRef<Path>>(path: P) -> Result<GameState, SerializationError> {
    let bytes = fs::read(path)?;
    from_postcard_bytes(&bytes)
}
