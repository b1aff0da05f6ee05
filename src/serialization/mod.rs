//! Snapshot encoding for game states.
//!
//! A snapshot is the postcard encoding of a [`GameState`]. The state carries
//! its own [`RuleSet`](crate::rules::RuleSet), so a decoded snapshot can be
//! handed straight back to the enumerator or to `GameState::apply`.

mod snapshot;

pub use snapshot::{from_postcard_bytes, read_postcard_from_path, to_postcard_bytes, write_postcard_to_path, SerializationError};
