//! camel-odds: a camel-race board game engine with exact round odds
//!
//! This crate provides:
//! - The game model (`engine` module): stacked camels on a track, modifier
//!   tiles, the dice pyramid, betting tickets and overall bets
//! - An exhaustive round enumerator (`enumerate` module) with sequential and
//!   parallel variants sharing one memo layout
//! - An expected-value engine (`ev` module) ranking every legal action
//! - Strategies and a seeded game runner (`strategy` module)
//! - Postcard snapshots of game states (`serialization` module)
//!
//! Quick start:
//! ```
//! use camel_odds::engine::{Camel, GameState};
//! use camel_odds::enumerate::{EnumeratorConfig, RoundEnumerator};
//! use camel_odds::rules::RuleSet;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic setup with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let game = GameState::new_game(4, RuleSet::default(), &mut rng).unwrap();
//!
//! // Racing dice only keeps the doctest quick
//! let outcome = RoundEnumerator::with_config(EnumeratorConfig::reduced()).enumerate(&game).unwrap();
//! let p = outcome.distribution.p_first(Camel::Blue);
//! assert!((0.0..=1.0).contains(&p));
//! ```
//!
//! The enumerator never draws random numbers; the same state and config always
//! give bit-identical results. Live play takes an explicit RNG everywhere.
pub mod engine;
pub mod enumerate;
pub mod error;
pub mod ev;
pub mod rules;
pub mod serialization;
pub mod strategy;
