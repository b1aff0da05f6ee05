//! Game-state engine: camels and stacks, tiles, dice, bets and the round lifecycle.
//!
//! Everything here is a plain value. Live randomness enters only through the
//! `rng` arguments of [`GameState::new_game`], [`GameState::apply`] and the
//! dice samplers; the enumerator works on clones and never draws.
//!
//! Quick start
//! ```
//! use camel_odds::engine::{Action, GameState};
//! use camel_odds::rules::RuleSet;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut game = GameState::new_game(3, RuleSet::default(), &mut rng).unwrap();
//! let report = game.apply(Action::Draw, &mut rng).unwrap();
//! assert!(report.movement.is_some());
//! println!("{}", game.board);
//! ```

mod betting;
mod board;
mod camel;
mod dice;
mod game;
mod tiles;
mod track;

pub use betting::{overall_payout, ticket_ev, OverallBet, OverallBook, OverallSide, PlayerState, Ticket, TicketStacks};
pub use board::Board;
pub use camel::{Camel, CamelKind, CamelSet, ALL_CAMELS, CAMEL_COUNT, CRAZY_CAMELS, RACING_CAMELS};
pub use dice::{DiceTables, Die, EventMode, EventPool, OutcomeTable, Roll, DIE_COUNT};
pub use game::{Action, GameState, TurnReport};
pub use tiles::{ModifierTile, Polarity, TileSet};
pub use track::{MoveReport, Placement, Ranking, Track};

/// Seat index of a player, 0-based.
pub type PlayerId = usize;

/// Track space. 1 is the start, `RuleSet::track_length` the last space; beyond it is the finish.
pub type Position = u8;
