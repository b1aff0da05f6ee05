use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{EngineError, IllegalAction};
use crate::rules::RuleSet;

use super::betting::{OverallBet, OverallBook, OverallSide, PlayerState, Ticket, TicketStacks};
use super::board::Board;
use super::camel::{Camel, CRAZY_CAMELS, RACING_CAMELS};
use super::dice::{EventPool, Roll};
use super::tiles::Polarity;
use super::track::MoveReport;
use super::{PlayerId, Position};

/// One legal move for the player on turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Take the top round ticket of a colour.
    TakeTicket(Camel),
    PlaceTile { position: Position, polarity: Polarity },
    /// Pull a die from the pyramid and earn a guaranteed-draw token.
    Draw,
    BetOverall { camel: Camel, side: OverallSide },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::TakeTicket(camel) => write!(f, "ticket {camel}"),
            Action::PlaceTile { position, polarity } => write!(f, "tile {polarity:?} @{position}"),
            Action::Draw => f.write_str("draw"),
            Action::BetOverall { camel, side } => write!(f, "overall {side:?} {camel}"),
        }
    }
}

/// What happened during one call to [`GameState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub player: PlayerId,
    pub action: Action,
    pub roll: Option<Roll>,
    pub movement: Option<MoveReport>,
    /// Per-player coin deltas if the turn closed a round.
    pub round_deltas: Option<Vec<i32>>,
    /// Per-player overall-bet deltas if the turn ended the game.
    pub game_deltas: Option<Vec<i32>>,
}

/// Complete serialisable game state. No field is derived or hidden; a decoded
/// snapshot behaves exactly like the state it was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameState {
    pub rules: RuleSet,
    pub board: Board,
    pub pool: EventPool,
    pub tickets: TicketStacks,
    pub overall: OverallBook,
    pub players: Vec<PlayerState>,
    /// Player on turn.
    pub current: PlayerId,
    /// 1-based round counter.
    pub round: u32,
    pub finished: bool,
}

impl GameState {
    /// Empty-track state with no camels placed. Mostly for building scenarios.
    pub fn empty(players: usize, rules: RuleSet) -> Self {
        Self {
            board: Board::new(rules.track_length),
            pool: EventPool::full(),
            tickets: TicketStacks::new(&rules.ticket_values),
            overall: OverallBook::new(),
            players: (0..players).map(|_| PlayerState::new(rules.starting_coins)).collect(),
            current: 0,
            round: 1,
            finished: false,
            rules,
        }
    }

    /// Set up a fresh game: racing camels in random order at a movement-die roll,
    /// crazy camels near the end at a grey-die value.
    pub fn new_game<R: Rng + ?Sized>(players: usize, rules: RuleSet, rng: &mut R) -> Result<Self, EngineError> {
        if players == 0 {
            return Err(EngineError::invariant("a game needs at least one player"));
        }
        let mut state = Self::empty(players, rules);
        let mut order = RACING_CAMELS;
        order.shuffle(rng);
        for camel in order {
            let steps = state.rules.dice.movement.sample(rng).ok_or_else(|| EngineError::invariant("empty movement table"))?;
            state.board.track.place(camel, steps);
        }
        let mut crazy = CRAZY_CAMELS;
        crazy.shuffle(rng);
        for camel in crazy {
            let value = rng.gen_range(1..=3);
            state.board.track.place(camel, state.rules.crazy_start(value));
        }
        state.board.track.check_invariants()?;
        debug!(players, board = %state.board, "new game");
        Ok(state)
    }

    /// Legal actions for the player on turn, in declaration order.
    pub fn legal_actions(&self) -> Vec<Action> { self.legal_actions_for(self.current) }

    /// Legal actions for `player` if it were their turn: tickets, tiles, draw, overall bets.
    pub fn legal_actions_for(&self, player: PlayerId) -> Vec<Action> {
        let Some(holder) = self.players.get(player) else { return Vec::new() };
        if self.finished {
            return Vec::new();
        }
        let mut out: Vec<Action> = RACING_CAMELS
            .into_iter()
            .filter(|&c| self.tickets.top(c).is_some())
            .map(Action::TakeTicket)
            .collect();
        if self.board.tiles.owned_by(player).is_none() {
            for position in self.board.tiles.legal_positions(player, &self.board.track) {
                out.extend(Polarity::BOTH.map(|polarity| Action::PlaceTile { position, polarity }));
            }
        }
        if !self.pool.is_round_complete() {
            out.push(Action::Draw);
        }
        for camel in holder.cards.iter() {
            out.push(Action::BetOverall { camel, side: OverallSide::Winner });
            out.push(Action::BetOverall { camel, side: OverallSide::Loser });
        }
        out
    }

    /// Play `action` for the player on turn. On error nothing changes.
    ///
    /// A state whose track breaks the stacking invariant is refused before any
    /// rule is consulted.
    pub fn apply<R: Rng + ?Sized>(&mut self, action: Action, rng: &mut R) -> Result<TurnReport, EngineError> {
        self.board.track.check_invariants()?;
        if self.finished {
            return Err(IllegalAction::GameOver.into());
        }
        let player = self.current;
        if player >= self.players.len() {
            return Err(IllegalAction::UnknownPlayer(player).into());
        }
        let mut report = TurnReport { player, action, roll: None, movement: None, round_deltas: None, game_deltas: None };
        match action {
            Action::TakeTicket(camel) => {
                let ticket: Ticket = self.tickets.take(camel)?;
                self.players[player].tickets.push(ticket);
            }
            Action::PlaceTile { position, polarity } => {
                self.board.place_tile(position, polarity, player)?;
            }
            Action::BetOverall { camel, side } => {
                self.players[player].use_card(player, camel)?;
                self.overall.place(OverallBet { player, camel, side });
            }
            Action::Draw => {
                let mut pool = self.pool;
                let die = pool.draw(rng)?;
                let roll = self.rules.dice.roll(die, rng).ok_or_else(|| EngineError::invariant(format!("{die} has no faces")))?;
                let mut board = self.board.clone();
                let movement = board.apply_roll(&roll)?;
                self.pool = pool;
                self.board = board;
                self.players[player].draw_tokens += 1;
                if let Some(tile) = movement.tile {
                    if let Some(owner) = self.players.get_mut(tile.owner) {
                        owner.credit(self.rules.tile_payout);
                    }
                }
                debug!(player, die = %die, steps = roll.steps, from = movement.from, to = movement.to, "draw");
                report.roll = Some(roll);
                report.movement = Some(movement);
                if movement.finished {
                    report.round_deltas = Some(self.settle_round());
                    report.game_deltas = Some(self.settle_game());
                } else if self.pool.is_round_complete() {
                    report.round_deltas = Some(self.settle_round());
                }
            }
        }
        self.current = (player + 1) % self.players.len();
        Ok(report)
    }

    /// Pay tickets and draw tokens, then reset everything round-scoped.
    fn settle_round(&mut self) -> Vec<i32> {
        let ranking = self.board.ranking();
        let deltas: Vec<i32> = self
            .players
            .iter_mut()
            .map(|p| {
                let delta = p.round_delta(&ranking, self.rules.draw_payout);
                p.credit(delta);
                p.reset_round();
                delta
            })
            .collect();
        info!(round = self.round, ranking = %ranking, ?deltas, "round settled");
        self.tickets.reset(&self.rules.ticket_values);
        self.board.tiles.clear();
        self.pool.reset();
        self.round += 1;
        deltas
    }

    fn settle_game(&mut self) -> Vec<i32> {
        let ranking = self.board.ranking();
        let mut deltas = vec![0; self.players.len()];
        for (player, delta) in self.overall.settle(&ranking, &self.rules.overall_payouts, self.rules.overall_wrong) {
            if let Some(d) = deltas.get_mut(player) {
                *d += delta;
            }
        }
        for (p, &delta) in self.players.iter_mut().zip(&deltas) {
            p.credit(delta);
        }
        self.finished = true;
        info!(ranking = %ranking, ?deltas, scores = ?self.scores(), "game over");
        deltas
    }

    pub fn scores(&self) -> Vec<u32> { self.players.iter().map(|p| p.coins).collect() }

    /// Players sharing the highest balance once the game is over.
    pub fn winners(&self) -> Vec<PlayerId> {
        if !self.finished {
            return Vec::new();
        }
        let best = self.players.iter().map(|p| p.coins).max().unwrap_or(0);
        (0..self.players.len()).filter(|&i| self.players[i].coins == best).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Die;
    use rand::{rngs::StdRng, SeedableRng};

    fn scenario(stacks: &[(Position, &[Camel])]) -> GameState {
        let mut s = GameState::empty(2, RuleSet::default());
        s.board = Board::from_stacks(16, stacks);
        s
    }

    #[test]
    fn corrupted_track_is_refused() {
        let mut rng = StdRng::seed_from_u64(5);
        let state = GameState::new_game(2, RuleSet::default(), &mut rng).unwrap();
        let mut bytes = postcard::to_allocvec(&state).unwrap();
        let track = postcard::to_allocvec(&state.board.track).unwrap();
        let at = bytes.windows(track.len()).position(|w| w == track.as_slice()).unwrap();
        // Length byte, then blue's slot tag and position.
        bytes[at + 2] = 200;
        let mut broken: GameState = postcard::from_bytes(&bytes).unwrap();
        let before = broken.clone();
        let err = broken.apply(Action::Draw, &mut rng).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation(_)), "{err}");
        assert_eq!(broken, before);
    }

    #[test]
    fn setup_places_every_camel() {
        let mut rng = StdRng::seed_from_u64(5);
        let s = GameState::new_game(4, RuleSet::default(), &mut rng).unwrap();
        for camel in RACING_CAMELS {
            assert!((1..=3).contains(&s.board.track.position(camel).unwrap()));
        }
        for camel in CRAZY_CAMELS {
            assert!((14..=16).contains(&s.board.track.position(camel).unwrap()));
        }
        assert_eq!(s.scores(), vec![3; 4]);
        assert!(GameState::new_game(0, RuleSet::default(), &mut rng).is_err());
    }

    #[test]
    fn illegal_action_leaves_state_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = scenario(&[(4, &[Camel::Blue])]);
        let before = s.clone();
        let err = s.apply(Action::PlaceTile { position: 4, polarity: Polarity::Amplify }, &mut rng).unwrap_err();
        assert_eq!(err, EngineError::IllegalAction(IllegalAction::TileOnOccupiedSpace(4)));
        assert_eq!(s, before);
    }

    #[test]
    fn reused_card_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = scenario(&[(4, &[Camel::Blue])]);
        s.apply(Action::BetOverall { camel: Camel::Red, side: OverallSide::Winner }, &mut rng).unwrap();
        s.current = 0;
        let err = s.apply(Action::BetOverall { camel: Camel::Red, side: OverallSide::Loser }, &mut rng).unwrap_err();
        assert_eq!(err, EngineError::IllegalAction(IllegalAction::CardConsumed { player: 0, camel: Camel::Red }));
        assert_eq!(s.overall.bets(OverallSide::Loser).len(), 0);
    }

    #[test]
    fn legal_actions_cover_every_kind() {
        let s = scenario(&[(1, &[Camel::Blue, Camel::Green, Camel::Yellow, Camel::Red, Camel::Purple]), (16, &[Camel::White, Camel::Black])]);
        let actions = s.legal_actions();
        assert_eq!(actions.iter().filter(|a| matches!(a, Action::TakeTicket(_))).count(), 5);
        // Spaces 2..=15 are free; 16 holds the crazy camels.
        assert_eq!(actions.iter().filter(|a| matches!(a, Action::PlaceTile { .. })).count(), 14 * 2);
        assert!(actions.contains(&Action::Draw));
        assert_eq!(actions.iter().filter(|a| matches!(a, Action::BetOverall { .. })).count(), 10);
    }

    #[test]
    fn round_settles_when_one_die_left() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut s = scenario(&[(1, &[Camel::Blue, Camel::Green, Camel::Yellow, Camel::Red, Camel::Purple]), (16, &[Camel::White, Camel::Black])]);
        s.pool = EventPool::with_dice([Die::Racing(Camel::Blue), Die::Racing(Camel::Red)]);
        s.players[1].tickets.push(Ticket { camel: Camel::Green, value: 5 });
        s.tickets.take(Camel::Green).unwrap();
        let report = s.apply(Action::Draw, &mut rng).unwrap();
        let deltas = report.round_deltas.expect("round closed");
        assert_eq!(deltas[0], 1);
        assert_eq!(deltas[1], s.players[1].coins as i32 - 3);
        assert_eq!(s.pool, EventPool::full());
        assert_eq!(s.round, 2);
        assert!(s.players.iter().all(|p| p.tickets.is_empty() && p.draw_tokens == 0));
        assert_eq!(s.tickets.top(Camel::Green), Some(5));
        assert_eq!(s.current, 1);
    }

    #[test]
    fn finishing_move_ends_game_and_pays_overall() {
        let mut rng = StdRng::seed_from_u64(2);
        // Either die carries blue past the last space with blue on top.
        let mut s = scenario(&[(16, &[Camel::Green, Camel::Blue]), (2, &[Camel::Red])]);
        s.pool = EventPool::with_dice([Die::Racing(Camel::Blue), Die::Racing(Camel::Green)]);
        s.overall.place(OverallBet { player: 1, camel: Camel::Blue, side: OverallSide::Winner });
        s.overall.place(OverallBet { player: 0, camel: Camel::Green, side: OverallSide::Loser });
        let report = s.apply(Action::Draw, &mut rng).unwrap();
        assert!(s.finished);
        assert_eq!(report.round_deltas, Some(vec![1, 0]));
        assert_eq!(report.game_deltas, Some(vec![-1, 8]));
        assert_eq!(s.board.ranking().first(), Some(Camel::Blue));
        assert_eq!(s.scores(), vec![3, 11]);
        assert_eq!(s.apply(Action::Draw, &mut rng).unwrap_err(), EngineError::IllegalAction(IllegalAction::GameOver));
        assert!(s.legal_actions().is_empty());
        assert_eq!(s.winners(), vec![1]);
    }

    #[test]
    fn tile_owner_paid_on_landing() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut s = scenario(&[(4, &[Camel::Blue])]);
        s.rules.dice.movement = crate::engine::OutcomeTable::from_faces([1]);
        s.current = 1;
        s.apply(Action::PlaceTile { position: 5, polarity: Polarity::Amplify }, &mut rng).unwrap();
        // Crazy camels are off the board, so a grey draw fails and changes nothing.
        s.pool = EventPool::with_dice([Die::Racing(Camel::Blue), Die::Grey]);
        while s.board.track.position(Camel::Blue) == Some(4) {
            if s.apply(Action::Draw, &mut rng).is_err() {
                assert_eq!(s.pool.len(), 2);
            }
        }
        assert_eq!(s.board.track.position(Camel::Blue), Some(6));
        assert_eq!(s.players[1].coins, 4);
        assert!(s.board.tiles.is_empty());
    }
}
