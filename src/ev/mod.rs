//! Expected coin value of every legal action for one player.
//!
//! The engine is a pure query: it clones what it needs, runs the enumerator
//! and never touches the caller's state.
//!
//! Quick start
//! ```
//! use camel_odds::engine::GameState;
//! use camel_odds::enumerate::{EnumeratorConfig, RoundEnumerator};
//! use camel_odds::ev::{EvConfig, EvEngine};
//! use camel_odds::rules::RuleSet;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(1);
//! let game = GameState::new_game(2, RuleSet::default(), &mut rng).unwrap();
//! let mut ev = EvEngine::with_config(RoundEnumerator::with_config(EnumeratorConfig::reduced()), EvConfig::default());
//! let eval = ev.evaluate(&game, game.current).unwrap();
//! let best = eval.best().unwrap();
//! assert_eq!(best.tier, 0);
//! ```

use tracing::debug;

use crate::engine::{overall_payout, ticket_ev, Action, GameState, OverallSide, PlayerId};
use crate::enumerate::{Enumerate, RoundEnumerator, RoundOutcome};
use crate::error::{EngineError, IllegalAction};

mod overall;

pub use overall::{rollout, FinalOdds, OverallMode, OverallPrecision};

/// Knobs for the EV engine.
#[derive(Debug, Clone)]
pub struct EvConfig {
    /// EVs closer than this to their tier leader share the tier.
    pub tie_epsilon: f64,
    pub overall: OverallMode,
}

impl Default for EvConfig {
    fn default() -> Self { Self { tie_epsilon: 1e-9, overall: OverallMode::RoundProxy } }
}

/// EV of one legal action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionEv {
    pub action: Action,
    pub ev: f64,
    /// 0 for the best group of equal-EV actions, 1 for the next, ...
    pub tier: usize,
    /// Position in the legal-action list.
    pub declared: usize,
}

/// Ranked EVs plus the round outcome they were derived from.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub player: PlayerId,
    /// Best tier first, declaration order inside a tier.
    pub actions: Vec<ActionEv>,
    pub outcome: RoundOutcome,
    pub overall_precision: OverallPrecision,
}

impl Evaluation {
    pub fn best(&self) -> Option<&ActionEv> { self.actions.first() }

    /// Every action tied with the best one.
    pub fn top_tier(&self) -> &[ActionEv] {
        let n = self.actions.iter().take_while(|a| a.tier == 0).count();
        &self.actions[..n]
    }

    pub fn ev_of(&self, action: &Action) -> Option<f64> {
        self.actions.iter().find(|a| &a.action == action).map(|a| a.ev)
    }
}

/// EV engine over any enumerator variant.
pub struct EvEngine<E: Enumerate = RoundEnumerator> {
    enumerator: E,
    cfg: EvConfig,
}

impl EvEngine<RoundEnumerator> {
    pub fn new() -> Self { Self::with_config(RoundEnumerator::new(), EvConfig::default()) }
}

impl Default for EvEngine<RoundEnumerator> {
    fn default() -> Self { Self::new() }
}

impl<E: Enumerate> EvEngine<E> {
    pub fn with_config(enumerator: E, cfg: EvConfig) -> Self { Self { enumerator, cfg } }

    pub fn config(&self) -> &EvConfig { &self.cfg }

    pub fn enumerator(&mut self) -> &mut E { &mut self.enumerator }

    /// Rank every legal action of `player` in `state` by expected coins.
    pub fn evaluate(&mut self, state: &GameState, player: PlayerId) -> Result<Evaluation, EngineError> {
        if player >= state.players.len() {
            return Err(IllegalAction::UnknownPlayer(player).into());
        }
        let legal = state.legal_actions_for(player);
        let outcome = self.enumerator.enumerate(state)?;
        let needs_overall = legal.iter().any(|a| matches!(a, Action::BetOverall { .. }));
        let (odds, overall_precision) = match (needs_overall, self.cfg.overall) {
            (false, _) => (None, OverallPrecision::NotNeeded),
            (true, OverallMode::RoundProxy) => (Some(FinalOdds::from_round(&outcome.distribution)), OverallPrecision::RoundProxy),
            (true, OverallMode::Rollout { games, seed }) => (Some(rollout(state, games, seed)?), OverallPrecision::Rollout { games }),
        };
        let mut scored = Vec::with_capacity(legal.len());
        for (declared, action) in legal.into_iter().enumerate() {
            let ev = self.action_ev(state, player, &action, &outcome, odds.as_ref())?;
            scored.push(ActionEv { action, ev, tier: 0, declared });
        }
        let actions = rank_tiers(scored, self.cfg.tie_epsilon);
        debug!(player, actions = actions.len(), best = ?actions.first().map(|a| (a.action, a.ev)), "evaluated");
        Ok(Evaluation { player, actions, outcome, overall_precision })
    }

    fn action_ev(
        &mut self,
        state: &GameState,
        player: PlayerId,
        action: &Action,
        outcome: &RoundOutcome,
        odds: Option<&FinalOdds>,
    ) -> Result<f64, EngineError> {
        let dist = &outcome.distribution;
        Ok(match *action {
            Action::TakeTicket(camel) => match state.tickets.top(camel) {
                Some(value) => ticket_ev(value, dist.p_first(camel), dist.p_second(camel), dist.p_rest(camel)),
                None => return Err(IllegalAction::TicketsExhausted(camel).into()),
            },
            Action::Draw => state.rules.draw_payout as f64,
            Action::PlaceTile { position, polarity } => {
                if outcome.expected_landings(position) == 0.0 {
                    0.0
                } else {
                    let mut board = state.board.clone();
                    board.place_tile(position, polarity, player)?;
                    let with_tile = self.enumerator.enumerate_board(&board, state.pool, &state.rules.dice)?;
                    with_tile.expected_tile_triggers(player) * state.rules.tile_payout as f64
                }
            }
            Action::BetOverall { camel, side } => {
                let odds = odds.ok_or_else(|| EngineError::invariant("overall odds missing"))?;
                let p = match side {
                    OverallSide::Winner => odds.first(camel),
                    OverallSide::Loser => odds.last(camel),
                };
                let pay = overall_payout(&state.rules.overall_payouts, state.overall.queue_position(side, camel));
                pay as f64 * p + state.rules.overall_wrong as f64 * (1.0 - p)
            }
        })
    }
}

/// Sort by EV descending and group near-equal EVs into tiers.
///
/// A tier starts at its best action and takes every following action within
/// `epsilon` of it; inside a tier the declaration order is restored.
pub fn rank_tiers(mut scored: Vec<ActionEv>, epsilon: f64) -> Vec<ActionEv> {
    scored.sort_by(|a, b| b.ev.total_cmp(&a.ev).then(a.declared.cmp(&b.declared)));
    let mut out = Vec::with_capacity(scored.len());
    let mut start = 0;
    let mut tier = 0;
    while start < scored.len() {
        let leader = scored[start].ev;
        let end = start + scored[start..].iter().take_while(|a| leader - a.ev <= epsilon).count();
        let mut group: Vec<ActionEv> = scored[start..end].iter().map(|a| ActionEv { tier, ..*a }).collect();
        group.sort_by_key(|a| a.declared);
        out.extend(group);
        tier += 1;
        start = end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Board, Camel, Die, EventPool, Polarity};
    use crate::enumerate::{DrawOrder, EnumeratorConfig};
    use crate::rules::RuleSet;

    fn ev(action: Action, ev: f64, declared: usize) -> ActionEv { ActionEv { action, ev, tier: 0, declared } }

    #[test]
    fn tiers_group_within_epsilon_and_keep_declaration_order() {
        let ranked = rank_tiers(
            vec![
                ev(Action::Draw, 1.0, 0),
                ev(Action::TakeTicket(Camel::Blue), 2.0, 1),
                ev(Action::TakeTicket(Camel::Red), 2.0 + 1e-12, 2),
                ev(Action::TakeTicket(Camel::Green), 1.0, 3),
            ],
            1e-9,
        );
        let order: Vec<(usize, usize)> = ranked.iter().map(|a| (a.declared, a.tier)).collect();
        assert_eq!(order, vec![(1, 0), (2, 0), (0, 1), (3, 1)]);
    }

    fn two_camel_state() -> GameState {
        let mut s = GameState::empty(2, RuleSet::default());
        s.board = Board::from_stacks(16, &[(3, &[Camel::Blue]), (8, &[Camel::Red])]);
        s.pool = EventPool::with_dice([Die::Racing(Camel::Blue), Die::Grey]);
        s
    }

    fn declared_engine() -> EvEngine {
        let cfg = EnumeratorConfig { order: DrawOrder::Declared, ..EnumeratorConfig::default() };
        EvEngine::with_config(RoundEnumerator::with_config(cfg), EvConfig::default())
    }

    #[test]
    fn ticket_and_draw_values() {
        let s = two_camel_state();
        let eval = declared_engine().evaluate(&s, 0).unwrap();
        // Blue cannot reach red this round: red is first for sure.
        let value = |a: Action| eval.ev_of(&a).unwrap();
        assert!((value(Action::TakeTicket(Camel::Red)) - 5.0).abs() < 1e-12);
        assert!((value(Action::TakeTicket(Camel::Blue)) - 1.0).abs() < 1e-12);
        assert_eq!(value(Action::Draw), 1.0);
        // The round proxy calls red the sure winner and blue the sure loser; both bets pay 8.
        let best: Vec<Action> = eval.top_tier().iter().map(|a| a.action).collect();
        assert_eq!(
            best,
            vec![
                Action::BetOverall { camel: Camel::Blue, side: OverallSide::Loser },
                Action::BetOverall { camel: Camel::Red, side: OverallSide::Winner },
            ]
        );
        assert_eq!(eval.overall_precision, OverallPrecision::RoundProxy);
    }

    #[test]
    fn tile_ev_reruns_with_hypothetical_tile() {
        let s = two_camel_state();
        let eval = declared_engine().evaluate(&s, 1).unwrap();
        let at = |position| eval.ev_of(&Action::PlaceTile { position, polarity: Polarity::Amplify }).unwrap();
        assert!((at(4) - 1.0 / 6.0).abs() < 1e-12);
        assert!((at(5) - 5.0 / 12.0).abs() < 1e-12);
        assert_eq!(at(12), 0.0);
    }

    #[test]
    fn overall_bets_pay_by_queue() {
        let mut s = two_camel_state();
        s.overall.place(crate::engine::OverallBet { player: 1, camel: Camel::Red, side: OverallSide::Winner });
        let eval = declared_engine().evaluate(&s, 0).unwrap();
        let winner = eval.ev_of(&Action::BetOverall { camel: Camel::Red, side: OverallSide::Winner }).unwrap();
        assert!((winner - 5.0).abs() < 1e-12);
        let loser = eval.ev_of(&Action::BetOverall { camel: Camel::Red, side: OverallSide::Loser }).unwrap();
        assert!((loser + 1.0).abs() < 1e-12);
    }

    #[test]
    fn drawable_grey_without_crazy_camels_is_rejected() {
        let err = EvEngine::new().evaluate(&two_camel_state(), 0).unwrap_err();
        assert!(matches!(err, EngineError::UnplayableBoard(_)), "{err}");
    }

    #[test]
    fn unknown_player_is_rejected() {
        let s = two_camel_state();
        let err = EvEngine::new().evaluate(&s, 7).unwrap_err();
        assert_eq!(err, EngineError::IllegalAction(IllegalAction::UnknownPlayer(7)));
    }
}
