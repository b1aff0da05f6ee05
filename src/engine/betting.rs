use serde::{Deserialize, Serialize};

use crate::error::IllegalAction;

use super::camel::{Camel, CamelSet, RACING_CAMELS};
use super::track::Ranking;
use super::PlayerId;

/// A round ticket held by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    pub camel: Camel,
    pub value: u8,
}

impl Ticket {
    /// Face value if the camel leads, +1 if second, -1 otherwise.
    pub fn payout(self, ranking: &Ranking) -> i32 {
        match ranking.place_of(self.camel) {
            Some(0) => self.value as i32,
            Some(1) => 1,
            _ => -1,
        }
    }
}

/// Expected value of a ticket with face `value` given the camel's placing odds.
#[inline]
pub fn ticket_ev(value: u8, p_first: f64, p_second: f64, p_rest: f64) -> f64 {
    value as f64 * p_first + p_second - p_rest
}

/// Per-colour ticket stacks; index 0 of each stack is the top.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketStacks {
    stacks: [Vec<u8>; 5],
}

impl TicketStacks {
    pub fn new(values: &[u8]) -> Self { Self { stacks: std::array::from_fn(|_| values.to_vec()) } }

    #[inline]
    pub fn top(&self, camel: Camel) -> Option<u8> {
        if !camel.is_racing() {
            return None;
        }
        self.stacks[camel.index()].first().copied()
    }

    pub fn take(&mut self, camel: Camel) -> Result<Ticket, IllegalAction> {
        if !camel.is_racing() {
            return Err(IllegalAction::NotRacing(camel));
        }
        let stack = &mut self.stacks[camel.index()];
        if stack.is_empty() {
            return Err(IllegalAction::TicketsExhausted(camel));
        }
        Ok(Ticket { camel, value: stack.remove(0) })
    }

    pub fn reset(&mut self, values: &[u8]) { *self = Self::new(values); }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverallSide {
    Winner,
    Loser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverallBet {
    pub player: PlayerId,
    pub camel: Camel,
    pub side: OverallSide,
}

/// Pay table lookup for the `order`-th correct bet; the last entry repeats.
#[inline]
pub fn overall_payout(table: &[i32], order: usize) -> i32 {
    table.get(order).or(table.last()).copied().unwrap_or(0)
}

/// Winner and loser bets in placement order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverallBook {
    winner: Vec<OverallBet>,
    loser: Vec<OverallBet>,
}

impl OverallBook {
    pub fn new() -> Self { Self::default() }

    pub fn place(&mut self, bet: OverallBet) {
        match bet.side {
            OverallSide::Winner => self.winner.push(bet),
            OverallSide::Loser => self.loser.push(bet),
        }
    }

    pub fn bets(&self, side: OverallSide) -> &[OverallBet] {
        match side {
            OverallSide::Winner => &self.winner,
            OverallSide::Loser => &self.loser,
        }
    }

    /// Number of bets already on `camel` for `side`; a new bet would pay at this order.
    pub fn queue_position(&self, side: OverallSide, camel: Camel) -> usize {
        self.bets(side).iter().filter(|b| b.camel == camel).count()
    }

    /// Coins owed per bet at game end, in placement order (winners then losers).
    pub fn settle(&self, ranking: &Ranking, table: &[i32], wrong: i32) -> Vec<(PlayerId, i32)> {
        let mut out = Vec::with_capacity(self.winner.len() + self.loser.len());
        for (side, actual) in [(OverallSide::Winner, ranking.first()), (OverallSide::Loser, ranking.last())] {
            let mut correct = 0;
            for bet in self.bets(side) {
                if Some(bet.camel) == actual {
                    out.push((bet.player, overall_payout(table, correct)));
                    correct += 1;
                } else {
                    out.push((bet.player, wrong));
                }
            }
        }
        out
    }
}

/// Everything a player holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerState {
    pub coins: u32,
    pub tickets: Vec<Ticket>,
    /// Guaranteed-draw tokens earned this round.
    pub draw_tokens: u32,
    /// Racing colours whose overall card is still unused.
    pub cards: CamelSet,
}

impl PlayerState {
    pub fn new(coins: u32) -> Self {
        Self { coins, tickets: Vec::new(), draw_tokens: 0, cards: RACING_CAMELS.into_iter().collect() }
    }

    /// Round delta from tickets and draw tokens.
    pub fn round_delta(&self, ranking: &Ranking, draw_payout: i32) -> i32 {
        self.tickets.iter().map(|t| t.payout(ranking)).sum::<i32>() + self.draw_tokens as i32 * draw_payout
    }

    /// Apply a signed change; the balance never drops below zero.
    pub fn credit(&mut self, delta: i32) { self.coins = (self.coins as i64 + delta as i64).max(0) as u32; }

    pub fn use_card(&mut self, player: PlayerId, camel: Camel) -> Result<(), IllegalAction> {
        if !camel.is_racing() {
            return Err(IllegalAction::NotRacing(camel));
        }
        if !self.cards.contains(camel) {
            return Err(IllegalAction::CardConsumed { player, camel });
        }
        self.cards.remove(camel);
        Ok(())
    }

    pub fn reset_round(&mut self) {
        self.tickets.clear();
        self.draw_tokens = 0;
    }
}
