use std::fmt;

use crate::engine::{Board, Camel, PlayerId, Position, Ranking};
use crate::error::EngineError;

use super::summary::{Layout, RankingCodec, Summary};
use super::EnumStats;

/// Tolerance on total probability mass.
pub const MASS_TOLERANCE: f64 = 1e-9;

/// Probability of every full ranking of the racing camels at round end.
///
/// Stored densely, one weight per permutation of the racers on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingDistribution {
    codec: RankingCodec,
    weights: Vec<f64>,
}

impl RankingDistribution {
    pub(crate) fn new(codec: RankingCodec, weights: Vec<f64>) -> Self { Self { codec, weights } }

    /// Weights in permutation-code order, zeros included.
    pub fn weights(&self) -> &[f64] { &self.weights }

    pub fn racers(&self) -> &[Camel] { self.codec.racers() }

    /// Rankings with non-zero weight.
    pub fn iter(&self) -> impl Iterator<Item = (Ranking, f64)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w > 0.0)
            .filter_map(|(code, &w)| Ranking::try_new(self.codec.decode(code)).ok().map(|r| (r, w)))
    }

    pub fn support_len(&self) -> usize { self.weights.iter().filter(|&&w| w > 0.0).count() }

    pub fn total_mass(&self) -> f64 { self.weights.iter().sum() }

    pub fn probability(&self, ranking: &Ranking) -> f64 {
        self.codec.encode(ranking.as_slice()).map_or(0.0, |code| self.weights[code])
    }

    /// P(`camel` finishes the round at 0-based `place`).
    pub fn place_probability(&self, camel: Camel, place: usize) -> f64 {
        self.iter().filter(|(r, _)| r.place_of(camel) == Some(place)).map(|(_, w)| w).sum()
    }

    pub fn p_first(&self, camel: Camel) -> f64 { self.place_probability(camel, 0) }

    pub fn p_second(&self, camel: Camel) -> f64 { self.place_probability(camel, 1) }

    /// P(third or worse).
    pub fn p_rest(&self, camel: Camel) -> f64 {
        self.iter().filter(|(r, _)| r.place_of(camel).is_some_and(|p| p >= 2)).map(|(_, w)| w).sum()
    }

    pub fn p_last(&self, camel: Camel) -> f64 {
        self.iter().filter(|(r, _)| r.last() == Some(camel)).map(|(_, w)| w).sum()
    }

    pub fn most_likely(&self) -> Option<(Ranking, f64)> {
        self.iter().fold(None, |best: Option<(Ranking, f64)>, (r, w)| match best {
            Some((_, bw)) if bw >= w => best,
            _ => Some((r, w)),
        })
    }

    pub fn is_deterministic(&self) -> bool { self.support_len() == 1 }

    /// Mass sums to one and every weight is a finite non-negative number.
    pub fn check(&self) -> Result<(), EngineError> {
        if let Some(w) = self.weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(EngineError::invariant(format!("ranking weight {w} is not a probability")));
        }
        let mass = self.total_mass();
        if (mass - 1.0).abs() > MASS_TOLERANCE {
            return Err(EngineError::invariant(format!("ranking mass {mass} does not sum to 1")));
        }
        Ok(())
    }
}

impl fmt::Display for RankingDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows: Vec<(Ranking, f64)> = self.iter().collect();
        rows.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (ranking, w) in rows {
            writeln!(f, "{w:>8.5}  {ranking}")?;
        }
        Ok(())
    }
}

/// Everything the enumerator learns about the rest of the round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    pub distribution: RankingDistribution,
    span: usize,
    positions: Vec<f64>,
    landings: Vec<f64>,
    /// Expected tile triggers per tile owner, in tile position order.
    pub tile_triggers: Vec<(PlayerId, f64)>,
    /// Probability that a racing camel crosses the finish this round.
    pub p_race_ends: f64,
    /// Leaves of the unmerged branch tree.
    pub leaves: u64,
    pub stats: EnumStats,
}

impl RoundOutcome {
    pub(crate) fn from_root(root: &Summary, layout: &Layout, board: &Board, stats: EnumStats) -> Result<Self, EngineError> {
        let distribution = RankingDistribution::new(layout.codec.clone(), root.rankings.clone());
        distribution.check()?;
        let tile_triggers = board.tiles.iter().map(|t| (t.owner, root.landings[layout.slot(t.position)])).collect();
        Ok(Self {
            distribution,
            span: layout.span,
            positions: root.positions.clone(),
            landings: root.landings.clone(),
            tile_triggers,
            p_race_ends: root.race_ends,
            leaves: root.leaves,
            stats,
        })
    }

    /// Final-space distribution of `camel`, finish area folded into its last slot.
    pub fn position_distribution(&self, camel: Camel) -> Vec<(Position, f64)> {
        let row = &self.positions[camel.index() * self.span..(camel.index() + 1) * self.span];
        row.iter().enumerate().filter(|&(_, &p)| p > 0.0).map(|(pos, &p)| (pos as Position, p)).collect()
    }

    pub fn expected_position(&self, camel: Camel) -> f64 {
        self.position_distribution(camel).iter().map(|&(pos, p)| pos as f64 * p).sum()
    }

    /// Expected number of groups whose move targets `position` before tile effects.
    pub fn expected_landings(&self, position: Position) -> f64 {
        self.landings.get(position as usize).copied().unwrap_or(0.0)
    }

    pub fn expected_tile_triggers(&self, player: PlayerId) -> f64 {
        self.tile_triggers.iter().filter(|(owner, _)| *owner == player).map(|(_, n)| n).sum()
    }
}
