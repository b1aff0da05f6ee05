use crate::engine::{Board, Camel, Position, CAMEL_COUNT};
use crate::error::EngineError;

/// Dense index for full rankings of a fixed racer set (Lehmer code).
///
/// Racers are kept in declaration order; index `i` of a ranking digit is the
/// place of the next camel among those not yet ranked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RankingCodec {
    racers: Vec<Camel>,
    size: usize,
}

impl RankingCodec {
    pub(crate) fn new(mut racers: Vec<Camel>) -> Self {
        racers.sort();
        racers.dedup();
        let size = (1..=racers.len()).product::<usize>().max(1);
        Self { racers, size }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize { self.size }

    pub(crate) fn racers(&self) -> &[Camel] { &self.racers }

    pub(crate) fn encode(&self, order: &[Camel]) -> Result<usize, EngineError> {
        let n = self.racers.len();
        if order.len() != n {
            return Err(EngineError::invariant(format!("ranking has {} camels, expected {n}", order.len())));
        }
        let mut remaining = self.racers.clone();
        let mut code = 0usize;
        for (i, camel) in order.iter().enumerate() {
            let digit = remaining
                .iter()
                .position(|c| c == camel)
                .ok_or_else(|| EngineError::invariant(format!("{camel} duplicated or unknown in ranking")))?;
            remaining.remove(digit);
            code = code * (n - i) + digit;
        }
        Ok(code)
    }

    pub(crate) fn decode(&self, mut code: usize) -> Vec<Camel> {
        let n = self.racers.len();
        let mut digits = vec![0usize; n];
        for i in (0..n).rev() {
            let radix = n - i;
            digits[i] = code % radix;
            code /= radix;
        }
        let mut remaining = self.racers.clone();
        digits.into_iter().map(|d| remaining.remove(d)).collect()
    }
}

/// Vector shapes shared by every summary of one enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) codec: RankingCodec,
    /// Number of tracked positions, finish area included.
    pub(crate) span: usize,
}

impl Layout {
    pub(crate) fn for_board(board: &Board) -> Self {
        let racers = board.track.racers().iter().collect();
        Self { codec: RankingCodec::new(racers), span: board.track.length() as usize + 5 }
    }

    #[inline]
    pub(crate) fn slot(&self, position: Position) -> usize { (position as usize).min(self.span - 1) }
}

/// Conditional outcome of the rest of the round from one node.
///
/// Every field is linear in probability, so a parent is the probability-weighted
/// sum of its children plus the landings of the edges leading to them.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Summary {
    pub(crate) rankings: Vec<f64>,
    /// `CAMEL_COUNT * span`, row per camel.
    pub(crate) positions: Vec<f64>,
    /// Expected landings per pre-modifier target space.
    pub(crate) landings: Vec<f64>,
    pub(crate) race_ends: f64,
    pub(crate) leaves: u64,
}

impl Summary {
    pub(crate) fn zeros(layout: &Layout) -> Self {
        Self {
            rankings: vec![0.0; layout.codec.size()],
            positions: vec![0.0; CAMEL_COUNT * layout.span],
            landings: vec![0.0; layout.span],
            race_ends: 0.0,
            leaves: 0,
        }
    }

    /// Point mass on the board as it stands.
    pub(crate) fn leaf(board: &Board, layout: &Layout) -> Result<Self, EngineError> {
        let mut s = Self::zeros(layout);
        let ranking = board.ranking();
        let code = layout.codec.encode(ranking.as_slice())?;
        s.rankings[code] = 1.0;
        for camel in board.track.placed().iter() {
            if let Some(pos) = board.track.position(camel) {
                s.positions[camel.index() * layout.span + layout.slot(pos)] = 1.0;
            }
        }
        s.race_ends = if board.race_finished() { 1.0 } else { 0.0 };
        s.leaves = 1;
        Ok(s)
    }

    /// `self += p * child`, plus one landing of weight `p` at `target`.
    pub(crate) fn absorb(&mut self, p: f64, target: usize, child: &Summary) {
        for (a, b) in self.rankings.iter_mut().zip(&child.rankings) {
            *a += p * b;
        }
        for (a, b) in self.positions.iter_mut().zip(&child.positions) {
            *a += p * b;
        }
        for (a, b) in self.landings.iter_mut().zip(&child.landings) {
            *a += p * b;
        }
        self.landings[target] += p;
        self.race_ends += p * child.race_ends;
        self.leaves += child.leaves;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RACING_CAMELS;

    #[test]
    fn codec_is_a_bijection() {
        let codec = RankingCodec::new(RACING_CAMELS.to_vec());
        assert_eq!(codec.size(), 120);
        let mut seen = vec![false; 120];
        for code in 0..120 {
            let order = codec.decode(code);
            assert_eq!(codec.encode(&order).unwrap(), code);
            seen[code] = true;
        }
        assert!(seen.into_iter().all(|s| s));
        assert_eq!(codec.decode(0), RACING_CAMELS.to_vec());
    }

    #[test]
    fn codec_rejects_duplicates_and_gaps() {
        let codec = RankingCodec::new(vec![Camel::Red, Camel::Blue, Camel::Green]);
        assert!(codec.encode(&[Camel::Red, Camel::Red, Camel::Blue]).is_err());
        assert!(codec.encode(&[Camel::Red, Camel::Blue]).is_err());
        assert!(codec.encode(&[Camel::Red, Camel::Blue, Camel::Purple]).is_err());
    }

    #[test]
    fn leaf_is_point_mass() {
        let board = Board::from_stacks(16, &[(3, &[Camel::Blue, Camel::White]), (5, &[Camel::Red])]);
        let layout = Layout::for_board(&board);
        let leaf = Summary::leaf(&board, &layout).unwrap();
        assert_eq!(leaf.rankings.iter().sum::<f64>(), 1.0);
        let code = layout.codec.encode(&[Camel::Red, Camel::Blue]).unwrap();
        assert_eq!(leaf.rankings[code], 1.0);
        assert_eq!(leaf.positions[Camel::White.index() * layout.span + 3], 1.0);
        assert_eq!(leaf.leaves, 1);
    }
}
