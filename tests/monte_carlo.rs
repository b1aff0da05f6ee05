//! Sampled rounds agree with the exact distribution.

use std::collections::HashMap;

use camel_odds::engine::{Board, Camel, Die, EventPool, Ranking};
use camel_odds::enumerate::RoundEnumerator;
use camel_odds::rules::RuleSet;
use rand::{rngs::StdRng, SeedableRng};

const SAMPLES: u32 = 20_000;

fn sample_round(board: &Board, pool: EventPool, rules: &RuleSet, rng: &mut StdRng) -> Ranking {
    let mut board = board.clone();
    let mut pool = pool;
    while !pool.is_round_complete() && !board.race_finished() {
        let die = pool.draw(rng).unwrap();
        let roll = rules.dice.roll(die, rng).unwrap();
        board.apply_roll(&roll).unwrap();
    }
    board.ranking()
}

#[test]
fn sampled_rankings_within_four_standard_errors() {
    let rules = RuleSet::default();
    let board = Board::from_stacks(
        16,
        &[
            (2, &[Camel::Blue, Camel::Green]),
            (3, &[Camel::Red]),
            (4, &[Camel::Yellow]),
            (11, &[Camel::Black]),
            (12, &[Camel::White]),
        ],
    );
    let pool = EventPool::with_dice([
        Die::Racing(Camel::Blue),
        Die::Racing(Camel::Green),
        Die::Racing(Camel::Red),
        Die::Racing(Camel::Yellow),
        Die::Grey,
    ]);
    let exact = RoundEnumerator::new().enumerate_board(&board, pool, &rules.dice).unwrap();

    let mut rng = StdRng::seed_from_u64(2024);
    let mut counts: HashMap<Ranking, u32> = HashMap::new();
    for _ in 0..SAMPLES {
        *counts.entry(sample_round(&board, pool, &rules, &mut rng)).or_default() += 1;
    }

    let n = SAMPLES as f64;
    for ranking in counts.keys() {
        assert!(exact.distribution.probability(ranking) > 0.0, "sampled {ranking} has zero exact weight");
    }
    for (ranking, p) in exact.distribution.iter() {
        let freq = counts.get(&ranking).copied().unwrap_or(0) as f64 / n;
        let se = (p * (1.0 - p) / n).sqrt();
        assert!((freq - p).abs() <= 4.0 * se + 1e-3, "{ranking}: exact {p:.5}, sampled {freq:.5}");
    }
}

#[test]
fn sampled_first_place_matches_per_camel() {
    let rules = RuleSet::default();
    let board = Board::from_stacks(16, &[(5, &[Camel::Purple]), (6, &[Camel::Red, Camel::Blue]), (8, &[Camel::Green])]);
    let pool = EventPool::with_dice([
        Die::Racing(Camel::Purple),
        Die::Racing(Camel::Red),
        Die::Racing(Camel::Blue),
        Die::Racing(Camel::Green),
    ]);
    let exact = RoundEnumerator::new().enumerate_board(&board, pool, &rules.dice).unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    let mut firsts: HashMap<Camel, u32> = HashMap::new();
    for _ in 0..SAMPLES {
        if let Some(first) = sample_round(&board, pool, &rules, &mut rng).first() {
            *firsts.entry(first).or_default() += 1;
        }
    }
    let n = SAMPLES as f64;
    for camel in [Camel::Purple, Camel::Red, Camel::Blue, Camel::Green] {
        let p = exact.distribution.p_first(camel);
        let freq = firsts.get(&camel).copied().unwrap_or(0) as f64 / n;
        let se = (p * (1.0 - p) / n).sqrt();
        assert!((freq - p).abs() <= 4.0 * se + 1e-3, "{camel:?}: exact {p:.5}, sampled {freq:.5}");
    }
}
