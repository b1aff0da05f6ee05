//! Worked scenarios from the game rules.

use camel_odds::engine::{ticket_ev, Action, Board, Camel, Die, EventMode, EventPool, GameState, Polarity, Roll};
use camel_odds::enumerate::{EnumeratorConfig, RoundEnumerator};
use camel_odds::rules::RuleSet;
use rand::{rngs::StdRng, SeedableRng};

#[test]
fn single_mover_spreads_over_three_spaces() {
    let board = Board::from_stacks(16, &[(10, &[Camel::Blue])]);
    // Grey is never branched on but still counts, so the blue die resolves.
    let pool = EventPool::with_dice([Die::Racing(Camel::Blue), Die::Grey]);
    let cfg = EnumeratorConfig { mode: EventMode::RacingOnly, ..EnumeratorConfig::default() };
    let out = RoundEnumerator::with_config(cfg).enumerate_board(&board, pool, &RuleSet::default().dice).unwrap();
    let dist = out.position_distribution(Camel::Blue);
    let expected = [(11, 1.0 / 6.0), (12, 5.0 / 12.0), (13, 5.0 / 12.0)];
    assert_eq!(dist.len(), expected.len());
    for ((pos, p), (epos, ep)) in dist.into_iter().zip(expected) {
        assert_eq!(pos, epos);
        assert!((p - ep).abs() < 1e-12, "P(blue at {pos}) = {p}");
    }
}

#[test]
fn amplify_tile_pushes_one_further_and_pays_its_owner() {
    // Red carries blue, or blue goes alone: either way the mover lands on 5.
    let rules = RuleSet::default().with_movement_faces([2]);
    let mut state = GameState::empty(2, rules);
    state.board = Board::from_stacks(16, &[(3, &[Camel::Red, Camel::Blue]), (10, &[Camel::Green])]);
    state.pool = EventPool::with_dice([Die::Racing(Camel::Red), Die::Racing(Camel::Blue)]);
    state.current = 1;
    let mut rng = StdRng::seed_from_u64(4);
    state.apply(Action::PlaceTile { position: 5, polarity: Polarity::Amplify }, &mut rng).unwrap();
    assert_eq!(state.current, 0);

    let before = state.players[1].coins;
    let report = state.apply(Action::Draw, &mut rng).unwrap();
    let movement = report.movement.unwrap();
    assert_eq!(movement.target, 5);
    assert_eq!(movement.to, 6);
    assert_eq!(movement.tile.map(|t| t.owner), Some(1));
    assert_eq!(state.players[1].coins, before + 1);
    // The draw left one die, so the round settled and cleared the tile.
    assert!(report.round_deltas.is_some());
    assert!(state.board.tiles.is_empty());
}

#[test]
fn amplify_lands_on_top_and_dampen_goes_under() {
    let mut board = Board::from_stacks(16, &[(3, &[Camel::Blue]), (6, &[Camel::Red]), (4, &[Camel::Green])]);
    board.place_tile(5, Polarity::Amplify, 0).unwrap();
    let report = board.apply_roll(&Roll { die: Die::Racing(Camel::Blue), shown: Camel::Blue, steps: 2 }).unwrap();
    assert_eq!(report.to, 6);
    assert_eq!(board.track.stack(6), &[Camel::Red, Camel::Blue]);

    let mut board = Board::from_stacks(16, &[(3, &[Camel::Blue]), (6, &[Camel::Red]), (4, &[Camel::Green])]);
    board.place_tile(7, Polarity::Dampen, 1).unwrap();
    let report = board.apply_roll(&Roll { die: Die::Racing(Camel::Green), shown: Camel::Green, steps: 3 }).unwrap();
    assert_eq!(report.to, 6);
    assert_eq!(board.track.stack(6), &[Camel::Green, Camel::Red]);
}

#[test]
fn ticket_ev_worked_example() {
    assert!((ticket_ev(5, 0.4, 0.3, 0.3) - 2.0).abs() < 1e-12);
}

#[test]
fn round_complete_is_a_single_certain_ranking() {
    let board = Board::from_stacks(16, &[(2, &[Camel::Blue, Camel::Yellow]), (7, &[Camel::Red])]);
    let pool = EventPool::with_dice([Die::Grey]);
    let mut en = RoundEnumerator::new();
    let out = en.enumerate_board(&board, pool, &RuleSet::default().dice).unwrap();
    assert!(out.distribution.is_deterministic());
    let (ranking, p) = out.distribution.most_likely().unwrap();
    assert_eq!(ranking.as_slice(), &[Camel::Red, Camel::Yellow, Camel::Blue]);
    assert_eq!(p, 1.0);
    assert_eq!(out.p_race_ends, 0.0);
}
