//! Same inputs, same bits: across worker counts, cache settings and repeated calls.

use camel_odds::engine::{Action, GameState};
use camel_odds::enumerate::{EnumeratorConfig, RoundEnumerator, RoundEnumeratorParallel, RoundOutcome};
use camel_odds::ev::{EvConfig, EvEngine};
use camel_odds::rules::RuleSet;
use rand::{rngs::StdRng, SeedableRng};
use rayon::ThreadPoolBuilder;

/// A first-round position with two dice already out.
fn position() -> GameState {
    let mut rng = StdRng::seed_from_u64(31);
    let mut state = GameState::new_game(3, RuleSet::default(), &mut rng).unwrap();
    state.apply(Action::Draw, &mut rng).unwrap();
    state.apply(Action::Draw, &mut rng).unwrap();
    state
}

fn assert_same(a: &RoundOutcome, b: &RoundOutcome) {
    assert_eq!(a.distribution.weights(), b.distribution.weights());
    assert_eq!(a.p_race_ends.to_bits(), b.p_race_ends.to_bits());
    assert_eq!(a.leaves, b.leaves);
    for position in 1..=16 {
        assert_eq!(a.expected_landings(position).to_bits(), b.expected_landings(position).to_bits());
    }
}

#[test]
fn parallel_matches_sequential_for_any_worker_count() {
    let state = position();
    let reference = RoundEnumerator::new().enumerate(&state).unwrap();
    for threads in [1, 2, 4] {
        let pool = ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        let out = pool.install(|| RoundEnumeratorParallel::new().enumerate(&state).unwrap());
        assert_same(&reference, &out);
    }
}

#[test]
fn cache_setting_does_not_change_results() {
    let state = position();
    let cached = RoundEnumerator::new().enumerate(&state).unwrap();
    let plain = RoundEnumerator::with_config(EnumeratorConfig { cache_enabled: false, ..EnumeratorConfig::default() })
        .enumerate(&state)
        .unwrap();
    assert_same(&cached, &plain);

    let mut par_plain = RoundEnumeratorParallel::with_config(EnumeratorConfig { cache_enabled: false, ..EnumeratorConfig::default() });
    assert_same(&cached, &par_plain.enumerate(&state).unwrap());
    assert_eq!(par_plain.cache_len(), 0);
}

#[test]
fn warm_cache_returns_the_same_bits() {
    let state = position();
    let mut en = RoundEnumerator::new();
    let cold = en.enumerate(&state).unwrap();
    let warm = en.enumerate(&state).unwrap();
    assert_same(&cold, &warm);
    en.clear_cache();
    assert_eq!(en.cache_len(), 0);
    assert_same(&cold, &en.enumerate(&state).unwrap());
}

#[test]
fn evaluation_does_not_touch_the_state() {
    let state = position();
    let snapshot = state.clone();
    let mut ev = EvEngine::with_config(RoundEnumerator::with_config(EnumeratorConfig::reduced()), EvConfig::default());
    let first = ev.evaluate(&state, state.current).unwrap();
    let second = ev.evaluate(&state, state.current).unwrap();
    assert_eq!(state, snapshot);
    let evs = |e: &camel_odds::ev::Evaluation| e.actions.iter().map(|a| (a.action, a.ev.to_bits(), a.tier)).collect::<Vec<_>>();
    assert_eq!(evs(&first), evs(&second));
}
