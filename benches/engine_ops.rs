use camel_odds::engine::{Action, Camel, GameState};
use camel_odds::enumerate::{EnumeratorConfig, RoundEnumerator};
use camel_odds::ev::{EvConfig, EvEngine};
use camel_odds::rules::RuleSet;
use camel_odds::strategy::{play_game, Strategy};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};
use std::hint::black_box;

fn opening() -> GameState {
    let mut rng = StdRng::seed_from_u64(1337);
    GameState::new_game(4, RuleSet::default(), &mut rng).unwrap()
}

fn bench_live_play(c: &mut Criterion) {
    let state = opening();
    c.bench_function("engine/legal_actions", |bch| bch.iter(|| black_box(state.legal_actions().len())));
    c.bench_function("engine/draw", |bch| {
        let mut rng = StdRng::seed_from_u64(9);
        bch.iter(|| {
            let mut s = state.clone();
            black_box(s.apply(Action::Draw, &mut rng).unwrap().roll)
        })
    });
    c.bench_function("engine/ranking", |bch| bch.iter(|| black_box(state.board.ranking().first() == Some(Camel::Blue))));
    c.bench_function("engine/random_game", |bch| {
        let seats = [Strategy::Random, Strategy::Random, Strategy::Random, Strategy::Random];
        let mut seed = 0;
        bch.iter(|| {
            seed += 1;
            black_box(play_game(&seats, RuleSet::default(), seed).unwrap().turns)
        })
    });
}

fn bench_ev(c: &mut Criterion) {
    let state = opening();
    c.bench_function("ev/evaluate_reduced", |bch| {
        bch.iter(|| {
            let mut ev = EvEngine::with_config(RoundEnumerator::with_config(EnumeratorConfig::reduced()), EvConfig::default());
            black_box(ev.evaluate(&state, state.current).unwrap().actions.len())
        })
    });
}

criterion_group!(engine_ops, bench_live_play, bench_ev);
criterion_main!(engine_ops);
