use std::path::PathBuf;

use anyhow::Context;
use camel_odds::engine::GameState;
use camel_odds::enumerate::{EnumeratorConfig, RoundEnumerator, RoundEnumeratorParallel};
use camel_odds::ev::{EvConfig, EvEngine, Evaluation, OverallMode};
use camel_odds::rules::RuleSet;
use camel_odds::serialization;
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "camel-odds", about = "Rank the legal actions of a camel race position by expected coins")]
struct Args {
    /// Seed for the opening position
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of players
    #[arg(long, default_value_t = 4)]
    players: usize,

    /// Load the position from a postcard snapshot instead of dealing a new game
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write the evaluated position to this path
    #[arg(long)]
    save: Option<PathBuf>,

    /// Skip the grey die when enumerating
    #[arg(long)]
    reduced: bool,

    /// Use the rayon enumerator
    #[arg(long)]
    parallel: bool,

    /// Project overall bets with this many sampled games instead of the round proxy
    #[arg(long)]
    rollout: Option<u32>,

    /// Log enumeration details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let state = match &args.load {
        Some(path) => serialization::read_postcard_from_path(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            if args.players < 2 {
                anyhow::bail!("need at least two players, got {}", args.players);
            }
            let mut rng = StdRng::seed_from_u64(args.seed);
            GameState::new_game(args.players, RuleSet::default(), &mut rng)?
        }
    };
    println!("{}", state.board);

    let enum_cfg = if args.reduced { EnumeratorConfig::reduced() } else { EnumeratorConfig::default() };
    let ev_cfg = EvConfig {
        overall: match args.rollout {
            Some(games) => OverallMode::Rollout { games, seed: args.seed },
            None => OverallMode::RoundProxy,
        },
        ..EvConfig::default()
    };
    let eval = if args.parallel {
        EvEngine::with_config(RoundEnumeratorParallel::with_config(enum_cfg), ev_cfg).evaluate(&state, state.current)?
    } else {
        EvEngine::with_config(RoundEnumerator::with_config(enum_cfg), ev_cfg).evaluate(&state, state.current)?
    };
    print_evaluation(&eval);

    if let Some(path) = &args.save {
        serialization::write_postcard_to_path(path, &state).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn print_evaluation(eval: &Evaluation) {
    let stats = eval.outcome.stats;
    println!(
        "Player {} | leaves: {} | nodes: {} | cache hits: {} | {:.1?}",
        eval.player, eval.outcome.leaves, stats.nodes, stats.cache_hits, stats.elapsed
    );
    println!("{}", eval.outcome.distribution);
    for &camel in eval.outcome.distribution.racers() {
        println!("  {:<7} expected space {:.2}", camel.name(), eval.outcome.expected_position(camel));
    }
    println!("P(race ends this round): {:.4}", eval.outcome.p_race_ends);
    println!("Overall odds: {:?}", eval.overall_precision);
    for a in &eval.actions {
        println!("  [{}] {:>8.4}  {}", a.tier, a.ev, a.action);
    }
    let best: Vec<String> = eval.top_tier().iter().map(|a| a.action.to_string()).collect();
    println!("Best: {}", best.join(" | "));
}
