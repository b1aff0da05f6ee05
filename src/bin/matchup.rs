use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use camel_odds::engine::GameState;
use camel_odds::enumerate::{EnumeratorConfig, RoundEnumerator};
use camel_odds::ev::{EvConfig, EvEngine};
use camel_odds::rules::RuleSet;
use camel_odds::strategy::{play_game, GameRecord, Strategy, StrategyRegistry};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "matchup", about = "Seeded head-to-head games between camel race strategies")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,

    /// Log per-game results
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Play `games` games of strategy A against strategy B with alternating seats
    Matchup {
        #[arg(long, default_value = "greedy-fast")]
        a: String,
        #[arg(long, default_value = "random")]
        b: String,
        #[arg(long, default_value_t = 100)]
        games: u64,
        /// Seed of game 0; game g uses seed + g
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Suppress the progress bar
        #[arg(long)]
        quiet: bool,
    },
    /// Print the ranked EV table for a seeded opening position
    Evaluate {
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 4)]
        players: usize,
        /// Skip the grey die when enumerating
        #[arg(long)]
        reduced: bool,
    },
    /// List the registered strategy names
    List,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();
    let registry = StrategyRegistry::standard();

    match args.cmd {
        Cmd::Matchup { a, b, games, seed, quiet } => {
            let sa = lookup(&registry, &a)?;
            let sb = lookup(&registry, &b)?;
            let tally = run_matchup(sa, sb, games, seed, quiet)?;
            println!("{a} vs {b} over {games} games (seeds {seed}..{})", seed + games);
            println!("  {a:<14} wins: {:>5}  mean coins: {:.2}", tally.wins[0], tally.mean_coins(0));
            println!("  {b:<14} wins: {:>5}  mean coins: {:.2}", tally.wins[1], tally.mean_coins(1));
            println!("  ties: {}", tally.ties);
        }
        Cmd::Evaluate { seed, players, reduced } => {
            if players < 2 {
                anyhow::bail!("need at least two players, got {players}");
            }
            let mut rng = StdRng::seed_from_u64(seed);
            let state = GameState::new_game(players, RuleSet::default(), &mut rng)?;
            let cfg = if reduced { EnumeratorConfig::reduced() } else { EnumeratorConfig::default() };
            let eval = EvEngine::with_config(RoundEnumerator::with_config(cfg), EvConfig::default()).evaluate(&state, state.current)?;
            println!("{}", state.board);
            for a in &eval.actions {
                println!("  [{}] {:>8.4}  {}", a.tier, a.ev, a.action);
            }
        }
        Cmd::List => {
            for name in registry.names() {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn lookup(registry: &StrategyRegistry, name: &str) -> anyhow::Result<Strategy> {
    registry.get(name).cloned().with_context(|| {
        let known: Vec<&str> = registry.names().collect();
        format!("unknown strategy {name:?}; known: {}", known.join(", "))
    })
}

/// Results from the point of view of the two strategies, not the seats.
#[derive(Debug, Default)]
struct Tally {
    wins: [u64; 2],
    ties: u64,
    coins: [u64; 2],
    games: u64,
}

impl Tally {
    fn add(&mut self, record: &GameRecord, a_seat: usize) {
        let seat_of = [a_seat, 1 - a_seat];
        for (side, &seat) in seat_of.iter().enumerate() {
            self.coins[side] += record.scores[seat] as u64;
        }
        match record.winners.as_slice() {
            [w] => self.wins[if *w == a_seat { 0 } else { 1 }] += 1,
            _ => self.ties += 1,
        }
        self.games += 1;
    }

    fn mean_coins(&self, side: usize) -> f64 { self.coins[side] as f64 / self.games.max(1) as f64 }
}

fn run_matchup(a: Strategy, b: Strategy, games: u64, seed: u64, quiet: bool) -> anyhow::Result<Tally> {
    let start = Instant::now();
    let done = AtomicU64::new(0);
    let pb = if !quiet {
        let pb = ProgressBar::new(games);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:30}] {pos}/{len} games | {msg}")?
                .tick_chars("⠁⠃⠇⠧⠷⠿⠻⠟⠯⠷⠧⠇⠃"),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    // Strategy A sits first in even games and second in odd ones.
    let records: Vec<(GameRecord, usize)> = (0..games)
        .into_par_iter()
        .map(|g| -> anyhow::Result<(GameRecord, usize)> {
            let a_seat = (g % 2) as usize;
            let seats = if a_seat == 0 { [a.clone(), b.clone()] } else { [b.clone(), a.clone()] };
            let record = play_game(&seats, RuleSet::default(), seed + g)?;
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(pb) = &pb {
                pb.set_position(n);
                pb.set_message(format!("{:.2} games/sec", n as f64 / start.elapsed().as_secs_f64().max(1e-6)));
            }
            Ok((record, a_seat))
        })
        .collect::<anyhow::Result<_>>()?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let mut tally = Tally::default();
    for (record, a_seat) in &records {
        tally.add(record, *a_seat);
    }
    Ok(tally)
}
