//! Skirmish Lab - Entry Point
//!
//! Loads a resolved scenario file and lets the user evolve and inspect the
//! strategies of each group from a small command loop.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;

use skirmish_lab::core::error::Result;
use skirmish_lab::core::types::Turn;
use skirmish_lab::encounter::{MatchAction, MatchCharacter, MatchObserver, MatchSummary};
use skirmish_lab::rules::load_scenario;
use skirmish_lab::strategy::{Strategy, StrategyManager};

/// Evolve group strategies for a scenario
#[derive(Parser, Debug)]
#[command(name = "skirmish_lab")]
#[command(about = "Simulate tactical matches and evolve the strategies that play them")]
struct Args {
    /// Resolved scenario JSON file
    scenario: PathBuf,

    /// Optimizer seed, overriding the scenario's strategy block
    #[arg(long)]
    seed: Option<u64>,

    /// Game to play when the scenario defines several
    #[arg(long)]
    game: Option<String>,
}

/// Prints a match as it is played
struct PrintObserver;

impl MatchObserver for PrintObserver {
    fn on_character(&mut self, character: &MatchCharacter, turn: Turn) {
        println!("\n--- Turn {}: {} ---", turn, character);
    }

    fn on_action(
        &mut self,
        _actor: &MatchCharacter,
        strategy: &Strategy,
        candidates: &[MatchAction],
        chosen: &MatchAction,
    ) {
        println!("Strategy: {} ({} nodes)", strategy.name, strategy.nodes.len());
        println!("Possible actions:");
        for action in candidates {
            println!("  {}", action);
        }
        println!("Action chosen: {}", chosen);
    }

    fn on_finish(&mut self, summary: &MatchSummary) {
        println!(
            "\nMatch over on turn {} after {} actions",
            summary.turn, summary.actions_taken
        );
        println!("Still in play: {}", summary.in_play.join(", "));
        for (group, fitness) in &summary.fitness {
            println!("  {}: {}", group, fitness);
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skirmish_lab=info".into()),
        )
        .init();

    let mut scenario = load_scenario(&args.scenario)?;
    if args.game.is_some() {
        scenario.game = args.game;
    }
    if args.seed.is_some() {
        scenario.strategy.seed = args.seed;
    }
    scenario.validate()?;

    let mut manager = StrategyManager::from_scenario(&scenario)?;

    println!("\n=== SKIRMISH LAB ===");
    println!("Game: {}", manager.game());
    println!();
    println!("Commands:");
    println!("  <enter>         - Optimize every group");
    println!("  <group>         - Optimize one group");
    println!("  info / i        - Show the live strategies");
    println!("  step / s        - Play one match with the live strategies");
    println!("  quit / q        - Exit");
    println!("Groups: {}", manager.strategies().names().join(", "));

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }

        match input.trim() {
            "q" | "quit" => break,
            "i" | "info" => {
                for strategy in manager.strategies().iter() {
                    println!("\n{}", strategy);
                }
            }
            "s" | "step" => {
                manager.step(&mut PrintObserver)?;
            }
            "" => {
                for group in manager.strategies().names() {
                    let report = manager.optimize(&group)?;
                    println!("{}", report);
                }
            }
            group => match manager.optimize(group) {
                Ok(report) => println!("{}", report),
                Err(e) => println!("Error: {}", e),
            },
        }
    }

    Ok(())
}
