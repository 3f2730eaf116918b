//! Grid Tactics - headless scenario runner
//!
//! Loads a scripted scenario, plays it against the rules engine, and reports
//! each command's result plus the final outcome.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use grid_tactics::core::error::Result;
use grid_tactics::scenario::{Scenario, StepResult};

/// Headless Grid Tactics runner
#[derive(Parser, Debug)]
#[command(name = "grid-tactics")]
#[command(about = "Play a scripted tactical combat scenario")]
struct Args {
    /// Scenario TOML file (match config plus [[commands]])
    #[arg(long, default_value = "data/scenarios/duel.toml")]
    scenario: PathBuf,

    /// Override the scenario's random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "text")]
    format: String,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("grid_tactics=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut scenario = Scenario::load(&args.scenario)?;
    if let Some(seed) = args.seed {
        scenario.config.seed = seed;
    }
    tracing::info!(
        "Running {} ({} commands, seed {})",
        args.scenario.display(),
        scenario.commands.len(),
        scenario.config.seed
    );

    let report = scenario.run()?;

    if args.format == "json" {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize report: {}", e),
        }
        return Ok(());
    }

    for (i, step) in report.steps.iter().enumerate() {
        let summary = match &step.result {
            StepResult::Moved(plan) => format!("unit {} moved {} -> {}", plan.unit, plan.from, plan.to),
            StepResult::Attacked(hit) => format!(
                "unit {} hit {} for {}{} ({} HP left{})",
                hit.attacker,
                hit.target,
                hit.damage,
                if hit.critical { " (critical)" } else { "" },
                hit.target_health,
                if hit.killed { ", killed" } else { "" }
            ),
            StepResult::TurnEnded { next } => format!("turn ended, {:?} to act", next),
            StepResult::MoveCompleted => "move completed".to_string(),
            StepResult::Rejected { reason } => format!("rejected: {}", reason),
        };
        println!("{:>3}. {:?}: {}", i + 1, step.command, summary);
    }

    println!();
    println!("Outcome after turn {}: {:?}", report.final_turn, report.winner);
    for (unit, health) in &report.survivors {
        println!("  {} alive with {} HP", unit, health);
    }
    tracing::info!(
        "{} events, {} rejected commands",
        report.events.len(),
        report.rejected()
    );

    Ok(())
}
