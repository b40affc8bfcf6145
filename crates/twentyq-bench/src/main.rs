use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use twentyq_bench::config::{BenchmarkConfig, RunOverrides};
use twentyq_bench::logging::init_logging;
use twentyq_bench::simulation::{GameRunner, RunSummary};

/// Plays every catalog character against simulated answerers and reports how the engine did.
#[derive(Debug, Parser)]
#[command(name = "twentyq-bench", version)]
struct Cli {
    /// YAML run description.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    #[command(flatten)]
    overrides: RunOverrides,

    /// Load the catalog and answerers, then stop before playing.
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;
    config
        .apply_overrides(cli.overrides)
        .with_context(|| format!("applying command-line overrides to {}", cli.config.display()))?;

    let outputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let _trace = init_logging(&config.logging, &outputs)?;
    let runner = GameRunner::new(config, outputs)
        .with_context(|| format!("preparing run '{run_id}'"))?;

    if cli.validate_only {
        println!(
            "'{run_id}' is valid: {} characters in {}",
            runner.catalog().len(),
            cli.config.display()
        );
        return Ok(());
    }

    let summary = runner.run().with_context(|| format!("running '{run_id}'"))?;
    report(&run_id, &summary);
    Ok(())
}

fn report(run_id: &str, summary: &RunSummary) {
    println!(
        "{run_id}: {} games ({} rounds over {} characters)",
        summary.rows_written, summary.rounds, summary.characters
    );
    println!("  games:   {}", summary.jsonl_path.display());
    println!("  summary: {}", summary.summary_path.display());
    if let Some(path) = &summary.plot_path {
        println!("  plot:    {}", path.display());
    }
    if let Some(path) = &summary.telemetry_path {
        println!("  trace:   {}", path.display());
    }
    if let Some(outputs) = &summary.telemetry_outputs {
        let turns = &outputs.summary.turns;
        let games = &outputs.summary.games;
        print!("  traced {} turns and {} games", turns.count, games.count);
        if let Some(active) = turns.avg_active {
            print!(", {active:.2} candidates active on average");
        }
        println!();
    }
}
