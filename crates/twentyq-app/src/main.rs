#![deny(warnings)]

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use twentyq_app::logging::init_logging;
use twentyq_app::{Console, Ending};
use twentyq_core::{Catalog, EngineConfig, Session, SessionSnapshot};

/// Guess the character you are thinking of by asking yes/no style questions.
#[derive(Debug, Parser)]
#[command(name = "twentyq", author, version, about = "Twenty questions in the terminal")]
struct Cli {
    /// Path to the catalog JSON file.
    #[arg(short, long, value_name = "FILE", default_value = "data/catalog.json")]
    catalog: PathBuf,

    /// Seed for the question tie-break RNG.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Print the leading posteriors after every turn.
    #[arg(long)]
    show_posterior: bool,

    /// Emit engine debug logs on stderr.
    #[arg(short, long)]
    verbose: bool,

    /// Resume from a snapshot written by --save-snapshot.
    #[arg(long, value_name = "FILE")]
    resume: Option<PathBuf>,

    /// Write the session snapshot here when the game ends.
    #[arg(long, value_name = "FILE")]
    save_snapshot: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let catalog = Catalog::from_path(&cli.catalog)
        .with_context(|| format!("loading catalog {}", cli.catalog.display()))?;
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut session = match cli.resume.as_ref() {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            let snapshot = SessionSnapshot::from_json(&json)?;
            let (session, _) = snapshot
                .replay(&catalog, rng)
                .with_context(|| format!("replaying snapshot {}", path.display()))?;
            session
        }
        None => Session::with_config(&catalog, EngineConfig::from_env(), rng),
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(stdin.lock(), stdout.lock()).show_posterior(cli.show_posterior);
    let ending = console.run(&mut session)?;
    drop(console);

    if let Some(path) = cli.save_snapshot.as_ref() {
        let json = SessionSnapshot::to_json(&session)?;
        fs::write(path, json).with_context(|| format!("writing snapshot {}", path.display()))?;
    }

    if let Ending::Quit | Ending::InputClosed = ending {
        tracing::info!(target: "twentyq::app", answered = session.history().len(), "game left unfinished");
    }
    Ok(())
}
