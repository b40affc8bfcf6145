mod answerer;

pub use answerer::{Answerer, AnswererError, ExactAnswerer, HesitantAnswerer, NoisyAnswerer};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};
use twentyq_core::{Candidate, Catalog, CatalogError, Outcome, Session, SessionError};

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{BenchmarkConfig, ResolvedOutputs};
use crate::logging::TELEMETRY_FILE;
use crate::telemetry::{
    TelemetryError, TelemetryOutputs, append_highlights_to_markdown, write_summary_outputs,
};
use answerer::AnswererBlueprint;

/// Salt separating the answer stream from the question tie-break stream of a game.
const ANSWER_STREAM_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Plays every catalog character against every configured answerer.
pub struct GameRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    catalog: Catalog,
    answerers: Vec<AnswererBlueprint>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub rounds: usize,
    pub characters: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub plot_path: Option<PathBuf>,
    pub telemetry_path: Option<PathBuf>,
    pub telemetry_outputs: Option<TelemetryOutputs>,
}

impl GameRunner {
    /// Build a runner from a validated configuration; loads the catalog.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let answerers = AnswererBlueprint::from_configs(&config.answerers)?;
        let catalog = Catalog::from_path(&config.catalog)?;
        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            catalog,
            answerers,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Execute every game, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;
        if !self.outputs.plots_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.outputs.plots_dir)?;
        }

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut analytics = AnalyticsCollector::new(&self.config);
        let mut rows_written = 0usize;

        for round in 0..self.config.games.rounds {
            for (target_index, target) in self.catalog.candidates().iter().enumerate() {
                // Every answerer faces the same tie-break stream for a given character.
                let game_seed = rng.next_u64();
                for blueprint in &self.answerers {
                    let outcome = self.play_game(target, blueprint, game_seed)?;
                    analytics.record_game(&outcome)?;
                    write_game_row(
                        &mut writer,
                        &self.config.run_id,
                        round,
                        target_index,
                        game_seed,
                        &outcome,
                    )?;
                    rows_written += 1;
                }
            }
        }
        writer.flush()?;

        let summary = analytics.finalize();
        summary.write_markdown(&self.outputs.summary_md)?;
        let plot_path = match summary.render_plot(&self.outputs.plots_dir) {
            Ok(path) => Some(path),
            Err(err) => {
                eprintln!("WARN: {err}");
                None
            }
        };

        let report_dir = self.outputs.report_dir();
        let telemetry_path = self
            .logging_enabled
            .then(|| report_dir.join(TELEMETRY_FILE));
        let telemetry_outputs = match telemetry_path.as_ref() {
            Some(path) => write_summary_outputs(path, &report_dir)?,
            None => None,
        };
        if let Some(outputs) = telemetry_outputs.as_ref() {
            append_highlights_to_markdown(&self.outputs.summary_md, outputs)?;
        }

        Ok(RunSummary {
            rounds: self.config.games.rounds,
            characters: self.catalog.len(),
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            plot_path,
            telemetry_path,
            telemetry_outputs,
        })
    }

    fn play_game(
        &self,
        target: &Candidate,
        blueprint: &AnswererBlueprint,
        game_seed: u64,
    ) -> Result<GameOutcome, RunnerError> {
        let answerer = blueprint.spawn();
        let mut answer_rng = StdRng::seed_from_u64(game_seed ^ ANSWER_STREAM_SALT);
        let mut session = Session::with_config(
            &self.catalog,
            self.config.engine,
            StdRng::seed_from_u64(game_seed),
        );
        let mut metrics = TurnMetrics::default();

        let start = Instant::now();
        let mut turn = session.start()?;
        metrics.record(start.elapsed());

        while let Outcome::Ask { question, .. } = turn.outcome {
            let value = answerer.answer(target, question, &mut answer_rng);
            let start = Instant::now();
            turn = session.answer(question, value)?;
            metrics.record(start.elapsed());
        }

        let guess = match &turn.outcome {
            Outcome::Winner { name, .. } => Some(name.clone()),
            _ => None,
        };
        let correct = guess.as_deref() == Some(target.name());
        let top_probability = turn.posterior.best().map(|entry| entry.probability).unwrap_or(0.0);
        let metrics = metrics.finalize();

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "twentyq_bench::game",
                Level::INFO,
                run_id = %self.config.run_id,
                answerer = %blueprint.name,
                target_name = %target.name(),
                outcome = outcome_label(&turn.outcome),
                correct,
                questions = session.history().len() as u32,
                elapsed_ms = metrics.total_ms
            );
        }

        Ok(GameOutcome {
            answerer: blueprint.name.clone(),
            target: target.name().to_string(),
            outcome: outcome_label(&turn.outcome),
            guess,
            correct,
            questions: session.history().len(),
            active_remaining: session.active().len(),
            top_probability,
            metrics,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Ask { .. } => "ask",
        Outcome::Winner { .. } => "winner",
        Outcome::NoMatch => "no_match",
    }
}

fn write_game_row(
    writer: &mut BufWriter<File>,
    run_id: &str,
    round: usize,
    target_index: usize,
    game_seed: u64,
    outcome: &GameOutcome,
) -> Result<(), RunnerError> {
    let row = GameLogRow {
        run_id,
        game_id: format!("R{round:04}_C{target_index:03}"),
        round,
        game_seed,
        answerer: &outcome.answerer,
        target: &outcome.target,
        outcome: outcome.outcome,
        guess: outcome.guess.as_deref(),
        correct: outcome.correct,
        questions: outcome.questions,
        active_remaining: outcome.active_remaining,
        top_probability: outcome.top_probability,
        speed_ms_turn: outcome.metrics.avg_ms_per_turn,
        turns: outcome.metrics.turns,
    };
    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Result of one simulated game.
pub struct GameOutcome {
    pub answerer: String,
    pub target: String,
    pub outcome: &'static str,
    pub guess: Option<String>,
    pub correct: bool,
    pub questions: usize,
    pub active_remaining: usize,
    pub top_probability: f64,
    pub metrics: TurnSummary,
}

#[derive(Default)]
struct TurnMetrics {
    total: Duration,
    turns: u32,
}

impl TurnMetrics {
    fn record(&mut self, duration: Duration) {
        self.total += duration;
        self.turns += 1;
    }

    fn finalize(self) -> TurnSummary {
        let total_ms = self.total.as_secs_f64() * 1000.0;
        TurnSummary {
            turns: self.turns,
            avg_ms_per_turn: if self.turns == 0 {
                0.0
            } else {
                total_ms / f64::from(self.turns)
            },
            total_ms,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TurnSummary {
    pub turns: u32,
    pub avg_ms_per_turn: f64,
    pub total_ms: f64,
}

#[derive(Serialize)]
struct GameLogRow<'a> {
    run_id: &'a str,
    game_id: String,
    round: usize,
    game_seed: u64,
    answerer: &'a str,
    target: &'a str,
    outcome: &'static str,
    guess: Option<&'a str>,
    correct: bool,
    questions: usize,
    active_remaining: usize,
    top_probability: f64,
    speed_ms_turn: f64,
    turns: u32,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0}")]
    Answerer(#[from] AnswererError),
    #[error("failed to load catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("session failed: {0}")]
    Session(#[from] SessionError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("telemetry summarisation failed: {0}")]
    Telemetry(#[from] TelemetryError),
}
