//! JSON trace of a self-play run, read back by [`crate::telemetry`].

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LoggingConfig, ResolvedOutputs, TraceTarget};

/// File name of the JSON trace written next to the summary.
pub const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Keeps the non-blocking writer alive; dropping it flushes the trace.
pub struct LoggingGuard {
    _worker: WorkerGuard,
    pub telemetry_path: PathBuf,
}

/// `EnvFilter` directives for a run: other crates stay at `warn`, each engine target gets
/// its configured level.
///
/// Per-game events are emitted at `info`, so the game target never drops below it.
pub fn trace_directives(logging: &LoggingConfig) -> String {
    let mut directives = vec!["warn".to_string()];
    for target in TraceTarget::ALL {
        let level = match (target, logging.level_for(target)) {
            (TraceTarget::Game, Level::WARN | Level::ERROR) => Level::INFO,
            (_, level) => level,
        };
        directives.push(format!(
            "{}={}",
            target.target(),
            level.as_str().to_ascii_lowercase()
        ));
    }
    directives.join(",")
}

/// Installs the JSON subscriber when structured logging is enabled.
///
/// `RUST_LOG` wins over the configured directives.
pub fn init_logging(
    logging: &LoggingConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<LoggingGuard>> {
    if !logging.enable_structured {
        return Ok(None);
    }

    let report_dir = outputs.report_dir();
    fs::create_dir_all(&report_dir)
        .with_context(|| format!("creating report directory {}", report_dir.display()))?;
    let telemetry_path = report_dir.join(TELEMETRY_FILE);
    let file = File::create(&telemetry_path)
        .with_context(|| format!("creating trace file {}", telemetry_path.display()))?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directives = trace_directives(logging);
            EnvFilter::try_new(&directives)
                .with_context(|| format!("parsing trace directives `{directives}`"))?
        }
    };

    let (writer, worker) = NonBlockingBuilder::default().lossy(false).finish(file);
    let subscriber = fmt()
        .json()
        .with_current_span(false)
        .with_env_filter(filter)
        .with_writer(writer)
        .finish();

    // Tests may run several harnesses in one process; the first subscriber stays.
    let _ = tracing::subscriber::set_global_default(subscriber);

    Ok(Some(LoggingGuard {
        _worker: worker,
        telemetry_path,
    }))
}
