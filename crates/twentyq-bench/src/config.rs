use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;
use twentyq_core::EngineConfig;

const MAX_ROUNDS: usize = 10_000;
const NAME_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub catalog: PathBuf,
    pub games: GamesConfig,
    pub answerers: Vec<AnswererConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without touching the filesystem.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        if self.catalog.as_os_str().is_empty() {
            return Err(ValidationError::field("catalog", "catalog path must not be empty"));
        }
        self.games.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.validate()?;
        self.engine = self.engine.sanitized();
        validate_answerers(&mut self.answerers)?;
        Ok(())
    }

    /// Applies command-line overrides and re-validates the result.
    pub fn apply_overrides(&mut self, overrides: RunOverrides) -> Result<(), ValidationError> {
        let RunOverrides { run_id, rounds, seed } = overrides;
        if let Some(run_id) = run_id {
            self.run_id = run_id;
        }
        if let Some(rounds) = rounds {
            self.games.rounds = rounds;
        }
        if seed.is_some() {
            self.games.seed = seed;
        }
        self.validate()
    }

    /// Resolve `{run_id}` placeholders in output paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }
}

/// How many games to play and how to seed them.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GamesConfig {
    pub seed: Option<u64>,
    /// Passes over the whole catalog; every round plays each character once per answerer.
    pub rounds: usize,
}

impl GamesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.rounds == 0 {
            return Err(ValidationError::field(
                "games.rounds",
                "number of rounds must be greater than zero",
            ));
        }
        if self.rounds > MAX_ROUNDS {
            return Err(ValidationError::field(
                "games.rounds",
                format!("at most {MAX_ROUNDS} rounds are supported"),
            ));
        }
        Ok(())
    }
}

/// One simulated player.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AnswererConfig {
    pub name: String,
    pub kind: AnswererKind,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswererKind {
    Exact,
    Noisy,
    Hesitant,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::field(label, "path must not be empty"));
            }
            if resolve_template(run_id, value).components().count() == 0 {
                return Err(ValidationError::field(label, "resolved path is invalid"));
            }
        }
        Ok(())
    }
}

/// Structured logging is off unless asked for.
///
/// `tracing_level` applies to every engine target; `targets` refines single ones, e.g.
/// `targets: { select: trace }` to see individual question scores.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
    #[serde(default)]
    pub targets: BTreeMap<TraceTarget, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
            targets: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    fn validate(&mut self) -> Result<(), ValidationError> {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
        if self.level().is_none() {
            return Err(ValidationError::field(
                "logging.tracing_level",
                format!("unknown level '{}'", self.tracing_level),
            ));
        }
        for (target, level) in &self.targets {
            if parse_level(level).is_none() {
                return Err(ValidationError::field(
                    format!("logging.targets.{}", target.key()),
                    format!("unknown level '{level}'"),
                ));
            }
        }
        Ok(())
    }

    pub fn level(&self) -> Option<Level> {
        parse_level(&self.tracing_level)
    }

    /// Level for one engine target: its override if present, else the global level.
    pub fn level_for(&self, target: TraceTarget) -> Level {
        self.targets
            .get(&target)
            .and_then(|raw| parse_level(raw))
            .or_else(|| self.level())
            .unwrap_or(Level::INFO)
    }
}

/// Event targets the harness knows how to summarise.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TraceTarget {
    Belief,
    Select,
    Session,
    Game,
}

impl TraceTarget {
    pub const ALL: [TraceTarget; 4] = [
        TraceTarget::Belief,
        TraceTarget::Select,
        TraceTarget::Session,
        TraceTarget::Game,
    ];

    /// `tracing` target string the engine or the harness emits under.
    pub const fn target(self) -> &'static str {
        match self {
            TraceTarget::Belief => "twentyq::belief",
            TraceTarget::Select => "twentyq::select",
            TraceTarget::Session => "twentyq::session",
            TraceTarget::Game => "twentyq_bench::game",
        }
    }

    const fn key(self) -> &'static str {
        match self {
            TraceTarget::Belief => "belief",
            TraceTarget::Select => "select",
            TraceTarget::Session => "session",
            TraceTarget::Game => "game",
        }
    }
}

fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Command-line replacements for values in the YAML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, clap::Args)]
pub struct RunOverrides {
    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    pub run_id: Option<String>,
    /// Override the number of passes over the catalog.
    #[arg(long, value_name = "ROUNDS")]
    pub rounds: Option<usize>,
    /// Override the master RNG seed.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::field("run_id", "run_id must not be empty"));
    }
    if !run_id.chars().all(|c| NAME_ALLOWED.contains(c)) {
        return Err(ValidationError::field(
            "run_id",
            "run_id may only contain alphanumeric characters, '.', '_' or '-'",
        ));
    }
    Ok(())
}

fn validate_answerers(answerers: &mut [AnswererConfig]) -> Result<(), ValidationError> {
    if answerers.is_empty() {
        return Err(ValidationError::field(
            "answerers",
            "at least one answerer must be specified",
        ));
    }

    let mut seen = HashSet::new();
    for answerer in answerers.iter_mut() {
        if answerer.name.trim().is_empty() {
            return Err(ValidationError::field(
                "answerers.name",
                "answerer name must not be empty",
            ));
        }
        if !answerer.name.chars().all(|c| NAME_ALLOWED.contains(c)) {
            return Err(ValidationError::field(
                format!("answerers[{}].name", answerer.name),
                "answerer name contains invalid characters",
            ));
        }
        if !seen.insert(answerer.name.clone()) {
            return Err(ValidationError::field(
                "answerers",
                format!("answerer name '{}' defined more than once", answerer.name),
            ));
        }
        if answerer.params.is_null() {
            answerer.params = serde_yaml::Value::Mapping(Default::default());
        }
    }
    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

impl ResolvedOutputs {
    /// Directory holding the summary; telemetry files are written beside it.
    pub fn report_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}

impl ValidationError {
    fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}
