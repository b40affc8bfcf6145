use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

const TURN_TARGET: &str = "twentyq::session";
const TURN_MESSAGE: &str = "turn evaluated";
const GAME_TARGET: &str = "twentyq_bench::game";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse telemetry JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize)]
pub struct TelemetrySummary {
    pub turns: TurnTelemetrySummary,
    pub games: GameTelemetrySummary,
}

/// Aggregates over the engine's per-turn debug events.
#[derive(Debug, Default, Serialize)]
pub struct TurnTelemetrySummary {
    pub count: usize,
    pub avg_active: Option<f64>,
    pub avg_top_probability: Option<f64>,
    pub avg_margin: Option<f64>,
    pub avg_entropy: Option<f64>,
}

/// Aggregates over the harness' one-per-game events.
#[derive(Debug, Default, Serialize)]
pub struct GameTelemetrySummary {
    pub count: usize,
    pub avg_questions: Option<f64>,
    pub outcome_counts: BTreeMap<String, usize>,
    pub correct_by_answerer: BTreeMap<String, usize>,
}

#[derive(Debug, Default)]
struct Average {
    sum: f64,
    count: usize,
}

impl Average {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value.filter(|v| v.is_finite()) {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

/// Aggregate the JSON trace written by [`crate::logging::init_logging`].
pub fn summarise_telemetry(path: &Path) -> Result<TelemetrySummary, TelemetryError> {
    if !path.exists() {
        return Ok(TelemetrySummary::default());
    }

    let file = File::open(path).map_err(|source| TelemetryError::Io {
        context: "opening telemetry log",
        source,
    })?;

    let mut turns = TurnTelemetrySummary::default();
    let mut active = Average::default();
    let mut top = Average::default();
    let mut margin = Average::default();
    let mut entropy = Average::default();

    let mut games = GameTelemetrySummary::default();
    let mut questions = Average::default();

    for line in BufReader::new(file).lines() {
        let line = line.map_err(|source| TelemetryError::Io {
            context: "reading telemetry line",
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let payload: Value = serde_json::from_str(&line)?;
        let target = payload
            .get("target")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let fields = payload
            .get("fields")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match target {
            TURN_TARGET if message(&fields) == Some(TURN_MESSAGE) => {
                turns.count += 1;
                active.add(number(&fields, "active"));
                top.add(number(&fields, "top"));
                margin.add(number(&fields, "margin"));
                entropy.add(number(&fields, "entropy"));
            }
            GAME_TARGET => {
                games.count += 1;
                questions.add(number(&fields, "questions"));
                let outcome = fields
                    .get("outcome")
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or("<unset>");
                *games.outcome_counts.entry(outcome.to_string()).or_insert(0) += 1;

                if fields.get("correct").and_then(Value::as_bool) == Some(true) {
                    let answerer = fields
                        .get("answerer")
                        .and_then(Value::as_str)
                        .unwrap_or("<unset>");
                    *games
                        .correct_by_answerer
                        .entry(answerer.to_string())
                        .or_insert(0) += 1;
                }
            }
            _ => {}
        }
    }

    turns.avg_active = active.mean();
    turns.avg_top_probability = top.mean();
    turns.avg_margin = margin.mean();
    turns.avg_entropy = entropy.mean();
    games.avg_questions = questions.mean();

    Ok(TelemetrySummary { turns, games })
}

fn message(fields: &Map<String, Value>) -> Option<&str> {
    fields.get("message").and_then(Value::as_str)
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    fields.get(key).and_then(Value::as_f64)
}

pub fn write_summary_outputs(
    telemetry_path: &Path,
    output_dir: &Path,
) -> Result<Option<TelemetryOutputs>, TelemetryError> {
    if !telemetry_path.exists() {
        return Ok(None);
    }

    let summary = summarise_telemetry(telemetry_path)?;
    let json_path = output_dir.join("telemetry_summary.json");
    let markdown_path = output_dir.join("telemetry_summary.md");

    std::fs::write(&json_path, serde_json::to_vec_pretty(&summary)?).map_err(|source| {
        TelemetryError::Io {
            context: "writing telemetry summary json",
            source,
        }
    })?;
    std::fs::write(&markdown_path, render_markdown(&summary, telemetry_path)).map_err(
        |source| TelemetryError::Io {
            context: "writing telemetry summary markdown",
            source,
        },
    )?;

    Ok(Some(TelemetryOutputs {
        summary,
        json_path,
        markdown_path,
    }))
}

pub fn append_highlights_to_markdown(
    summary_path: &Path,
    outputs: &TelemetryOutputs,
) -> Result<(), TelemetryError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(summary_path)
        .map_err(|source| TelemetryError::Io {
            context: "opening summary markdown for telemetry append",
            source,
        })?;

    let mut section = String::from("\n## Telemetry Highlights\n");
    section.push_str(&turn_lines(&outputs.summary.turns));
    section.push_str(&format!(
        "- Games traced: {}\n",
        outputs.summary.games.count
    ));
    for (label, count) in &outputs.summary.games.outcome_counts {
        section.push_str(&format!("  - {label}: {count}\n"));
    }

    write!(file, "{section}").map_err(|source| TelemetryError::Io {
        context: "writing telemetry highlights",
        source,
    })
}

fn turn_lines(turns: &TurnTelemetrySummary) -> String {
    let mut out = format!("- Turns traced: {}\n", turns.count);
    if let Some(value) = turns.avg_active {
        out.push_str(&format!("- Avg active candidates: {value:.2}\n"));
    }
    if let Some(value) = turns.avg_top_probability {
        out.push_str(&format!("- Avg top posterior: {value:.3}\n"));
    }
    if let Some(value) = turns.avg_margin {
        out.push_str(&format!("- Avg top vs runner-up margin: {value:.3}\n"));
    }
    if let Some(value) = turns.avg_entropy {
        out.push_str(&format!("- Avg posterior entropy: {value:.3}\n"));
    }
    out
}

fn render_markdown(summary: &TelemetrySummary, telemetry_path: &Path) -> String {
    let mut output = String::from("# Telemetry Summary\n\n");
    output.push_str(&format!("- Source: `{}`\n\n", telemetry_path.display()));

    output.push_str("## Turns\n");
    output.push_str(&turn_lines(&summary.turns));
    output.push('\n');

    output.push_str("## Games\n");
    output.push_str(&format!("- Events: {}\n", summary.games.count));
    if let Some(value) = summary.games.avg_questions {
        output.push_str(&format!("- Avg questions: {value:.2}\n"));
    }
    if summary.games.outcome_counts.is_empty() {
        output.push_str("- Outcomes: <none>\n");
    } else {
        output.push_str("- Outcomes:\n");
        for (label, count) in &summary.games.outcome_counts {
            output.push_str(&format!("  - {label}: {count}\n"));
        }
    }
    if !summary.games.correct_by_answerer.is_empty() {
        output.push_str("- Correct guesses:\n");
        for (label, count) in &summary.games.correct_by_answerer {
            output.push_str(&format!("  - {label}: {count}\n"));
        }
    }
    output
}

#[derive(Debug)]
pub struct TelemetryOutputs {
    pub summary: TelemetrySummary,
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        for line in lines {
            writeln!(file, "{line}").expect("write line");
        }
        file
    }

    #[test]
    fn summarises_turn_and_game_events() {
        let lines = [
            r#"{"level":"DEBUG","target":"twentyq::session","fields":{"message":"turn evaluated","answered":0,"active":14,"top":0.5,"margin":0.0,"entropy":2.0}}"#,
            r#"{"level":"DEBUG","target":"twentyq::session","fields":{"message":"turn evaluated","answered":1,"active":10,"top":0.9,"margin":0.4,"entropy":1.0}}"#,
            r#"{"level":"INFO","target":"twentyq::session","fields":{"message":"session concluded","answered":1}}"#,
            r#"{"level":"INFO","target":"twentyq_bench::game","fields":{"answerer":"exact","outcome":"winner","correct":true,"questions":8}}"#,
            r#"{"level":"INFO","target":"twentyq_bench::game","fields":{"answerer":"noisy","outcome":"no_match","correct":false,"questions":16}}"#,
        ];
        let file = write_temp_file(&lines);
        let summary = summarise_telemetry(file.path()).expect("summarise");

        assert_eq!(summary.turns.count, 2);
        assert_eq!(summary.turns.avg_active, Some(12.0));
        assert!((summary.turns.avg_top_probability.unwrap() - 0.7).abs() < 1e-12);
        assert_eq!(summary.games.count, 2);
        assert_eq!(summary.games.avg_questions, Some(12.0));
        assert_eq!(summary.games.outcome_counts.get("winner"), Some(&1));
        assert_eq!(summary.games.outcome_counts.get("no_match"), Some(&1));
        assert_eq!(summary.games.correct_by_answerer.get("exact"), Some(&1));
        assert!(!summary.games.correct_by_answerer.contains_key("noisy"));
    }

    #[test]
    fn handles_missing_file() {
        let summary =
            summarise_telemetry(Path::new("tests/does/not/exist.jsonl")).expect("missing file");
        assert_eq!(summary.turns.count, 0);
        assert!(summary.turns.avg_active.is_none());
        assert!(summary.games.outcome_counts.is_empty());
    }

    #[test]
    fn writes_outputs_and_appends_highlights() {
        let dir = tempfile::tempdir().expect("temp dir");
        let trace = dir.path().join("telemetry.jsonl");
        std::fs::write(
            &trace,
            concat!(
                r#"{"target":"twentyq::session","fields":{"message":"turn evaluated","active":3,"top":0.4}}"#,
                "\n",
                r#"{"target":"twentyq_bench::game","fields":{"answerer":"exact","outcome":"winner","correct":true,"questions":4}}"#,
                "\n"
            ),
        )
        .expect("seed trace");
        let summary_md = dir.path().join("summary.md");
        std::fs::write(&summary_md, "# Self-play Summary: t\n").expect("seed summary");

        let outputs = write_summary_outputs(&trace, dir.path())
            .expect("write outputs")
            .expect("trace exists");
        assert!(outputs.json_path.exists());
        assert!(outputs.markdown_path.exists());

        append_highlights_to_markdown(&summary_md, &outputs).expect("append");
        let contents = std::fs::read_to_string(&summary_md).expect("read summary");
        assert!(contents.contains("## Telemetry Highlights"));
        assert!(contents.contains("Turns traced: 1"));
        assert!(contents.contains("Avg active candidates: 3.00"));
        assert!(contents.contains("  - winner: 1"));
    }
}
