use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::{AnswererKind, BenchmarkConfig};
use crate::simulation::GameOutcome;

const CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("answerer '{0}' produced results but is missing from configuration")]
    UnknownAnswerer(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}

pub struct AnalyticsCollector {
    answerers: HashMap<String, AnswererAccumulator>,
    order: Vec<String>,
    run_id: String,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Self {
        let answerers = config
            .answerers
            .iter()
            .map(|answerer| {
                (
                    answerer.name.clone(),
                    AnswererAccumulator::new(answerer.name.clone(), answerer.kind),
                )
            })
            .collect();
        Self {
            answerers,
            order: config.answerers.iter().map(|a| a.name.clone()).collect(),
            run_id: config.run_id.clone(),
        }
    }

    pub fn record_game(&mut self, game: &GameOutcome) -> Result<(), AnalyticsError> {
        let acc = self
            .answerers
            .get_mut(&game.answerer)
            .ok_or_else(|| AnalyticsError::UnknownAnswerer(game.answerer.clone()))?;
        acc.record(game);
        Ok(())
    }

    pub fn finalize(mut self) -> AnalyticsSummary {
        let z = z_score(CONFIDENCE_LEVEL);
        let answerers = self
            .order
            .iter()
            .filter_map(|name| self.answerers.remove(name))
            .map(|acc| acc.into_report(z))
            .collect();
        AnalyticsSummary {
            run_id: self.run_id,
            confidence_level: CONFIDENCE_LEVEL,
            answerers,
        }
    }
}

struct AnswererAccumulator {
    name: String,
    kind: AnswererKind,
    games: u32,
    correct: u32,
    wrong: u32,
    no_match: u32,
    questions: Vec<f64>,
    total_latency_ms: f64,
    total_turns: u64,
}

impl AnswererAccumulator {
    fn new(name: String, kind: AnswererKind) -> Self {
        Self {
            name,
            kind,
            games: 0,
            correct: 0,
            wrong: 0,
            no_match: 0,
            questions: Vec::new(),
            total_latency_ms: 0.0,
            total_turns: 0,
        }
    }

    fn record(&mut self, game: &GameOutcome) {
        self.games += 1;
        match (game.guess.is_some(), game.correct) {
            (_, true) => self.correct += 1,
            (true, false) => self.wrong += 1,
            (false, false) => self.no_match += 1,
        }
        self.questions.push(game.questions as f64);
        self.total_latency_ms += game.metrics.total_ms;
        self.total_turns += u64::from(game.metrics.turns);
    }

    fn into_report(self, z: f64) -> AnswererReport {
        let games = self.games as usize;
        let ratio = |count: u32| {
            if games == 0 {
                0.0
            } else {
                f64::from(count) / games as f64
            }
        };
        let accuracy = ratio(self.correct);
        let no_match_rate = ratio(self.no_match);
        let avg_questions = mean(&self.questions);
        let avg_ms_per_turn = if self.total_turns == 0 {
            0.0
        } else {
            self.total_latency_ms / self.total_turns as f64
        };

        AnswererReport {
            name: self.name,
            kind: self.kind,
            games,
            correct: self.correct as usize,
            wrong: self.wrong as usize,
            no_match: self.no_match as usize,
            accuracy,
            accuracy_ci: wilson_interval(self.correct as usize, games, z),
            no_match_rate,
            avg_questions,
            questions_ci: mean_interval(&self.questions, z),
            avg_ms_per_turn,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub run_id: String,
    pub confidence_level: f64,
    pub answerers: Vec<AnswererReport>,
}

impl AnalyticsSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let level = self.confidence_level * 100.0;
        let mut rows = String::new();
        rows.push_str(&format!("# Self-play Summary: {}\n\n", self.run_id));
        rows.push_str(&format!(
            "| Answerer | Kind | Games | Accuracy | {level:.0}% CI | Wrong | No match % | Avg questions | {level:.0}% CI | Avg ms/turn |\n"
        ));
        rows.push_str("|----------|------|-------|----------|--------|-------|------------|---------------|--------|-------------|\n");

        for report in &self.answerers {
            rows.push_str(&format!(
                "| {name} | {kind:?} | {games} | {acc:.1}% | [{acc_lo:.1}%, {acc_hi:.1}%] | {wrong} | {nm:.1}% | {q:.2} | [{q_lo:.2}, {q_hi:.2}] | {ms:.3} |\n",
                name = report.name,
                kind = report.kind,
                games = report.games,
                acc = report.accuracy * 100.0,
                acc_lo = report.accuracy_ci.0 * 100.0,
                acc_hi = report.accuracy_ci.1 * 100.0,
                wrong = report.wrong,
                nm = report.no_match_rate * 100.0,
                q = report.avg_questions,
                q_lo = report.questions_ci.0,
                q_hi = report.questions_ci.1,
                ms = report.avg_ms_per_turn,
            ));
        }

        fs::write(path.as_ref(), rows).map_err(|source| AnalyticsError::Io {
            context: "writing summary markdown",
            source,
        })
    }

    pub fn render_plot(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AnalyticsError> {
        let dir = dir.as_ref();
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|source| AnalyticsError::Io {
                context: "creating plots directory",
                source,
            })?;
        }

        let output_path = dir.join("accuracy.png");
        let reports = self.answerers.clone();

        let prev_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));

        let plot_attempt = std::panic::catch_unwind(move || {
            let plot_err = |e: &dyn std::fmt::Display| AnalyticsError::Plot(e.to_string());
            let root = BitMapBackend::new(&output_path, (800, 480)).into_drawing_area();
            root.fill(&WHITE).map_err(|e| plot_err(&e))?;

            let mut chart = ChartBuilder::on(&root)
                .margin(20)
                .caption("Accuracy by answerer", ("sans-serif", 22))
                .set_label_area_size(LabelAreaPosition::Left, 50)
                .set_label_area_size(LabelAreaPosition::Bottom, 60)
                .build_cartesian_2d(0..reports.len().max(1), 0.0f64..1.0f64)
                .map_err(|e| plot_err(&e))?;

            chart
                .configure_mesh()
                .disable_mesh()
                .y_desc("Accuracy")
                .x_desc("Answerer")
                .x_label_formatter(&|idx| {
                    reports
                        .get(*idx)
                        .map(|report| report.name.clone())
                        .unwrap_or_default()
                })
                .draw()
                .map_err(|e| plot_err(&e))?;

            chart
                .draw_series(reports.iter().enumerate().map(|(idx, report)| {
                    Rectangle::new([(idx, 0.0), (idx + 1, report.accuracy)], BLUE.filled())
                }))
                .map_err(|e| plot_err(&e))?;

            chart
                .draw_series(reports.iter().enumerate().map(|(idx, report)| {
                    PathElement::new(
                        vec![(idx, report.accuracy_ci.0), (idx, report.accuracy_ci.1)],
                        BLACK.stroke_width(2),
                    )
                }))
                .map_err(|e| plot_err(&e))?;

            drop(chart);
            root.present().map_err(|e| plot_err(&e))?;
            drop(root);
            Ok(output_path)
        });

        std::panic::set_hook(prev_hook);

        match plot_attempt {
            Ok(result) => result,
            Err(_) => Err(AnalyticsError::Plot(
                "plotters panicked while rendering (missing font support?)".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswererReport {
    pub name: String,
    pub kind: AnswererKind,
    pub games: usize,
    pub correct: usize,
    pub wrong: usize,
    pub no_match: usize,
    pub accuracy: f64,
    pub accuracy_ci: (f64, f64),
    pub no_match_rate: f64,
    pub avg_questions: f64,
    pub questions_ci: (f64, f64),
    pub avg_ms_per_turn: f64,
}

/// Two-sided standard normal quantile for `level`.
fn z_score(level: f64) -> f64 {
    Normal::new(0.0, 1.0)
        .map(|normal| normal.inverse_cdf(0.5 + level / 2.0))
        .unwrap_or(1.96)
}

/// Wilson score interval for `successes` out of `trials`.
pub fn wilson_interval(successes: usize, trials: usize, z: f64) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 0.0);
    }
    let n = trials as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let half = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    ((center - half).max(0.0), (center + half).min(1.0))
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn mean_interval(values: &[f64], z: f64) -> (f64, f64) {
    let avg = mean(values);
    if values.len() < 2 {
        return (avg, avg);
    }
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    let margin = z * (variance / values.len() as f64).sqrt();
    (avg - margin, avg + margin)
}
