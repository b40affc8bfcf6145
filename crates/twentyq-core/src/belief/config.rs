use serde::{Deserialize, Serialize};
use std::env;

/// Thresholds and numeric floors driving the belief engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Answers after which the session concludes with its best candidate.
    pub max_questions: usize,
    /// Pruning starts once strictly more than this many answers exist.
    pub prune_after: usize,
    /// Candidates whose posterior falls below this value leave the active set.
    pub prune_threshold: f64,
    /// Any posterior strictly above this value concludes the session.
    pub confidence_threshold: f64,
    /// Lower bound on every per-answer likelihood factor before taking its log.
    pub likelihood_floor: f64,
    /// Lower bound on the evidence term used as the posterior denominator.
    pub evidence_floor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_questions: 20,
            prune_after: 15,
            prune_threshold: 0.05,
            confidence_threshold: 0.95,
            likelihood_floor: 0.1,
            evidence_floor: 1e-9,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_reader(|key| env::var(key).ok())
    }

    fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base = Self::default();
        let max_questions = read("TWENTYQ_MAX_QUESTIONS")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(base.max_questions);
        let prune_after = read("TWENTYQ_PRUNE_AFTER")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(base.prune_after);
        let prune_threshold = read("TWENTYQ_PRUNE_THRESHOLD")
            .and_then(|raw| parse_finite(&raw))
            .unwrap_or(base.prune_threshold);
        let confidence_threshold = read("TWENTYQ_CONFIDENCE")
            .and_then(|raw| parse_finite(&raw))
            .unwrap_or(base.confidence_threshold);

        Self {
            max_questions,
            prune_after,
            prune_threshold,
            confidence_threshold,
            ..base
        }
        .sanitized()
    }

    /// Clamps every field into a range the engine can work with.
    pub fn sanitized(self) -> Self {
        let base = Self::default();
        let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
        Self {
            max_questions: self.max_questions.max(1),
            prune_after: self.prune_after,
            prune_threshold: finite_or(self.prune_threshold, base.prune_threshold).clamp(0.0, 1.0),
            confidence_threshold: finite_or(self.confidence_threshold, base.confidence_threshold)
                .clamp(0.5, 1.0),
            likelihood_floor: finite_or(self.likelihood_floor, base.likelihood_floor)
                .clamp(1e-6, 1.0),
            evidence_floor: finite_or(self.evidence_floor, base.evidence_floor).clamp(1e-300, 1.0),
        }
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn reader(pairs: &[(&str, &str)]) -> impl FnMut(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_questions, 20);
        assert_eq!(cfg.prune_after, 15);
        assert_eq!(cfg.prune_threshold, 0.05);
        assert_eq!(cfg.confidence_threshold, 0.95);
        assert_eq!(cfg.likelihood_floor, 0.1);
        assert_eq!(cfg.evidence_floor, 1e-9);
    }

    #[test]
    fn reader_overrides_and_clamps() {
        let cfg = EngineConfig::from_reader(reader(&[
            ("TWENTYQ_MAX_QUESTIONS", "0"),
            ("TWENTYQ_PRUNE_AFTER", "10"),
            ("TWENTYQ_PRUNE_THRESHOLD", "3.5"),
            ("TWENTYQ_CONFIDENCE", "0.9"),
        ]));
        assert_eq!(cfg.max_questions, 1);
        assert_eq!(cfg.prune_after, 10);
        assert_eq!(cfg.prune_threshold, 1.0);
        assert_eq!(cfg.confidence_threshold, 0.9);
    }

    #[test]
    fn unparsable_values_fall_back() {
        let cfg = EngineConfig::from_reader(reader(&[
            ("TWENTYQ_MAX_QUESTIONS", "many"),
            ("TWENTYQ_CONFIDENCE", "NaN"),
        ]));
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn partial_yaml_style_input_keeps_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"max_questions": 12}"#).unwrap();
        assert_eq!(cfg.max_questions, 12);
        assert_eq!(cfg.prune_after, 15);
    }
}
