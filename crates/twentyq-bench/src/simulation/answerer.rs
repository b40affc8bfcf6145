//! Simulated players that know the hidden character and answer from its catalog entry.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;
use twentyq_core::{AnswerStrength, Candidate, QuestionId};

use crate::config::{AnswererConfig, AnswererKind};

pub trait Answerer {
    fn answer(&self, target: &Candidate, question: QuestionId, rng: &mut StdRng) -> f64;
}

/// Replies with the catalog strength verbatim.
pub struct ExactAnswerer;

impl Answerer for ExactAnswerer {
    fn answer(&self, target: &Candidate, question: QuestionId, _rng: &mut StdRng) -> f64 {
        target.strength(question).value()
    }
}

/// Replaces the true strength with a uniformly random canonical one at `flip_rate`.
pub struct NoisyAnswerer {
    flip_rate: f64,
}

impl Answerer for NoisyAnswerer {
    fn answer(&self, target: &Candidate, question: QuestionId, rng: &mut StdRng) -> f64 {
        if rng.gen_bool(self.flip_rate) {
            AnswerStrength::ALL
                .choose(rng)
                .copied()
                .unwrap_or_default()
                .value()
        } else {
            target.strength(question).value()
        }
    }
}

/// Pulls every answer toward "don't know" by `blend`.
pub struct HesitantAnswerer {
    blend: f64,
}

impl Answerer for HesitantAnswerer {
    fn answer(&self, target: &Candidate, question: QuestionId, _rng: &mut StdRng) -> f64 {
        let truth = target.strength(question).value();
        truth + (AnswerStrength::Unknown.value() - truth) * self.blend
    }
}

#[derive(Debug, Error)]
pub enum AnswererError {
    #[error("invalid parameter for answerer '{name}': {message}")]
    InvalidParam { name: String, message: String },
}

/// Validated answerer definition; spawns a fresh answerer per game.
pub(crate) struct AnswererBlueprint {
    pub(crate) name: String,
    kind: AnswererKind,
    rate: f64,
}

impl AnswererBlueprint {
    pub(crate) fn from_configs(configs: &[AnswererConfig]) -> Result<Vec<Self>, AnswererError> {
        configs.iter().map(Self::from_config).collect()
    }

    fn from_config(config: &AnswererConfig) -> Result<Self, AnswererError> {
        let rate = match config.kind {
            AnswererKind::Exact => 0.0,
            AnswererKind::Noisy => unit_param(&config.name, &config.params, "flip_rate", 0.1)?,
            AnswererKind::Hesitant => unit_param(&config.name, &config.params, "blend", 0.5)?,
        };
        Ok(Self {
            name: config.name.clone(),
            kind: config.kind,
            rate,
        })
    }

    pub(crate) fn spawn(&self) -> Box<dyn Answerer> {
        match self.kind {
            AnswererKind::Exact => Box::new(ExactAnswerer),
            AnswererKind::Noisy => Box::new(NoisyAnswerer {
                flip_rate: self.rate,
            }),
            AnswererKind::Hesitant => Box::new(HesitantAnswerer { blend: self.rate }),
        }
    }
}

fn unit_param(
    name: &str,
    params: &serde_yaml::Value,
    key: &str,
    default: f64,
) -> Result<f64, AnswererError> {
    let invalid = |message: String| AnswererError::InvalidParam {
        name: name.to_string(),
        message,
    };

    if params.is_null() {
        return Ok(default);
    }
    let mapping = params
        .as_mapping()
        .ok_or_else(|| invalid("expected mapping for answerer params".to_string()))?;

    let Some(value) = mapping
        .iter()
        .find_map(|(k, v)| (k.as_str() == Some(key)).then_some(v))
    else {
        return Ok(default);
    };

    let number = value
        .as_f64()
        .ok_or_else(|| invalid(format!("{key} must be a number")))?;
    if !(0.0..=1.0).contains(&number) {
        return Err(invalid(format!("{key} must be within [0, 1], got {number}")));
    }
    Ok(number)
}
