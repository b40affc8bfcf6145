//! Per-question scoring against the active set.

use crate::model::{AnswerStrength, Candidate, QuestionId};
use serde::Serialize;

/// Score components for one unasked question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuestionScore {
    pub question: QuestionId,
    /// `1 - Σ share²` over the five canonical buckets; 0 when everyone agrees.
    pub split: f64,
    /// Mean catalog strength across the active set.
    pub expected: f64,
    /// `(1 - |0.5 - expected|) * split`.
    pub score: f64,
}

impl QuestionScore {
    pub fn evaluate(question: QuestionId, active: &[&Candidate]) -> Self {
        let split = split_value(question, active);
        let expected = expected_answer(question, active);
        Self {
            question,
            split,
            expected,
            score: (1.0 - (0.5 - expected).abs()) * split,
        }
    }
}

pub fn split_value(question: QuestionId, active: &[&Candidate]) -> f64 {
    let mut buckets = [0usize; AnswerStrength::ALL.len()];
    for candidate in active {
        buckets[candidate.strength(question).index()] += 1;
    }
    let total = (active.len() as f64).max(1e-9);
    let concentration: f64 = buckets
        .iter()
        .map(|&count| {
            let share = count as f64 / total;
            share * share
        })
        .sum();
    1.0 - concentration
}

pub fn expected_answer(question: QuestionId, active: &[&Candidate]) -> f64 {
    if active.is_empty() {
        return AnswerStrength::Unknown.value();
    }
    let sum: f64 = active
        .iter()
        .map(|candidate| candidate.strength(question).value())
        .sum();
    sum / active.len() as f64
}
