use super::question::QuestionId;
use serde::{Deserialize, Serialize};

/// One answered question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub question: QuestionId,
    pub answer: f64,
}

impl Observation {
    pub const fn new(question: QuestionId, answer: f64) -> Self {
        Self { question, answer }
    }

    /// How decisive the answer was: 1 at 0.5, falling to 0.5 at either extreme.
    pub fn certainty(&self) -> f64 {
        1.0 - (0.5 - self.answer).abs()
    }
}

/// Append-only record of the answers given in one session, in the order they arrived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<Observation>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, observation: Observation) {
        self.entries.push(observation);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.entries
    }

    pub fn has_asked(&self, question: QuestionId) -> bool {
        self.entries.iter().any(|entry| entry.question == question)
    }
}

impl From<Vec<Observation>> for History {
    fn from(entries: Vec<Observation>) -> Self {
        Self { entries }
    }
}
