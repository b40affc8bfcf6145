use super::answer::AnswerStrength;
use super::question::QuestionId;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Position of a candidate inside its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidateId(usize);

impl CandidateId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A catalog entity together with its canonical answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    name: String,
    #[serde(default)]
    answers: BTreeMap<QuestionId, AnswerStrength>,
}

impl Candidate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            answers: BTreeMap::new(),
        }
    }

    pub fn with_answer(mut self, question: QuestionId, strength: AnswerStrength) -> Self {
        self.answers.insert(question, strength);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical strength for `question`; unanswered questions read as neutral.
    pub fn strength(&self, question: QuestionId) -> AnswerStrength {
        self.answers.get(&question).copied().unwrap_or_default()
    }

    pub fn answers(&self) -> &BTreeMap<QuestionId, AnswerStrength> {
        &self.answers
    }
}
