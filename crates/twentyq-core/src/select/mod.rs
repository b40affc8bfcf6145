//! Choosing the next question to ask.

mod split;

pub use split::{QuestionScore, expected_answer, split_value};

use crate::belief::{BeliefError, resolve};
use crate::model::{Catalog, CandidateId, QuestionId};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{Level, enabled, trace};

/// Picks the most discriminating unasked question for the active set.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuestionSelector;

impl QuestionSelector {
    /// Scores every question in the catalog that is not in `asked`, in question-id order.
    pub fn rank(
        catalog: &Catalog,
        active: &[CandidateId],
        asked: &[QuestionId],
    ) -> Result<Vec<QuestionScore>, BeliefError> {
        let members = resolve(catalog, active)?;
        let scores: Vec<QuestionScore> = catalog
            .question_ids()
            .filter(|question| !asked.contains(question))
            .map(|question| QuestionScore::evaluate(question, &members))
            .collect();

        if enabled!(Level::TRACE) {
            for score in &scores {
                trace!(
                    target: "twentyq::select",
                    question = score.question.get(),
                    split = score.split,
                    expected = score.expected,
                    score = score.score,
                    "question scored"
                );
            }
        }
        Ok(scores)
    }

    /// All questions sharing the maximum score (exact float equality).
    pub fn best_questions(
        catalog: &Catalog,
        active: &[CandidateId],
        asked: &[QuestionId],
    ) -> Result<Vec<QuestionId>, BeliefError> {
        let mut best = Vec::new();
        let mut best_score = -1.0_f64;
        for score in Self::rank(catalog, active, asked)? {
            if score.score > best_score {
                best_score = score.score;
                best.clear();
                best.push(score.question);
            } else if score.score == best_score {
                best.push(score.question);
            }
        }
        Ok(best)
    }

    /// Returns `None` when every question has been asked or nobody is left to ask about.
    pub fn select<R: Rng + ?Sized>(
        catalog: &Catalog,
        active: &[CandidateId],
        asked: &[QuestionId],
        rng: &mut R,
    ) -> Result<Option<QuestionId>, BeliefError> {
        if active.is_empty() {
            return Ok(None);
        }
        let tied = Self::best_questions(catalog, active, asked)?;
        Ok(tied.choose(rng).copied())
    }
}
