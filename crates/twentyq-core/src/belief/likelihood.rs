//! Likelihood of an answer history for one candidate versus the rest of the active set.

use super::EngineConfig;
use crate::model::{Candidate, Observation};

/// `P(history | candidate)` and `P(history | not candidate)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Likelihood {
    pub given_candidate: f64,
    pub given_other: f64,
}

/// Accumulates per-answer factors in log space so long histories do not underflow.
#[derive(Debug, Clone, Copy)]
pub struct LikelihoodModel {
    floor: f64,
}

impl Default for LikelihoodModel {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl LikelihoodModel {
    pub fn new(floor: f64) -> Self {
        Self { floor }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.likelihood_floor)
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Evaluates `candidate` against `history`.
    ///
    /// `active` is the current active set and normally contains `candidate` itself; the
    /// comparison population is every other member of it. With one or zero members the
    /// not-candidate likelihood stays at 1.
    pub fn evaluate(
        &self,
        candidate: &Candidate,
        history: &[Observation],
        active: &[&Candidate],
    ) -> Likelihood {
        let others: Vec<&Candidate> = active
            .iter()
            .copied()
            .filter(|other| other.name() != candidate.name())
            .collect();
        let compare = active.len() > 1 && !others.is_empty();

        let mut log_given_candidate = 0.0_f64;
        let mut log_given_other = 0.0_f64;

        for observation in history {
            let question = observation.question;
            let answer = observation.answer;

            let mismatch = (answer - candidate.strength(question).value()).abs();
            let factor = 1.0 - observation.certainty() * mismatch;
            log_given_candidate += factor.max(self.floor).ln();

            if compare {
                let agreement: f64 = others
                    .iter()
                    .map(|other| 1.0 - (answer - other.strength(question).value()).abs())
                    .sum();
                let average = agreement / others.len() as f64;
                log_given_other += average.max(self.floor).ln();
            }
        }

        Likelihood {
            given_candidate: log_given_candidate.exp(),
            given_other: log_given_other.exp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerStrength, QuestionId};

    fn q(id: u32) -> QuestionId {
        QuestionId::new(id)
    }

    fn pair() -> (Candidate, Candidate) {
        (
            Candidate::new("X").with_answer(q(1), AnswerStrength::Yes),
            Candidate::new("Y").with_answer(q(1), AnswerStrength::No),
        )
    }

    #[test]
    fn empty_history_is_certain() {
        let (x, y) = pair();
        let lk = LikelihoodModel::default().evaluate(&x, &[], &[&x, &y]);
        assert_eq!(lk.given_candidate, 1.0);
        assert_eq!(lk.given_other, 1.0);
    }

    #[test]
    fn matching_answer_keeps_full_likelihood() {
        let (x, y) = pair();
        let history = [Observation::new(q(1), 1.0)];
        let lk = LikelihoodModel::default().evaluate(&x, &history, &[&x, &y]);
        assert_eq!(lk.given_candidate, 1.0);
        // Y disagrees completely, so the comparison factor hits the floor.
        assert!((lk.given_other - 0.1).abs() < 1e-12);
    }

    #[test]
    fn mismatch_is_scaled_by_certainty() {
        let (x, y) = pair();
        let history = [Observation::new(q(1), 1.0)];
        let lk = LikelihoodModel::default().evaluate(&y, &history, &[&x, &y]);
        // certainty 0.5, mismatch 1.0
        assert!((lk.given_candidate - 0.5).abs() < 1e-12);
        assert!((lk.given_other - 1.0).abs() < 1e-12);
    }

    #[test]
    fn floor_caps_single_answer_penalty() {
        let x = Candidate::new("X").with_answer(q(1), AnswerStrength::No);
        let model = LikelihoodModel::new(0.6);
        let lk = model.evaluate(&x, &[Observation::new(q(1), 1.0)], &[&x]);
        assert!((lk.given_candidate - 0.6).abs() < 1e-12);
    }

    #[test]
    fn lone_candidate_has_no_comparison_term() {
        let (x, _) = pair();
        let history = [Observation::new(q(1), 0.0), Observation::new(q(2), 1.0)];
        let lk = LikelihoodModel::default().evaluate(&x, &history, &[&x]);
        assert_eq!(lk.given_other, 1.0);
        assert!(lk.given_candidate > 0.0 && lk.given_candidate < 1.0);
    }

    #[test]
    fn comparison_averages_over_other_candidates_only() {
        let x = Candidate::new("X").with_answer(q(1), AnswerStrength::Yes);
        let y = Candidate::new("Y").with_answer(q(1), AnswerStrength::Yes);
        let z = Candidate::new("Z").with_answer(q(1), AnswerStrength::ProbablyNot);
        let history = [Observation::new(q(1), 1.0)];
        let lk = LikelihoodModel::default().evaluate(&x, &history, &[&x, &y, &z]);
        // (1.0 + 0.25) / 2
        assert!((lk.given_other - 0.625).abs() < 1e-12);
    }

    #[test]
    fn long_contradictory_history_stays_positive_and_finite() {
        let x = Candidate::new("X");
        let y = Candidate::new("Y").with_answer(q(1), AnswerStrength::Yes);
        let history: Vec<Observation> = (0..200)
            .map(|i| Observation::new(q(1 + i % 3), if i % 2 == 0 { 0.0 } else { 1.0 }))
            .collect();
        for candidate in [&x, &y] {
            let lk = LikelihoodModel::default().evaluate(candidate, &history, &[&x, &y]);
            for value in [lk.given_candidate, lk.given_other] {
                assert!(value.is_finite());
                assert!(value > 0.0 && value <= 1.0);
            }
        }
    }
}
