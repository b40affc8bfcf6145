//! Per-turn posterior computation, pruning and stop rules.

use super::{EngineConfig, LikelihoodModel};
use crate::model::{Candidate, CandidateId, Catalog, Observation};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, enabled, Level};

/// Probability that one candidate is the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosteriorEntry {
    #[serde(skip)]
    pub id: CandidateId,
    pub name: String,
    pub probability: f64,
}

/// Posterior over the active set, in catalog order.
///
/// Values are not normalised: the not-candidate term is an approximation, so the entries
/// can sum to more or less than one. Each entry is within `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Posterior {
    entries: Vec<PosteriorEntry>,
}

impl Posterior {
    pub fn entries(&self) -> &[PosteriorEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PosteriorEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn probability_of(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.probability)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|entry| entry.probability).sum()
    }

    /// First entry holding the maximum probability.
    pub fn best(&self) -> Option<&PosteriorEntry> {
        self.best_where(|_| true)
    }

    fn best_where<F>(&self, mut keep: F) -> Option<&PosteriorEntry>
    where
        F: FnMut(&PosteriorEntry) -> bool,
    {
        let mut best: Option<&PosteriorEntry> = None;
        for entry in self.entries.iter().filter(|entry| keep(*entry)) {
            match best {
                Some(current) if entry.probability <= current.probability => {}
                _ => best = Some(entry),
            }
        }
        best
    }

    /// Name → probability view for hosts that want a lookup table.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.probability))
            .collect()
    }
}

/// What the engine decided after recomputing the posterior.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    NoMatch,
    Winner { id: CandidateId, probability: f64 },
    Continue,
}

/// Drives the likelihood model across the active set.
#[derive(Debug, Clone)]
pub struct BeliefEngine {
    config: EngineConfig,
    likelihood: LikelihoodModel,
}

impl Default for BeliefEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl BeliefEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            likelihood: LikelihoodModel::from_config(&config),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Recomputes every active candidate's posterior from the full history.
    pub fn posteriors(
        &self,
        catalog: &Catalog,
        history: &[Observation],
        active: &[CandidateId],
    ) -> Result<Posterior, BeliefError> {
        let members = resolve(catalog, active)?;
        let prior = 1.0 / active.len().max(1) as f64;

        let entries = active
            .iter()
            .zip(members.iter())
            .map(|(id, candidate)| {
                let lk = self.likelihood.evaluate(candidate, history, &members);
                let evidence = prior * lk.given_candidate + (1.0 - prior) * lk.given_other;
                let probability =
                    lk.given_candidate * prior / evidence.max(self.config.evidence_floor);
                PosteriorEntry {
                    id: *id,
                    name: candidate.name().to_string(),
                    probability,
                }
            })
            .collect();

        let posterior = Posterior { entries };
        if enabled!(Level::DEBUG) {
            let summary = posterior
                .iter()
                .map(|entry| format!("{}={:.4}", entry.name, entry.probability))
                .collect::<Vec<_>>()
                .join(", ");
            debug!(
                target: "twentyq::belief",
                answered = history.len(),
                active = active.len(),
                posteriors = %summary,
                "posterior recomputed"
            );
        }
        Ok(posterior)
    }

    /// Returns the reduced active set when pruning applies at this history length.
    pub fn survivors(
        &self,
        answered: usize,
        posterior: &Posterior,
        active: &[CandidateId],
    ) -> Option<Vec<CandidateId>> {
        if answered <= self.config.prune_after {
            return None;
        }
        let kept: Vec<CandidateId> = active
            .iter()
            .copied()
            .filter(|id| {
                posterior
                    .iter()
                    .find(|entry| entry.id == *id)
                    .is_some_and(|entry| entry.probability >= self.config.prune_threshold)
            })
            .collect();
        if kept.len() != active.len() {
            debug!(
                target: "twentyq::belief",
                answered,
                before = active.len(),
                after = kept.len(),
                "active set pruned"
            );
        }
        Some(kept)
    }

    /// Applies the stop rules in priority order.
    pub fn verdict(&self, answered: usize, posterior: &Posterior, active: &[CandidateId]) -> Verdict {
        if active.is_empty() {
            return Verdict::NoMatch;
        }
        let confident = posterior
            .iter()
            .filter(|entry| active.contains(&entry.id))
            .any(|entry| entry.probability > self.config.confidence_threshold);
        if answered >= self.config.max_questions || confident {
            return self.best_of(posterior, active);
        }
        Verdict::Continue
    }

    /// Best active candidate; used for the stop rules and when questions run out.
    pub fn best_of(&self, posterior: &Posterior, active: &[CandidateId]) -> Verdict {
        match posterior.best_where(|entry| active.contains(&entry.id)) {
            Some(entry) => Verdict::Winner {
                id: entry.id,
                probability: entry.probability,
            },
            None => Verdict::NoMatch,
        }
    }
}

pub(crate) fn resolve<'a>(
    catalog: &'a Catalog,
    active: &[CandidateId],
) -> Result<Vec<&'a Candidate>, BeliefError> {
    active
        .iter()
        .map(|id| {
            catalog
                .candidate(*id)
                .ok_or(BeliefError::MissingCandidate { id: *id })
        })
        .collect()
}

/// Failures that indicate a broken caller contract rather than bad user input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BeliefError {
    #[error("active candidate {id} is not present in the catalog")]
    MissingCandidate { id: CandidateId },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerStrength, QuestionId};
    use std::collections::BTreeMap;

    fn q(id: u32) -> QuestionId {
        QuestionId::new(id)
    }

    fn catalog(candidates: Vec<Candidate>, questions: u32) -> Catalog {
        let questions: BTreeMap<QuestionId, String> = (1..=questions)
            .map(|id| (q(id), format!("question {id}")))
            .collect();
        Catalog::new(questions, candidates).unwrap()
    }

    fn disjoint_pair() -> Catalog {
        catalog(
            vec![
                Candidate::new("X").with_answer(q(1), AnswerStrength::Yes),
                Candidate::new("Y").with_answer(q(1), AnswerStrength::No),
            ],
            1,
        )
    }

    #[test]
    fn empty_history_gives_uniform_prior() {
        let catalog = catalog(
            vec![Candidate::new("A"), Candidate::new("B"), Candidate::new("C")],
            1,
        );
        let active: Vec<_> = catalog.candidate_ids().collect();
        let posterior = BeliefEngine::default()
            .posteriors(&catalog, &[], &active)
            .unwrap();
        for entry in posterior.iter() {
            assert!((entry.probability - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn decisive_answer_favours_matching_candidate() {
        let catalog = disjoint_pair();
        let active: Vec<_> = catalog.candidate_ids().collect();
        let history = [Observation::new(q(1), 1.0)];
        let posterior = BeliefEngine::default()
            .posteriors(&catalog, &history, &active)
            .unwrap();
        let x = posterior.probability_of("X").unwrap();
        let y = posterior.probability_of("Y").unwrap();
        // X: 0.5 / (0.5 + 0.5 * 0.1); Y: 0.25 / (0.25 + 0.5)
        assert!((x - 0.5 / 0.55).abs() < 1e-9);
        assert!((y - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(posterior.best().unwrap().name, "X");
    }

    #[test]
    fn posteriors_stay_within_unit_interval() {
        let catalog = catalog(
            vec![
                Candidate::new("A").with_answer(q(1), AnswerStrength::Yes),
                Candidate::new("B").with_answer(q(2), AnswerStrength::No),
                Candidate::new("C")
                    .with_answer(q(1), AnswerStrength::ProbablyNot)
                    .with_answer(q(2), AnswerStrength::Probably),
            ],
            2,
        );
        let active: Vec<_> = catalog.candidate_ids().collect();
        let history = [Observation::new(q(1), 0.9), Observation::new(q(2), 0.1)];
        let posterior = BeliefEngine::default()
            .posteriors(&catalog, &history, &active)
            .unwrap();
        for entry in posterior.iter() {
            assert!((0.0..=1.0).contains(&entry.probability), "{entry:?}");
        }
    }

    #[test]
    fn recomputation_is_idempotent() {
        let catalog = disjoint_pair();
        let active: Vec<_> = catalog.candidate_ids().collect();
        let history = [Observation::new(q(1), 0.75)];
        let engine = BeliefEngine::default();
        let first = engine.posteriors(&catalog, &history, &active).unwrap();
        let second = engine.posteriors(&catalog, &history, &active).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn pruning_waits_until_past_threshold_turn() {
        let catalog = disjoint_pair();
        let active: Vec<_> = catalog.candidate_ids().collect();
        let engine = BeliefEngine::default();
        let posterior = Posterior {
            entries: vec![
                PosteriorEntry {
                    id: active[0],
                    name: "X".into(),
                    probability: 0.9,
                },
                PosteriorEntry {
                    id: active[1],
                    name: "Y".into(),
                    probability: 0.01,
                },
            ],
        };
        assert_eq!(engine.survivors(15, &posterior, &active), None);
        assert_eq!(
            engine.survivors(16, &posterior, &active),
            Some(vec![active[0]])
        );
    }

    #[test]
    fn verdict_priorities() {
        let catalog = disjoint_pair();
        let active: Vec<_> = catalog.candidate_ids().collect();
        let engine = BeliefEngine::default();
        let posterior = Posterior {
            entries: vec![
                PosteriorEntry {
                    id: active[0],
                    name: "X".into(),
                    probability: 0.4,
                },
                PosteriorEntry {
                    id: active[1],
                    name: "Y".into(),
                    probability: 0.4,
                },
            ],
        };
        assert_eq!(engine.verdict(3, &posterior, &[]), Verdict::NoMatch);
        assert_eq!(engine.verdict(3, &posterior, &active), Verdict::Continue);
        // Tied at the limit: first in catalog order wins.
        assert_eq!(
            engine.verdict(20, &posterior, &active),
            Verdict::Winner {
                id: active[0],
                probability: 0.4
            }
        );
    }

    #[test]
    fn confident_candidate_concludes_early() {
        let catalog = disjoint_pair();
        let active: Vec<_> = catalog.candidate_ids().collect();
        let posterior = Posterior {
            entries: vec![
                PosteriorEntry {
                    id: active[0],
                    name: "X".into(),
                    probability: 0.2,
                },
                PosteriorEntry {
                    id: active[1],
                    name: "Y".into(),
                    probability: 0.96,
                },
            ],
        };
        assert_eq!(
            BeliefEngine::default().verdict(1, &posterior, &active),
            Verdict::Winner {
                id: active[1],
                probability: 0.96
            }
        );
    }

    #[test]
    fn unknown_active_member_is_reported() {
        let catalog = disjoint_pair();
        let bogus = CandidateId::new(7);
        let err = BeliefEngine::default()
            .posteriors(&catalog, &[], &[bogus])
            .unwrap_err();
        assert_eq!(err, BeliefError::MissingCandidate { id: bogus });
    }
}
