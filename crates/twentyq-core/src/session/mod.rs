//! One game: history, active set and the turn state machine.
//!
//! A `Session` borrows an immutable [`Catalog`] and owns everything that changes during play.
//! Independent games use independent sessions; nothing here is shared between them.

mod snapshot;

pub use snapshot::SessionSnapshot;

use crate::belief::{BeliefEngine, BeliefError, EngineConfig, Posterior, Verdict};
use crate::belief::metrics::PosteriorMetrics;
use crate::model::{CandidateId, Catalog, History, Observation, QuestionId};
use crate::select::QuestionSelector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Where a session stands between turns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    AwaitingAnswer,
    Won { name: String },
    NoMatch,
}

impl SessionState {
    pub fn is_concluded(&self) -> bool {
        !matches!(self, SessionState::AwaitingAnswer)
    }
}

/// What the host should do after a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Ask { question: QuestionId, text: String },
    Winner { name: String, probability: f64 },
    NoMatch,
}

impl Outcome {
    pub fn is_final(&self) -> bool {
        !matches!(self, Outcome::Ask { .. })
    }
}

/// Result of one turn together with the state it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutput {
    pub outcome: Outcome,
    pub posterior: Posterior,
    pub history: Vec<Observation>,
}

pub struct Session<'a, R = StdRng> {
    catalog: &'a Catalog,
    engine: BeliefEngine,
    history: History,
    active: Vec<CandidateId>,
    state: SessionState,
    last: Option<TurnOutput>,
    rng: R,
}

impl<'a> Session<'a, StdRng> {
    /// Session with default thresholds and an entropy-seeded tie-break source.
    pub fn new(catalog: &'a Catalog) -> Self {
        Self::with_rng(catalog, StdRng::from_entropy())
    }
}

impl<'a, R: Rng> Session<'a, R> {
    pub fn with_rng(catalog: &'a Catalog, rng: R) -> Self {
        Self::with_config(catalog, EngineConfig::default(), rng)
    }

    pub fn with_config(catalog: &'a Catalog, config: EngineConfig, rng: R) -> Self {
        Self {
            catalog,
            engine: BeliefEngine::new(config.sanitized()),
            history: History::new(),
            active: catalog.candidate_ids().collect(),
            state: SessionState::AwaitingAnswer,
            last: None,
            rng,
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn active(&self) -> &[CandidateId] {
        &self.active
    }

    pub fn active_names(&self) -> Vec<&'a str> {
        let catalog = self.catalog;
        self.active
            .iter()
            .filter_map(|id| catalog.candidate(*id))
            .map(|candidate| candidate.name())
            .collect()
    }

    /// Question posed by the most recent turn, if the session is still running.
    pub fn pending_question(&self) -> Option<QuestionId> {
        match self.last.as_ref().map(|turn| &turn.outcome) {
            Some(Outcome::Ask { question, .. }) => Some(*question),
            _ => None,
        }
    }

    /// First turn of a session: no answer to record yet.
    pub fn start(&mut self) -> Result<TurnOutput, SessionError> {
        self.submit(None)
    }

    pub fn answer(&mut self, question: QuestionId, answer: f64) -> Result<TurnOutput, SessionError> {
        self.submit(Some(Observation::new(question, answer)))
    }

    /// Runs one turn.
    ///
    /// Errors leave the session exactly as it was. `None` only evaluates the opening turn;
    /// afterwards it returns the latest turn unchanged. Once concluded, answers are rejected
    /// with [`SessionError::Concluded`].
    pub fn submit(&mut self, input: Option<Observation>) -> Result<TurnOutput, SessionError> {
        if let (None, Some(last)) = (input, self.last.as_ref()) {
            return Ok(last.clone());
        }
        if self.state.is_concluded() {
            return Err(SessionError::Concluded);
        }

        let mut history = self.history.clone();
        if let Some(observation) = input {
            self.validate(&observation)?;
            history.push(observation);
        }

        let answered = history.len();
        let posterior = self
            .engine
            .posteriors(self.catalog, history.as_slice(), &self.active)?;
        let active = self
            .engine
            .survivors(answered, &posterior, &self.active)
            .unwrap_or_else(|| self.active.clone());

        let mut verdict = self.engine.verdict(answered, &posterior, &active);
        let mut next = None;
        if verdict == Verdict::Continue {
            let asked: Vec<QuestionId> = history.iter().map(|o| o.question).collect();
            match QuestionSelector::select(self.catalog, &active, &asked, &mut self.rng)? {
                Some(question) => next = Some(question),
                None => verdict = self.engine.best_of(&posterior, &active),
            }
        }

        let outcome = match (next, verdict) {
            (Some(question), _) => Outcome::Ask {
                question,
                text: self.question_text(question)?,
            },
            (None, Verdict::Winner { id, probability }) => {
                let name = self
                    .catalog
                    .candidate(id)
                    .ok_or(BeliefError::MissingCandidate { id })?
                    .name()
                    .to_string();
                Outcome::Winner { name, probability }
            }
            (None, _) => Outcome::NoMatch,
        };

        let metrics = PosteriorMetrics::from_posterior(&posterior);
        debug!(
            target: "twentyq::session",
            answered,
            active = active.len(),
            top = metrics.top_probability,
            margin = metrics.margin,
            entropy = metrics.entropy,
            "turn evaluated"
        );

        self.state = match &outcome {
            Outcome::Ask { .. } => SessionState::AwaitingAnswer,
            Outcome::Winner { name, probability } => {
                info!(
                    target: "twentyq::session",
                    answered,
                    winner = %name,
                    probability = *probability,
                    "session concluded"
                );
                SessionState::Won { name: name.clone() }
            }
            Outcome::NoMatch => {
                info!(target: "twentyq::session", answered, "session concluded without a match");
                SessionState::NoMatch
            }
        };
        self.history = history;
        self.active = active;

        let turn = TurnOutput {
            outcome,
            posterior,
            history: self.history.as_slice().to_vec(),
        };
        self.last = Some(turn.clone());
        Ok(turn)
    }

    fn validate(&self, observation: &Observation) -> Result<(), SessionError> {
        let answer = observation.answer;
        if !answer.is_finite() || !(0.0..=1.0).contains(&answer) {
            return Err(InvalidInput::AnswerOutOfRange { value: answer }.into());
        }
        if !self.catalog.contains_question(observation.question) {
            return Err(InvalidInput::UnknownQuestion {
                question: observation.question,
            }
            .into());
        }
        if self.history.has_asked(observation.question) {
            return Err(InvalidInput::AlreadyAsked {
                question: observation.question,
            }
            .into());
        }
        Ok(())
    }

    fn question_text(&self, question: QuestionId) -> Result<String, SessionError> {
        self.catalog
            .question_text(question)
            .map(str::to_string)
            .ok_or(SessionError::MissingQuestion { question })
    }
}

/// Caller mistakes in a submitted turn.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("answer {value} is outside [0, 1]")]
    AnswerOutOfRange { value: f64 },
    #[error("question {question} is not in the catalog")]
    UnknownQuestion { question: QuestionId },
    #[error("question {question} has already been answered")]
    AlreadyAsked { question: QuestionId },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
    #[error("session has already concluded")]
    Concluded,
    #[error("engine invariant violated: {0}")]
    Invariant(#[from] BeliefError),
    #[error("selected question {question} has no text in the catalog")]
    MissingQuestion { question: QuestionId },
}

impl SessionError {
    /// True when the caller can fix the input and try again on the same session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SessionError::InvalidInput(_))
    }
}
