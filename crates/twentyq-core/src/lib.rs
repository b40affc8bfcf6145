#![deny(warnings)]
pub mod belief;
pub mod model;
pub mod select;
pub mod session;

pub use belief::{BeliefEngine, EngineConfig, Likelihood, LikelihoodModel, Posterior};
pub use model::{
    AnswerPreset, AnswerStrength, Candidate, CandidateId, Catalog, CatalogError, History,
    Observation, QuestionId,
};
pub use select::{QuestionScore, QuestionSelector};
pub use session::{Outcome, Session, SessionError, SessionSnapshot, SessionState, TurnOutput};

pub struct EngineInfo;

impl EngineInfo {
    pub const fn name() -> &'static str {
        "twentyq"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::EngineInfo;

    #[test]
    fn exposes_static_metadata() {
        assert_eq!(EngineInfo::name(), "twentyq");
        assert!(!EngineInfo::version().is_empty());
    }
}
