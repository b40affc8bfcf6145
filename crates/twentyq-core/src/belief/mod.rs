//! Posterior tracking over the active candidate set.
//!
//! This module is composed of:
//! - `config`: tunable thresholds and floors (`EngineConfig`), overridable from the environment.
//! - `likelihood`: log-domain likelihood of an answer history for one candidate.
//! - `posterior`: the per-turn posterior computation, pruning and stop rules.
//! - `metrics`: coarse summaries of a posterior for logging.

mod config;
mod likelihood;
pub mod metrics;
mod posterior;

pub use config::EngineConfig;
pub use likelihood::{Likelihood, LikelihoodModel};
pub use posterior::{BeliefEngine, BeliefError, Posterior, PosteriorEntry, Verdict};
pub(crate) use posterior::resolve;
