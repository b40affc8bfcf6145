//! Catalog, answer and history types shared by the inference engine.

pub mod answer;
pub mod candidate;
pub mod catalog;
pub mod history;
pub mod question;

pub use answer::{AnswerPreset, AnswerStrength};
pub use candidate::{Candidate, CandidateId};
pub use catalog::{Catalog, CatalogError};
pub use history::{History, Observation};
pub use question::QuestionId;
