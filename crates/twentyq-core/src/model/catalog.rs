//! Read-only catalog of questions and candidates, loaded once per process.

use super::candidate::{Candidate, CandidateId};
use super::question::QuestionId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// On-disk layout of a catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    questions: BTreeMap<QuestionId, String>,
    characters: Vec<Candidate>,
}

/// Immutable question texts and candidate list.
#[derive(Debug, Clone)]
pub struct Catalog {
    questions: BTreeMap<QuestionId, String>,
    candidates: Vec<Candidate>,
}

impl Catalog {
    /// Builds a catalog from in-memory parts, applying the same checks as file loading.
    pub fn new(
        questions: BTreeMap<QuestionId, String>,
        candidates: Vec<Candidate>,
    ) -> Result<Self, CatalogError> {
        validate(&questions, &candidates)?;
        Ok(Self {
            questions,
            candidates,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.questions, file.characters)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CatalogError::Read {
            source,
            path: path.to_path_buf(),
        })?;
        let parsed: CatalogFile = serde_json::from_reader(BufReader::new(file))?;
        Self::new(parsed.questions, parsed.characters)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&CatalogFile {
            questions: self.questions.clone(),
            characters: self.candidates.clone(),
        })
    }

    pub fn question_text(&self, id: QuestionId) -> Option<&str> {
        self.questions.get(&id).map(String::as_str)
    }

    pub fn contains_question(&self, id: QuestionId) -> bool {
        self.questions.contains_key(&id)
    }

    pub fn question_ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.questions.keys().copied()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates.get(id.index())
    }

    /// Candidate identifiers in catalog order.
    pub fn candidate_ids(&self) -> impl Iterator<Item = CandidateId> + '_ {
        (0..self.candidates.len()).map(CandidateId::new)
    }

    pub fn find(&self, name: &str) -> Option<CandidateId> {
        self.candidates
            .iter()
            .position(|candidate| candidate.name() == name)
            .map(CandidateId::new)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

fn validate(
    questions: &BTreeMap<QuestionId, String>,
    candidates: &[Candidate],
) -> Result<(), CatalogError> {
    if questions.is_empty() {
        return Err(CatalogError::NoQuestions);
    }
    if candidates.is_empty() {
        return Err(CatalogError::NoCandidates);
    }

    let mut seen = HashSet::new();
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.name().trim().is_empty() {
            return Err(CatalogError::BlankName { index });
        }
        if !seen.insert(candidate.name()) {
            return Err(CatalogError::DuplicateName {
                name: candidate.name().to_string(),
            });
        }
        if let Some(question) = candidate
            .answers()
            .keys()
            .find(|question| !questions.contains_key(question))
        {
            return Err(CatalogError::UnknownQuestion {
                candidate: candidate.name().to_string(),
                question: *question,
            });
        }
    }
    Ok(())
}

/// Errors surfaced while loading or validating a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog declares no questions")]
    NoQuestions,
    #[error("catalog declares no characters")]
    NoCandidates,
    #[error("character at index {index} has an empty name")]
    BlankName { index: usize },
    #[error("character '{name}' defined more than once")]
    DuplicateName { name: String },
    #[error("character '{candidate}' answers undeclared question {question}")]
    UnknownQuestion {
        candidate: String,
        question: QuestionId,
    },
}
