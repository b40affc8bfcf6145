use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Canonical answer strength stored in the catalog for a candidate/question pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
#[repr(u8)]
pub enum AnswerStrength {
    No = 0,
    ProbablyNot = 1,
    Unknown = 2,
    Probably = 3,
    Yes = 4,
}

impl AnswerStrength {
    pub const ALL: [AnswerStrength; 5] = [
        AnswerStrength::No,
        AnswerStrength::ProbablyNot,
        AnswerStrength::Unknown,
        AnswerStrength::Probably,
        AnswerStrength::Yes,
    ];

    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(AnswerStrength::No),
            1 => Some(AnswerStrength::ProbablyNot),
            2 => Some(AnswerStrength::Unknown),
            3 => Some(AnswerStrength::Probably),
            4 => Some(AnswerStrength::Yes),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn value(self) -> f64 {
        match self {
            AnswerStrength::No => 0.0,
            AnswerStrength::ProbablyNot => 0.25,
            AnswerStrength::Unknown => 0.5,
            AnswerStrength::Probably => 0.75,
            AnswerStrength::Yes => 1.0,
        }
    }

    /// Maps an exact canonical value back to its strength; anything off-grid is rejected.
    pub fn from_value(value: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|strength| strength.value() == value)
    }
}

impl Default for AnswerStrength {
    fn default() -> Self {
        AnswerStrength::Unknown
    }
}

impl TryFrom<f64> for AnswerStrength {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| {
            format!("answer strength {value} is not one of 0, 0.25, 0.5, 0.75, 1")
        })
    }
}

impl From<AnswerStrength> for f64 {
    fn from(strength: AnswerStrength) -> Self {
        strength.value()
    }
}

impl fmt::Display for AnswerStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Named answers offered to people typing at a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerPreset {
    Yes,
    Probably,
    DontKnow,
    ProbablyNot,
    No,
}

impl AnswerPreset {
    pub const ALL: [AnswerPreset; 5] = [
        AnswerPreset::Yes,
        AnswerPreset::Probably,
        AnswerPreset::DontKnow,
        AnswerPreset::ProbablyNot,
        AnswerPreset::No,
    ];

    pub const fn value(self) -> f64 {
        match self {
            AnswerPreset::Yes => 1.0,
            AnswerPreset::Probably => 0.75,
            AnswerPreset::DontKnow => 0.5,
            AnswerPreset::ProbablyNot => 0.25,
            AnswerPreset::No => 0.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            AnswerPreset::Yes => "yes",
            AnswerPreset::Probably => "probably",
            AnswerPreset::DontKnow => "don't know",
            AnswerPreset::ProbablyNot => "probably not",
            AnswerPreset::No => "no",
        }
    }

    /// Parses a preset word/abbreviation or a bare number into an answer value.
    ///
    /// Numbers are returned as typed; range checking is left to the session so that the
    /// caller sees the same `InvalidInput` error whichever path produced the value.
    pub fn parse_value(raw: &str) -> Option<f64> {
        if let Ok(preset) = raw.parse::<AnswerPreset>() {
            return Some(preset.value());
        }
        raw.trim().parse::<f64>().ok()
    }
}

impl FromStr for AnswerPreset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Ok(AnswerPreset::Yes),
            "p" | "py" | "probably" => Ok(AnswerPreset::Probably),
            "?" | "dk" | "idk" | "unsure" | "don't know" | "dont know" => {
                Ok(AnswerPreset::DontKnow)
            }
            "pn" | "probably not" => Ok(AnswerPreset::ProbablyNot),
            "n" | "no" => Ok(AnswerPreset::No),
            _ => Err(()),
        }
    }
}
