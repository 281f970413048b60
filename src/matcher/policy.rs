//! Ambiguity policies: what to do when one declared file has several disk candidates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Strategy for a declared file that matches more than one disk file.
///
/// The numeric codes are the values accepted by `--fix-duplicates`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AmbiguityPolicy {
    /// Fail the run, listing every ambiguous file and its candidates.
    #[serde(rename = "reject")]
    RejectOnAmbiguity,
    /// Ask the operator to pick a candidate by index.
    #[serde(rename = "prompt")]
    InteractivePrompt,
    /// Pick the candidate whose file name is closest to the declared name.
    #[serde(rename = "fuzzy")]
    FuzzyAutomatic,
    /// Fuzzy pick, then ask for one confirmation covering all picks.
    #[serde(rename = "fuzzy-confirm")]
    FuzzyWithConfirmation,
}

impl AmbiguityPolicy {
    pub const ALL: [Self; 4] = [
        Self::RejectOnAmbiguity,
        Self::InteractivePrompt,
        Self::FuzzyAutomatic,
        Self::FuzzyWithConfirmation,
    ];

    /// Numeric selector used on the command line.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::RejectOnAmbiguity => 0,
            Self::InteractivePrompt => 1,
            Self::FuzzyAutomatic => 2,
            Self::FuzzyWithConfirmation => 3,
        }
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::RejectOnAmbiguity),
            1 => Some(Self::InteractivePrompt),
            2 => Some(Self::FuzzyAutomatic),
            3 => Some(Self::FuzzyWithConfirmation),
            _ => None,
        }
    }

    /// Config/log label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RejectOnAmbiguity => "reject",
            Self::InteractivePrompt => "prompt",
            Self::FuzzyAutomatic => "fuzzy",
            Self::FuzzyWithConfirmation => "fuzzy-confirm",
        }
    }

    /// Whether this policy needs an interactive collaborator.
    #[must_use]
    pub const fn is_interactive(self) -> bool {
        matches!(self, Self::InteractivePrompt | Self::FuzzyWithConfirmation)
    }

    #[must_use]
    pub const fn is_fuzzy(self) -> bool {
        matches!(self, Self::FuzzyAutomatic | Self::FuzzyWithConfirmation)
    }
}

impl fmt::Display for AmbiguityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AmbiguityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim().to_ascii_lowercase();
        if let Ok(code) = raw.parse::<u8>() {
            return Self::from_code(code).ok_or_else(|| format!("policy code must be 0-3, got {code}"));
        }
        Self::ALL
            .into_iter()
            .find(|p| p.label() == raw)
            .ok_or_else(|| {
                format!("unknown policy {s:?}; expected one of reject, prompt, fuzzy, fuzzy-confirm or 0-3")
            })
    }
}
