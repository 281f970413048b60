//! Declared-file to disk-file resolution.
//!
//! Resolution runs in three passes over the declared files:
//!
//! 1. Every declared file collects its candidates from the [`DiskIndex`]
//!    (same size, same extension). If any declared file has none, the run
//!    stops with [`RelinkError::UnmatchedFile`] before anybody is asked
//!    anything.
//! 2. Declared files with several candidates are narrowed to one according
//!    to the [`AmbiguityPolicy`].
//! 3. The chosen disk paths must be pairwise distinct; two declared files
//!    converging on one disk file is always a [`RelinkError::DuplicateResolution`].

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::errors::{Conflict, RelinkError, Result};
use crate::matcher::policy::AmbiguityPolicy;
use crate::matcher::similarity::best_candidate;
use crate::scanner::index::{DiskFile, DiskIndex};
use crate::torrent::manifest::DeclaredFile;

/// Interactive decisions the matcher cannot make on its own.
pub trait Prompter {
    /// Zero-based index into `declared.candidates`.
    fn choose_index(&mut self, declared: &DeclaredFile) -> Result<usize>;

    /// Yes/no answer to `question`.
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// One declared file and the disk file it was resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMapping {
    pub declared: DeclaredFile,
    pub chosen: DiskFile,
}

/// Successful resolution, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub mappings: Vec<ResolvedMapping>,
    /// Indices into `mappings` whose disk file was picked by the policy
    /// rather than being the only candidate.
    pub disambiguated: Vec<usize>,
}

impl Resolution {
    /// Mappings that had several candidates.
    pub fn disambiguated_mappings(&self) -> impl Iterator<Item = &ResolvedMapping> {
        self.disambiguated.iter().map(|&idx| &self.mappings[idx])
    }
}

/// Result of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Resolved(Resolution),
    /// The operator declined the fuzzy picks. Not an error.
    Cancelled,
}

/// Resolve every declared file to exactly one disk file.
///
/// `prompter` is required by [`AmbiguityPolicy::InteractivePrompt`] and
/// [`AmbiguityPolicy::FuzzyWithConfirmation`], and only consulted when at
/// least one declared file is ambiguous.
pub fn resolve(
    mut declared: Vec<DeclaredFile>,
    index: &DiskIndex,
    policy: AmbiguityPolicy,
    prompter: Option<&mut dyn Prompter>,
) -> Result<MatchOutcome> {
    for file in &mut declared {
        file.candidates = index.query(file.declared_size, &file.extension());
    }

    let unmatched: Vec<String> = declared
        .iter()
        .filter(|file| file.candidates.is_empty())
        .map(|file| file.relative_path.clone())
        .collect();
    if !unmatched.is_empty() {
        return Err(RelinkError::UnmatchedFile { paths: unmatched });
    }

    let ambiguous: Vec<usize> = declared
        .iter()
        .enumerate()
        .filter(|(_, file)| file.candidates.len() > 1)
        .map(|(idx, _)| idx)
        .collect();

    if !ambiguous.is_empty() {
        match policy {
            AmbiguityPolicy::RejectOnAmbiguity => {
                let conflicts = ambiguous
                    .iter()
                    .map(|&idx| candidate_conflict(&declared[idx]))
                    .collect();
                return Err(RelinkError::DuplicateResolution { conflicts });
            }
            AmbiguityPolicy::InteractivePrompt => {
                let prompter = require_prompter(prompter, policy)?;
                for &idx in &ambiguous {
                    let file = &mut declared[idx];
                    let choice = prompter.choose_index(file)?;
                    keep_only(file, choice)?;
                }
            }
            AmbiguityPolicy::FuzzyAutomatic => {
                for &idx in &ambiguous {
                    keep_closest(&mut declared[idx]);
                }
            }
            AmbiguityPolicy::FuzzyWithConfirmation => {
                let prompter = require_prompter(prompter, policy)?;
                for &idx in &ambiguous {
                    keep_closest(&mut declared[idx]);
                }
                let question = confirmation_question(&declared, &ambiguous);
                if !prompter.confirm(&question)? {
                    return Ok(MatchOutcome::Cancelled);
                }
            }
        }
    }

    let mappings = into_mappings(declared)?;
    check_unique_targets(&mappings)?;
    Ok(MatchOutcome::Resolved(Resolution {
        mappings,
        disambiguated: ambiguous,
    }))
}

fn require_prompter(
    prompter: Option<&mut dyn Prompter>,
    policy: AmbiguityPolicy,
) -> Result<&mut dyn Prompter> {
    prompter.ok_or_else(|| RelinkError::InvalidConfig {
        details: format!("ambiguity policy '{policy}' needs an interactive prompt"),
    })
}

fn candidate_conflict(file: &DeclaredFile) -> Conflict {
    Conflict {
        subject: file.relative_path.clone(),
        contenders: file
            .candidates
            .iter()
            .map(|c| c.absolute_path.display().to_string())
            .collect(),
    }
}

fn keep_only(file: &mut DeclaredFile, choice: usize) -> Result<()> {
    if choice >= file.candidates.len() {
        return Err(RelinkError::InvalidSelection {
            path: file.relative_path.clone(),
            index: choice,
            count: file.candidates.len(),
        });
    }
    let chosen = file.candidates.swap_remove(choice);
    file.candidates = vec![chosen];
    Ok(())
}

fn keep_closest(file: &mut DeclaredFile) {
    if let Some(best) = best_candidate(file.base_name(), &file.candidates) {
        let chosen = file.candidates.swap_remove(best);
        file.candidates = vec![chosen];
    }
}

fn confirmation_question(declared: &[DeclaredFile], ambiguous: &[usize]) -> String {
    let mut question = String::from("Fuzzy matches:\n");
    for &idx in ambiguous {
        let file = &declared[idx];
        if let Some(chosen) = file.candidates.first() {
            let _ = writeln!(
                question,
                "  {} -> {}",
                file.relative_path,
                chosen.absolute_path.display()
            );
        }
    }
    question.push_str("Apply these matches?");
    question
}

fn into_mappings(declared: Vec<DeclaredFile>) -> Result<Vec<ResolvedMapping>> {
    let mut mappings = Vec::with_capacity(declared.len());
    let mut leftover = Vec::new();
    for file in declared {
        if file.candidates.len() == 1 {
            let chosen = file.candidates[0].clone();
            mappings.push(ResolvedMapping {
                declared: file,
                chosen,
            });
        } else {
            leftover.push(candidate_conflict(&file));
        }
    }
    if leftover.is_empty() {
        Ok(mappings)
    } else {
        Err(RelinkError::DuplicateResolution {
            conflicts: leftover,
        })
    }
}

fn check_unique_targets(mappings: &[ResolvedMapping]) -> Result<()> {
    let mut claims: BTreeMap<&PathBuf, Vec<String>> = BTreeMap::new();
    for mapping in mappings {
        claims
            .entry(&mapping.chosen.absolute_path)
            .or_default()
            .push(mapping.declared.relative_path.clone());
    }
    let conflicts: Vec<Conflict> = claims
        .into_iter()
        .filter(|(_, declared)| declared.len() > 1)
        .map(|(disk, declared)| Conflict {
            subject: disk.display().to_string(),
            contenders: declared,
        })
        .collect();
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(RelinkError::DuplicateResolution { conflicts })
    }
}
