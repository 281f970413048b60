//! QBR-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::codec::bencode::DecodeError;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, RelinkError>;

/// One ambiguity or collision reported by [`RelinkError::DuplicateResolution`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Declared torrent path, or the shared disk path when two declared
    /// files converge on the same disk file.
    pub subject: String,
    /// Competing paths (disk candidates, or the declared files that collide).
    pub contenders: Vec<String>,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" -> [{}]", self.subject, self.contenders.join(", "))
    }
}

fn join_paths(paths: &[String]) -> String {
    paths
        .iter()
        .map(|p| format!("\"{p}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_conflicts(conflicts: &[Conflict]) -> String {
    conflicts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level error type for qbt-relink.
#[derive(Debug, Error)]
pub enum RelinkError {
    #[error("[QBR-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[QBR-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[QBR-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[QBR-1101] invalid torrent hash {input:?}: expected 40 hexadecimal characters")]
    InvalidHash { input: String },

    #[error("[QBR-2001] scan of {path} failed: {details}")]
    Scan { path: PathBuf, details: String },

    #[error("[QBR-2002] malformed torrent manifest: {details}")]
    MalformedManifest { details: String },

    #[error(
        "[QBR-2003] no disk match for {}; every file must be present under the search directory",
        join_paths(.paths)
    )]
    UnmatchedFile { paths: Vec<String> },

    #[error(
        "[QBR-2004] ambiguous or duplicate resolution: {}; rerun with --fix-duplicates to choose a policy",
        join_conflicts(.conflicts)
    )]
    DuplicateResolution { conflicts: Vec<Conflict> },

    #[error("[QBR-2005] invalid selection {index} for \"{path}\" ({count} candidates)")]
    InvalidSelection {
        path: String,
        index: usize,
        count: usize,
    },

    #[error("[QBR-2101] resume record codec failure in {context}: {details}")]
    Codec {
        context: &'static str,
        details: String,
    },

    #[error("[QBR-2102] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[QBR-3001] {process} is running, close it before rewriting the resume record")]
    ClientRunning { process: String },

    #[error("[QBR-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RelinkError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "QBR-1001",
            Self::MissingConfig { .. } => "QBR-1002",
            Self::ConfigParse { .. } => "QBR-1003",
            Self::InvalidHash { .. } => "QBR-1101",
            Self::Scan { .. } => "QBR-2001",
            Self::MalformedManifest { .. } => "QBR-2002",
            Self::UnmatchedFile { .. } => "QBR-2003",
            Self::DuplicateResolution { .. } => "QBR-2004",
            Self::InvalidSelection { .. } => "QBR-2005",
            Self::Codec { .. } => "QBR-2101",
            Self::Serialization { .. } => "QBR-2102",
            Self::ClientRunning { .. } => "QBR-3001",
            Self::Io { .. } => "QBR-3002",
        }
    }

    /// Whether the failure stems from user input or on-disk layout (as opposed
    /// to an environment/runtime failure).
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::ConfigParse { .. }
                | Self::InvalidHash { .. }
                | Self::UnmatchedFile { .. }
                | Self::DuplicateResolution { .. }
                | Self::InvalidSelection { .. }
                | Self::ClientRunning { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for manifest shape errors.
    #[must_use]
    pub fn malformed(details: impl Into<String>) -> Self {
        Self::MalformedManifest {
            details: details.into(),
        }
    }
}

impl From<DecodeError> for RelinkError {
    fn from(value: DecodeError) -> Self {
        Self::Codec {
            context: "bencode",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for RelinkError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for RelinkError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
