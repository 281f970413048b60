//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use qbt_relink::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{RelinkError, Result};

// Codec
pub use crate::codec::bencode::{Value, decode, encode};

// Scanner
pub use crate::scanner::index::{DiskFile, DiskIndex};
pub use crate::scanner::walker::{DirectoryWalker, WalkerConfig};

// Torrent
pub use crate::torrent::hash::InfoHash;
pub use crate::torrent::manifest::DeclaredFile;

// Matcher
pub use crate::matcher::policy::AmbiguityPolicy;
pub use crate::matcher::resolve::{MatchOutcome, Prompter, Resolution, ResolvedMapping, resolve};

// Resume
pub use crate::resume::patcher::{ApplyOutcome, ResumeRecordPatcher, compute_update};
pub use crate::resume::record::{RemapPlan, ResumePaths, ResumeRecord};

// Platform
pub use crate::platform::process::{ProcessProbe, SystemProcessProbe};
