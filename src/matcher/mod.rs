//! Matching engine: declared torrent files against the disk index.

pub mod policy;
pub mod resolve;
pub mod similarity;

pub use policy::AmbiguityPolicy;
pub use resolve::{MatchOutcome, Prompter, Resolution, ResolvedMapping, resolve};
