#![forbid(unsafe_code)]

//! qbt-relink: re-point a qBittorrent resume record at renamed files.
//!
//! Given a torrent's info-hash and a directory holding its (renamed or
//! reorganized) payload, the crate:
//! 1. **Indexes the disk** by size and extension ([`scanner`])
//! 2. **Reads the torrent** to list the files it declares ([`torrent`])
//! 3. **Matches** every declared file to exactly one disk file ([`matcher`])
//! 4. **Rewrites the `.fastresume`** with a new save path and per-file
//!    mappings, behind a backup and a client-running guard ([`resume`])
//!
//! # Library usage
//!
//! ```rust,no_run
//! use qbt_relink::prelude::*;
//! ```

pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
pub mod codec;
pub mod core;
pub mod logger;
pub mod matcher;
pub mod platform;
pub mod resume;
pub mod scanner;
pub mod torrent;
