//! Interactive terminal helpers for the `qbt-relink` binary.

pub mod prompt;
