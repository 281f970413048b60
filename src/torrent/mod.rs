//! Torrent-side inputs: the info-hash identifier and the declared file list.

pub mod hash;
pub mod manifest;
