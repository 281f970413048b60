//! Disk inventory: parallel walker and the size/extension index built from it.

pub mod index;
pub mod walker;
