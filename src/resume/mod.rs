//! Resume record (`.fastresume`) model and guarded patching.

pub mod patcher;
pub mod record;

pub use patcher::{ApplyOutcome, ResumeRecordPatcher, compute_update};
pub use record::{RemapPlan, ResumePaths, ResumeRecord};
