//! Guarded rewrite of a `.fastresume` file.
//!
//! `apply` moves through `Loaded -> {NoOp, Aborted(ClientRunning), BackedUp -> Written}`:
//!
//! - the update is computed fully in memory and compared (canonical bytes)
//!   against what is on disk; identical means nothing is touched
//! - the client must not be running before anything is written
//! - the backup is created once and never overwritten, so it always holds
//!   the record as it was before the first remap
//! - the record itself is replaced via a temp file + rename

#![allow(missing_docs)]

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::Serialize;

use crate::core::errors::{RelinkError, Result};
use crate::matcher::resolve::ResolvedMapping;
use crate::platform::process::ProcessProbe;
use crate::resume::record::{RemapPlan, ResumePaths, ResumeRecord};

/// Terminal state of [`ResumeRecordPatcher::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// The record already holds the computed mapping; nothing was written.
    NoOp,
    /// The record was rewritten.
    Written { backup_created: bool },
}

/// Pure computation of the updated record.
pub fn compute_update(existing: &ResumeRecord, mappings: &[ResolvedMapping]) -> Result<ResumeRecord> {
    let plan = RemapPlan::from_mappings(mappings)?;
    existing.with_plan(&plan)
}

/// Applies computed updates to the files of one torrent.
pub struct ResumeRecordPatcher<'a> {
    paths: &'a ResumePaths,
    probe: &'a dyn ProcessProbe,
    process_name: &'a str,
}

impl<'a> ResumeRecordPatcher<'a> {
    #[must_use]
    pub fn new(paths: &'a ResumePaths, probe: &'a dyn ProcessProbe, process_name: &'a str) -> Self {
        Self {
            paths,
            probe,
            process_name,
        }
    }

    /// Read the current `.fastresume` bytes.
    pub fn load(&self) -> Result<Vec<u8>> {
        fs::read(&self.paths.fastresume).map_err(|e| RelinkError::io(&self.paths.fastresume, e))
    }

    /// Whether writing `update` over `existing_bytes` would change anything.
    pub fn would_change(existing_bytes: &[u8], update: &ResumeRecord) -> Result<bool> {
        let existing = ResumeRecord::decode(existing_bytes)?;
        Ok(existing.overlay(update).encode() != existing.encode())
    }

    /// Overlay `update` onto the record in `existing_bytes` and persist it.
    pub fn apply(&self, existing_bytes: &[u8], update: &ResumeRecord) -> Result<ApplyOutcome> {
        let existing = ResumeRecord::decode(existing_bytes)?;
        let merged = existing.overlay(update);
        let encoded = merged.encode();
        if encoded == existing.encode() {
            return Ok(ApplyOutcome::NoOp);
        }

        if self.probe.is_running(self.process_name) {
            return Err(RelinkError::ClientRunning {
                process: self.process_name.to_string(),
            });
        }

        let backup_created = write_backup_once(&self.paths.backup, existing_bytes)?;
        replace_file(&self.paths.fastresume, &encoded)?;
        Ok(ApplyOutcome::Written { backup_created })
    }
}

/// Create `backup` with `bytes` unless it already exists. Returns whether it
/// was created.
fn write_backup_once(backup: &Path, bytes: &[u8]) -> Result<bool> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(backup) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(err) => return Err(RelinkError::io(backup, err)),
    };
    let written = file.write_all(bytes).and_then(|()| file.sync_all());
    if let Err(err) = written {
        let _ = fs::remove_file(backup);
        return Err(RelinkError::io(backup, err));
    }
    Ok(true)
}

fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name).to_path_buf();

    let result = (|| {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)
    })();

    if let Err(err) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(RelinkError::io(path, err));
    }
    Ok(())
}
