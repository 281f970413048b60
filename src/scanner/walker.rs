//! Parallel directory walker that inventories every regular file under a root.
//!
//! Unlike a best-effort crawler, the walker is all-or-nothing: the first
//! unreadable directory or entry aborts the walk with a scan error, because a
//! partial inventory could make a renamed file look missing (or make a wrong
//! file look unique).

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel as channel;
use parking_lot::Mutex;

use crate::core::errors::{RelinkError, Result};
use crate::scanner::index::DiskFile;

/// Walker configuration derived from `ScannerConfig`.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    pub root: PathBuf,
    pub follow_symlinks: bool,
    pub parallelism: usize,
}

/// One result pushed by a worker thread.
type WalkItem = Result<DiskFile>;

/// Shared state between worker threads.
struct WalkState {
    in_flight: AtomicUsize,
    aborted: AtomicBool,
    /// Canonical directories already queued; only consulted when following
    /// symlinks, where the same directory can be reached twice.
    visited: Mutex<HashSet<PathBuf>>,
}

/// Parallel file walker.
///
/// Safety invariants:
/// - Symlinks to files are always indexed under the link's own path
/// - Symlinked directories are only entered when `follow_symlinks` is set,
///   and then each canonical directory is walked at most once
/// - Any IO failure, dangling symlinks included, stops all workers and is
///   returned to the caller
pub struct DirectoryWalker {
    config: WalkerConfig,
}

impl DirectoryWalker {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Walk the root and return every regular file, sorted by path.
    pub fn walk(&self) -> Result<Vec<DiskFile>> {
        let root = &self.config.root;
        let meta = fs::metadata(root).map_err(|e| scan_error(root, &e))?;
        if !meta.is_dir() {
            return Err(RelinkError::Scan {
                path: root.clone(),
                details: "not a directory".to_string(),
            });
        }

        let parallelism = self.config.parallelism.max(1);
        let (work_tx, work_rx) = channel::unbounded::<PathBuf>();
        let (result_tx, result_rx) = channel::unbounded::<WalkItem>();

        let state = Arc::new(WalkState {
            in_flight: AtomicUsize::new(1),
            aborted: AtomicBool::new(false),
            visited: Mutex::new(HashSet::new()),
        });
        if self.config.follow_symlinks {
            let canonical = fs::canonicalize(root).map_err(|e| scan_error(root, &e))?;
            state.visited.lock().insert(canonical);
        }
        let _ = work_tx.send(root.clone());

        let mut handles = Vec::with_capacity(parallelism);
        for _ in 0..parallelism {
            let work_rx = work_rx.clone();
            let work_tx = work_tx.clone();
            let result_tx = result_tx.clone();
            let state = Arc::clone(&state);
            let follow_symlinks = self.config.follow_symlinks;

            handles.push(thread::spawn(move || {
                walker_thread(&work_rx, &work_tx, &result_tx, &state, follow_symlinks);
            }));
        }
        // Workers hold the only remaining senders; the result channel closes
        // once all of them exit.
        drop(work_tx);
        drop(result_tx);

        let mut files = Vec::new();
        let mut first_error = None;
        for item in result_rx {
            match item {
                Ok(file) => files.push(file),
                Err(err) => {
                    state.aborted.store(true, Ordering::Release);
                    first_error.get_or_insert(err);
                }
            }
        }
        for handle in handles {
            let _ = handle.join();
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        files.sort_by(|a, b| a.absolute_path.cmp(&b.absolute_path));
        Ok(files)
    }
}

/// Worker loop: pull a directory, list it, push files and subdirectories.
fn walker_thread(
    work_rx: &channel::Receiver<PathBuf>,
    work_tx: &channel::Sender<PathBuf>,
    result_tx: &channel::Sender<WalkItem>,
    state: &WalkState,
    follow_symlinks: bool,
) {
    loop {
        if state.aborted.load(Ordering::Acquire) {
            return;
        }
        match work_rx.recv_timeout(Duration::from_millis(20)) {
            Ok(dir) => {
                if let Err(err) = process_directory(&dir, work_tx, result_tx, state, follow_symlinks)
                {
                    state.aborted.store(true, Ordering::Release);
                    let _ = result_tx.send(Err(err));
                }
                state.in_flight.fetch_sub(1, Ordering::AcqRel);
            }
            Err(channel::RecvTimeoutError::Timeout) => {
                if state.in_flight.load(Ordering::Acquire) == 0 {
                    return;
                }
            }
            Err(channel::RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn process_directory(
    dir: &Path,
    work_tx: &channel::Sender<PathBuf>,
    result_tx: &channel::Sender<WalkItem>,
    state: &WalkState,
    follow_symlinks: bool,
) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| scan_error(dir, &e))?;

    for entry_result in entries {
        if state.aborted.load(Ordering::Acquire) {
            return Ok(());
        }
        let entry = entry_result.map_err(|e| scan_error(dir, &e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| scan_error(&path, &e))?;

        // Symlinks are resolved so linked files are indexed; a dangling link
        // is a scan error.
        let meta = if file_type.is_symlink() {
            fs::metadata(&path).map_err(|e| scan_error(&path, &e))?
        } else {
            entry.metadata().map_err(|e| scan_error(&path, &e))?
        };

        if meta.is_dir() {
            if file_type.is_symlink() && !follow_symlinks {
                continue;
            }
            if follow_symlinks {
                let canonical = fs::canonicalize(&path).map_err(|e| scan_error(&path, &e))?;
                if !state.visited.lock().insert(canonical) {
                    continue;
                }
            }
            state.in_flight.fetch_add(1, Ordering::AcqRel);
            if work_tx.send(path).is_err() {
                state.in_flight.fetch_sub(1, Ordering::AcqRel);
            }
        } else if meta.is_file() {
            let _ = result_tx.send(Ok(DiskFile::new(path, meta.len())));
        }
        // Sockets, FIFOs and device nodes are not torrent payload.
    }
    Ok(())
}

fn scan_error(path: &Path, err: &std::io::Error) -> RelinkError {
    RelinkError::Scan {
        path: path.to_path_buf(),
        details: err.to_string(),
    }
}
