//! Process liveness: is the torrent client currently running?

#![allow(missing_docs)]

#[cfg(not(target_os = "linux"))]
use std::process::Command;

/// Answers whether a process whose name contains a given substring is alive.
pub trait ProcessProbe {
    /// Case-insensitive substring match against running process names.
    fn is_running(&self, name: &str) -> bool;
}

/// Probe backed by the host process table.
///
/// Linux reads `/proc/<pid>/comm`; other Unix systems ask `ps`; Windows asks
/// `tasklist`. Processes that vanish or cannot be read mid-scan are skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessProbe;

impl ProcessProbe for SystemProcessProbe {
    fn is_running(&self, name: &str) -> bool {
        matches_any(&running_process_names(), name)
    }
}

/// Probe with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticProcessProbe(pub bool);

impl ProcessProbe for StaticProcessProbe {
    fn is_running(&self, _name: &str) -> bool {
        self.0
    }
}

/// Whether any of `names` contains `needle`, ignoring case.
#[must_use]
pub fn matches_any(names: &[String], needle: &str) -> bool {
    let needle = needle.to_lowercase();
    names
        .iter()
        .any(|candidate| candidate.to_lowercase().contains(&needle))
}

/// Names of all processes visible to the current user.
#[must_use]
pub fn running_process_names() -> Vec<String> {
    #[cfg(target_os = "linux")]
    {
        let mut names = Vec::new();
        let Ok(proc_dir) = std::fs::read_dir("/proc") else {
            eprintln!("[QBR-PROC] WARNING: /proc is not readable, assuming no client is running");
            return names;
        };

        for entry in proc_dir {
            let Ok(entry) = entry else {
                continue;
            };
            let file_name = entry.file_name();
            if !file_name.to_string_lossy().chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let comm = std::fs::read_to_string(entry.path().join("comm"))
                .unwrap_or_default()
                .trim()
                .to_string();
            if comm.is_empty() {
                continue;
            }
            names.push(comm);
        }
        names
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    {
        command_lines("ps", &["-axco", "comm"])
    }

    #[cfg(windows)]
    {
        command_lines("tasklist", &["/fo", "csv", "/nh"])
            .into_iter()
            .filter_map(|line| {
                line.split(',')
                    .next()
                    .map(|field| field.trim_matches('"').to_string())
            })
            .filter(|name| !name.is_empty())
            .collect()
    }

    #[cfg(not(any(unix, windows)))]
    {
        Vec::new()
    }
}

#[cfg(not(target_os = "linux"))]
fn command_lines(program: &str, args: &[&str]) -> Vec<String> {
    match Command::new(program).args(args).output() {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
        Ok(output) => {
            eprintln!(
                "[QBR-PROC] WARNING: {program} exited with {}, assuming no client is running",
                output.status.code().unwrap_or(-1)
            );
            Vec::new()
        }
        Err(err) => {
            eprintln!("[QBR-PROC] WARNING: could not run {program}: {err}");
            Vec::new()
        }
    }
}
