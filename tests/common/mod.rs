#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use qbt_relink::codec::bencode::{Dict, Value, encode};
use tempfile::TempDir;

pub const HASH: &str = "c0ffee00c0ffee00c0ffee00c0ffee00c0ffee00";

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_qbt-relink") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) {
        "qbt-relink.exe"
    } else {
        "qbt-relink"
    };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve qbt-relink binary path for integration test"),
    }
}

/// Run the binary with an isolated home directory, config and activity log.
pub fn run_cli_case(case_name: &str, home: &Path, args: &[&str]) -> CmdResult {
    run_cli_case_with_input(case_name, home, args, "")
}

/// Like [`run_cli_case`], feeding `input` to the binary's stdin.
pub fn run_cli_case_with_input(
    case_name: &str,
    home: &Path,
    args: &[&str],
    input: &str,
) -> CmdResult {
    let root = std::env::temp_dir().join("qbt-relink-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut child = Command::new(&bin_path)
        .args(args)
        .env("HOME", home)
        .env("QBR_ACTIVITY_LOG", home.join("activity.jsonl"))
        .env_remove("QBR_CLIENT_PROCESS_NAME")
        .env_remove("QBR_CLIENT_BT_BACKUP_DIR")
        .env_remove("QBR_MATCHER_POLICY")
        .env("RUST_BACKTRACE", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn qbt-relink command");
    {
        let mut stdin = child.stdin.take().expect("child stdin");
        // The binary may exit without reading; a broken pipe is fine then.
        let _ = stdin.write_all(input.as_bytes());
    }
    let output = child
        .wait_with_output()
        .expect("execute qbt-relink command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("stdin={input:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

fn dict(pairs: Vec<(&str, Value)>) -> Value {
    Value::Dict(
        pairs
            .into_iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v))
            .collect::<Dict>(),
    )
}

/// Multi-file `.torrent` bytes declaring `files` (`/`-separated torrent path, length).
pub fn multi_file_torrent(name: &str, files: &[(&str, i64)]) -> Vec<u8> {
    let entries = files
        .iter()
        .map(|(path, length)| {
            dict(vec![
                ("length", Value::Int(*length)),
                (
                    "path",
                    Value::List(path.split('/').map(Value::from).collect()),
                ),
            ])
        })
        .collect();
    encode(&dict(vec![
        ("announce", Value::from("http://tracker.invalid/announce")),
        (
            "info",
            dict(vec![
                ("name", Value::from(name)),
                ("piece length", Value::Int(16384)),
                ("files", Value::List(entries)),
            ]),
        ),
    ]))
}

/// Minimal `.fastresume` bytes pointing at `save_path`.
pub fn fastresume(save_path: &str) -> Vec<u8> {
    encode(&dict(vec![
        ("file-format", Value::from("libtorrent resume file")),
        ("save_path", Value::from(save_path)),
        ("qBt-savePath", Value::from(save_path)),
        ("qBt-category", Value::from("tv")),
        ("paused", Value::Int(0)),
        ("total_uploaded", Value::Int(4242)),
    ]))
}

/// A BT_backup directory plus a search directory, both under one temp root.
pub struct Layout {
    pub tmp: TempDir,
    pub bt_backup: PathBuf,
    pub search_dir: PathBuf,
}

impl Layout {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let bt_backup = tmp.path().join("BT_backup");
        let search_dir = tmp.path().join("media");
        fs::create_dir_all(&bt_backup).expect("create BT_backup");
        fs::create_dir_all(&search_dir).expect("create search dir");
        Self {
            tmp,
            bt_backup,
            search_dir,
        }
    }

    pub fn home(&self) -> &Path {
        self.tmp.path()
    }

    pub fn write_torrent(&self, bytes: &[u8]) {
        fs::write(self.bt_backup.join(format!("{HASH}.torrent")), bytes).expect("write torrent");
    }

    pub fn write_resume(&self, bytes: &[u8]) {
        fs::write(self.fastresume_path(), bytes).expect("write fastresume");
    }

    pub fn fastresume_path(&self) -> PathBuf {
        self.bt_backup.join(format!("{HASH}.fastresume"))
    }

    pub fn backup_path(&self) -> PathBuf {
        self.bt_backup.join(format!("{HASH}.fastresume.bkp"))
    }

    /// Create `relative` under the search directory with `size` zero bytes.
    pub fn disk_file(&self, relative: &str, size: usize) -> PathBuf {
        let path = self.search_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, vec![0u8; size]).expect("write disk file");
        path
    }
}
