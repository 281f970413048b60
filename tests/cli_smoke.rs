//! CLI smoke tests: argument handling, exit codes and a full remap through
//! the binary.

mod common;

use std::fs;

use common::{
    HASH, Layout, fastresume, multi_file_torrent, run_cli_case, run_cli_case_with_input,
};
use serde_json::Value;

fn str_path(path: &std::path::Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

fn seeded_layout() -> Layout {
    let layout = Layout::new();
    layout.write_torrent(&multi_file_torrent(
        "Original",
        &[("a.txt", 100), ("b.txt", 200)],
    ));
    layout.write_resume(&fastresume("/old/downloads"));
    layout.disk_file("Renamed/a-renamed.txt", 100);
    layout.disk_file("Renamed/b-renamed.txt", 200);
    layout
}

fn activity_events(layout: &Layout) -> Vec<String> {
    let raw = fs::read_to_string(layout.home().join("activity.jsonl")).unwrap_or_default();
    raw.lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).expect("activity line is json");
            value["event"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

#[test]
fn help_command_prints_usage() {
    let layout = Layout::new();
    let result = run_cli_case("help_command_prints_usage", layout.home(), &["--help"]);
    assert!(
        result.status.success(),
        "log: {}",
        result.log_path.display()
    );
    assert!(result.stdout.contains("--hash"));
    assert!(result.stdout.contains("--search-dir"));
    assert!(result.stdout.contains("--fix-duplicates"));
}

#[test]
fn version_command_prints_package_version() {
    let layout = Layout::new();
    let result = run_cli_case("version_command", layout.home(), &["--version"]);
    assert!(result.status.success());
    assert!(result.stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn completions_are_generated() {
    let layout = Layout::new();
    let result = run_cli_case("completions", layout.home(), &["--completions", "bash"]);
    assert!(result.status.success());
    assert!(result.stdout.contains("qbt-relink"));
}

#[test]
fn malformed_hash_exits_with_user_error() {
    let layout = Layout::new();
    let result = run_cli_case(
        "malformed_hash",
        layout.home(),
        &["-a", "not-a-hash", "-s", str_path(&layout.search_dir)],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("QBR-"));
}

#[test]
fn missing_search_dir_exits_with_user_error() {
    let layout = seeded_layout();
    let missing = layout.home().join("nowhere");
    let result = run_cli_case(
        "missing_search_dir",
        layout.home(),
        &[
            "-a",
            HASH,
            "-s",
            str_path(&missing),
            "-b",
            str_path(&layout.bt_backup),
        ],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(!layout.backup_path().exists());
}

#[test]
fn json_run_writes_then_reports_noop() {
    let layout = seeded_layout();
    let args = [
        "-a",
        HASH,
        "-s",
        str_path(&layout.search_dir),
        "-b",
        str_path(&layout.bt_backup),
        "--json",
    ];

    let first = run_cli_case("json_run_first", layout.home(), &args);
    assert!(first.status.success(), "log: {}", first.log_path.display());
    let report: Value = serde_json::from_str(first.stdout.trim()).expect("json report");
    assert_eq!(report["status"], "written");
    assert_eq!(report["hash"], HASH);
    assert_eq!(report["backup_created"], true);
    assert_eq!(report["mapped_files"].as_array().map(Vec::len), Some(2));
    assert_eq!(fs::read(layout.backup_path()).unwrap(), fastresume("/old/downloads"));

    let second = run_cli_case("json_run_second", layout.home(), &args);
    assert!(second.status.success(), "log: {}", second.log_path.display());
    let report: Value = serde_json::from_str(second.stdout.trim()).expect("json report");
    assert_eq!(report["status"], "noop");

    let events = activity_events(&layout);
    assert!(events.contains(&"remap_applied".to_string()));
    assert_eq!(events.last().map(String::as_str), Some("remap_noop"));
}

#[test]
fn dry_run_leaves_files_untouched() {
    let layout = seeded_layout();
    let result = run_cli_case(
        "dry_run",
        layout.home(),
        &[
            "-a",
            HASH,
            "-s",
            str_path(&layout.search_dir),
            "-b",
            str_path(&layout.bt_backup),
            "--dry-run",
            "--json",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let report: Value = serde_json::from_str(result.stdout.trim()).expect("json report");
    assert_eq!(report["status"], "dry_run");
    assert_eq!(report["would_write"], true);
    assert_eq!(fs::read(layout.fastresume_path()).unwrap(), fastresume("/old/downloads"));
    assert!(!layout.backup_path().exists());
}

#[test]
fn unmatched_file_exits_with_user_error_and_logs_it() {
    let layout = Layout::new();
    layout.write_torrent(&multi_file_torrent("T", &[("a.txt", 10), ("b.txt", 20)]));
    layout.write_resume(&fastresume("/old"));
    layout.disk_file("a.txt", 10);

    let result = run_cli_case(
        "unmatched_file",
        layout.home(),
        &[
            "-a",
            HASH,
            "-s",
            str_path(&layout.search_dir),
            "-b",
            str_path(&layout.bt_backup),
            "--no-color",
        ],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("b.txt"));
    assert_eq!(activity_events(&layout).last().map(String::as_str), Some("error"));
    assert_eq!(fs::read(layout.fastresume_path()).unwrap(), fastresume("/old"));
}

#[test]
fn human_output_names_save_path() {
    let layout = seeded_layout();
    let result = run_cli_case(
        "human_output",
        layout.home(),
        &[
            "-a",
            HASH,
            "-s",
            str_path(&layout.search_dir),
            "-b",
            str_path(&layout.bt_backup),
            "--no-color",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("Done:"));
    assert!(result.stdout.contains("Save path:"));
    assert!(result.stdout.contains("a-renamed.txt"));
}

/// One declared episode with two same-size `.mkv` files on disk.
fn ambiguous_layout() -> Layout {
    let layout = Layout::new();
    layout.write_torrent(&multi_file_torrent("Show", &[("Episode 02.mkv", 50)]));
    layout.write_resume(&fastresume("/old"));
    layout.disk_file("Show/Episode_02.mkv", 50);
    layout.disk_file("Show/Episode_11.mkv", 50);
    layout
}

fn remap_args<'a>(layout: &'a Layout, extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec![
        "-a",
        HASH,
        "-s",
        str_path(&layout.search_dir),
        "-b",
        str_path(&layout.bt_backup),
    ];
    args.extend_from_slice(extra);
    args
}

#[test]
fn declined_fuzzy_confirmation_exits_zero_and_writes_nothing() {
    let layout = ambiguous_layout();
    let result = run_cli_case_with_input(
        "declined_fuzzy_confirmation",
        layout.home(),
        &remap_args(&layout, &["-f", "3", "--json"]),
        "n\n",
    );
    assert_eq!(result.status.code(), Some(0), "log: {}", result.log_path.display());
    let report: Value = serde_json::from_str(result.stdout.trim()).expect("json report");
    assert_eq!(report["status"], "cancelled");
    assert_eq!(report["policy"], "fuzzy-confirm");
    assert!(result.stderr.contains("Episode_02.mkv"));
    assert_eq!(fs::read(layout.fastresume_path()).unwrap(), fastresume("/old"));
    assert!(!layout.backup_path().exists());
    assert_eq!(
        activity_events(&layout).last().map(String::as_str),
        Some("remap_cancelled")
    );
}

#[test]
fn accepted_fuzzy_confirmation_writes_closest_match() {
    let layout = ambiguous_layout();
    let result = run_cli_case_with_input(
        "accepted_fuzzy_confirmation",
        layout.home(),
        &remap_args(&layout, &["-f", "3", "--json"]),
        "y\n",
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let report: Value = serde_json::from_str(result.stdout.trim()).expect("json report");
    assert_eq!(report["status"], "written");
    assert_eq!(report["mapped_files"][0], "Episode_02.mkv");
    assert!(result.stderr.contains("Fuzzy match:"));
    assert!(layout.backup_path().exists());
}

#[test]
fn interactive_prompt_maps_chosen_candidate() {
    let layout = ambiguous_layout();
    let result = run_cli_case_with_input(
        "interactive_prompt",
        layout.home(),
        &remap_args(&layout, &["-f", "1", "--json"]),
        "1\n",
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("[0] "));
    assert!(result.stderr.contains("[1] "));
    let report: Value = serde_json::from_str(result.stdout.trim()).expect("json report");
    assert_eq!(report["status"], "written");
    assert_eq!(report["mapped_files"][0], "Episode_11.mkv");
}

#[test]
fn interactive_prompt_without_answer_fails_without_writing() {
    let layout = ambiguous_layout();
    let result = run_cli_case_with_input(
        "interactive_prompt_eof",
        layout.home(),
        &remap_args(&layout, &["-f", "1"]),
        "",
    );
    assert_eq!(result.status.code(), Some(2), "log: {}", result.log_path.display());
    assert_eq!(fs::read(layout.fastresume_path()).unwrap(), fastresume("/old"));
    assert!(!layout.backup_path().exists());
}

#[test]
fn verbose_run_dumps_intermediate_state() {
    let layout = seeded_layout();
    let result = run_cli_case(
        "verbose_run",
        layout.home(),
        &remap_args(&layout, &["-d", "--json"]),
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("[QBR-DEBUG] indexed_files"));
    assert!(result.stderr.contains("[QBR-DEBUG] resolved_mappings"));
    assert!(result.stderr.contains("[QBR-DEBUG] save_path"));
    let report: Value = serde_json::from_str(result.stdout.trim()).expect("json report");
    assert_eq!(report["status"], "written");
}
