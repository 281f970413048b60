//! Top-level CLI definition and the remap pipeline behind it.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::{CommandFactory, Parser};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde::Serialize;
use thiserror::Error;

use qbt_relink::cli::prompt::TerminalPrompter;
use qbt_relink::core::config::Config;
use qbt_relink::core::errors::RelinkError;
use qbt_relink::core::paths::resolve_absolute_path;
use qbt_relink::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use qbt_relink::matcher::policy::AmbiguityPolicy;
use qbt_relink::matcher::resolve::{MatchOutcome, Prompter, Resolution, resolve};
use qbt_relink::platform::ensure_readable_dir;
use qbt_relink::platform::process::SystemProcessProbe;
use qbt_relink::resume::patcher::{ApplyOutcome, ResumeRecordPatcher, compute_update};
use qbt_relink::resume::record::{ResumePaths, ResumeRecord};
use qbt_relink::scanner::index::DiskIndex;
use qbt_relink::torrent::hash::InfoHash;
use qbt_relink::torrent::manifest;

/// qbt-relink: point a qBittorrent torrent at files that were renamed or moved.
#[derive(Debug, Parser)]
#[command(
    name = "qbt-relink",
    author,
    version,
    about = "Re-point a qBittorrent resume record at renamed files",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Torrent info-hash (in qBittorrent: right click -> copy -> hash).
    #[arg(
        short = 'a',
        long = "hash",
        value_name = "HASH",
        required_unless_present = "completions"
    )]
    hash: Option<String>,
    /// Directory to search for the torrent's files.
    #[arg(
        short = 's',
        long,
        value_name = "PATH",
        required_unless_present = "completions"
    )]
    search_dir: Option<PathBuf>,
    /// qBittorrent BT_backup directory (overrides config).
    #[arg(short = 'b', long, value_name = "PATH")]
    bt_backup: Option<PathBuf>,
    /// Duplicate handling: 0 fail, 1 prompt, 2 fuzzy, 3 fuzzy then confirm.
    #[arg(
        short = 'f',
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u8).range(0..=3)
    )]
    fix_duplicates: Option<u8>,
    /// Override config file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Match and compute the update, but write nothing.
    #[arg(long)]
    dry_run: bool,
    /// Print a single JSON result line on stdout.
    #[arg(long)]
    json: bool,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
    /// Dump intermediate state (index size, candidates, mappings) to stderr.
    #[arg(short = 'd', long, alias = "debug")]
    verbose: bool,
    /// Print a shell completion script and exit.
    #[arg(long, value_enum, value_name = "SHELL", exclusive = true)]
    completions: Option<CompletionShell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid input or on-disk layout the user has to fix.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<RelinkError> for CliError {
    fn from(err: RelinkError) -> Self {
        if err.is_user_error() {
            Self::User(err.to_string())
        } else if matches!(err, RelinkError::Serialization { .. }) {
            Self::Internal(err.to_string())
        } else {
            Self::Runtime(err.to_string())
        }
    }
}

/// Final state of a run, shared by human and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RunStatus {
    Written,
    Noop,
    Cancelled,
    DryRun,
}

#[derive(Debug, Clone, Serialize)]
struct RunReport {
    status: RunStatus,
    hash: String,
    policy: AmbiguityPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    save_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    mapped_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backup_path: Option<PathBuf>,
    /// Dry runs only: whether a real run would rewrite the record.
    #[serde(skip_serializing_if = "Option::is_none")]
    would_write: Option<bool>,
}

impl RunReport {
    fn new(status: RunStatus, hash: &InfoHash, policy: AmbiguityPolicy) -> Self {
        Self {
            status,
            hash: hash.to_string(),
            policy,
            save_path: None,
            mapped_files: Vec::new(),
            backup_created: None,
            backup_path: None,
            would_write: None,
        }
    }

    fn with_record(mut self, update: &ResumeRecord) -> Self {
        self.save_path = update.save_path().map(str::to_string);
        self.mapped_files = update
            .mapped_files()
            .into_iter()
            .map(str::to_string)
            .collect();
        self
    }
}

/// Validated inputs for one remap.
struct RunInputs {
    hash: InfoHash,
    search_dir: PathBuf,
    paths: ResumePaths,
    config: Config,
    policy: AmbiguityPolicy,
}

/// Parse, validate and execute one remap.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        let binary_name = command.get_name().to_string();
        generate(shell, &mut command, binary_name, &mut io::stdout());
        return Ok(());
    }

    let inputs = validate_inputs(cli)?;
    let mut log = JsonlWriter::open(inputs.config.paths.activity_log.clone());
    log.write_entry(
        &LogEntry::new(EventType::RunStart, Severity::Info)
            .with_hash(inputs.hash.as_str())
            .with_path(&inputs.search_dir)
            .with_policy(inputs.policy.label()),
    );

    let report = match execute(cli, &inputs, &mut log) {
        Ok(report) => report,
        Err(err) => {
            log.write_entry(&LogEntry::from_error(&err).with_hash(inputs.hash.as_str()));
            return Err(err.into());
        }
    };

    match output_mode(cli) {
        OutputMode::Human => print_report_human(&report),
        OutputMode::Json => write_json_line(&serde_json::to_value(&report)?)?,
    }
    Ok(())
}

fn validate_inputs(cli: &Cli) -> Result<RunInputs, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.bt_backup {
        config.client.bt_backup_dir.clone_from(dir);
    }
    let policy = match cli.fix_duplicates {
        Some(code) => AmbiguityPolicy::from_code(code)
            .ok_or_else(|| CliError::User(format!("--fix-duplicates must be 0-3, got {code}")))?,
        None => config.matcher.policy,
    };

    let raw_hash = cli
        .hash
        .as_deref()
        .ok_or_else(|| CliError::User("--hash is required".to_string()))?;
    let hash: InfoHash = raw_hash.parse()?;

    let search_dir = cli
        .search_dir
        .as_deref()
        .map(resolve_absolute_path)
        .ok_or_else(|| CliError::User("--search-dir is required".to_string()))?;
    ensure_readable_dir(&search_dir).map_err(user_path_error)?;

    let bt_backup = resolve_absolute_path(&config.client.bt_backup_dir);
    ensure_readable_dir(&bt_backup).map_err(user_path_error)?;
    config.client.bt_backup_dir.clone_from(&bt_backup);

    let paths = ResumePaths::for_hash(&bt_backup, &hash, &config.client.backup_suffix);
    Ok(RunInputs {
        hash,
        search_dir,
        paths,
        config,
        policy,
    })
}

/// Missing or unreadable input directories are the caller's to fix.
fn user_path_error(err: RelinkError) -> CliError {
    CliError::User(err.to_string())
}

fn execute(
    cli: &Cli,
    inputs: &RunInputs,
    log: &mut JsonlWriter,
) -> Result<RunReport, RelinkError> {
    let torrent_bytes =
        fs::read(&inputs.paths.torrent).map_err(|e| RelinkError::io(&inputs.paths.torrent, e))?;
    let declared = manifest::parse(&torrent_bytes)?;

    let scan_start = Instant::now();
    let index = DiskIndex::build(&inputs.search_dir, &inputs.config.scanner)?;
    log.write_entry(
        &LogEntry::new(EventType::ScanComplete, Severity::Info)
            .with_hash(inputs.hash.as_str())
            .with_path(index.root())
            .with_files(index.len())
            .with_duration_ms(elapsed_ms(scan_start)),
    );
    if cli.verbose {
        debug_dump("search_dir", &index.root().display().to_string());
        debug_dump("indexed_files", &index.len());
        debug_dump("declared_files", &declared);
    }

    let mut terminal = TerminalPrompter::stdio();
    let prompter: Option<&mut dyn Prompter> = if inputs.policy.is_interactive() {
        Some(&mut terminal)
    } else {
        None
    };
    let resolution = match resolve(declared, &index, inputs.policy, prompter)? {
        MatchOutcome::Resolved(resolution) => resolution,
        MatchOutcome::Cancelled => {
            log.write_entry(
                &LogEntry::new(EventType::RemapCancelled, Severity::Warning)
                    .with_hash(inputs.hash.as_str())
                    .with_details("fuzzy matches declined at confirmation"),
            );
            return Ok(RunReport::new(
                RunStatus::Cancelled,
                &inputs.hash,
                inputs.policy,
            ));
        }
    };
    log.write_entry(
        &LogEntry::new(EventType::MatchComplete, Severity::Info)
            .with_hash(inputs.hash.as_str())
            .with_files(resolution.mappings.len())
            .with_policy(inputs.policy.label()),
    );
    if inputs.policy.is_fuzzy() {
        report_fuzzy_picks(&resolution);
    }
    if cli.verbose {
        debug_dump("resolved_mappings", &resolution.mappings);
    }

    let probe = SystemProcessProbe;
    let patcher = ResumeRecordPatcher::new(
        &inputs.paths,
        &probe,
        &inputs.config.client.process_name,
    );
    let existing_bytes = patcher.load()?;
    let existing = ResumeRecord::decode(&existing_bytes)?;
    let update = compute_update(&existing, &resolution.mappings)?;
    if cli.verbose {
        debug_dump("save_path", &update.save_path());
        debug_dump("mapped_files", &update.mapped_files());
    }

    if cli.dry_run {
        let mut report =
            RunReport::new(RunStatus::DryRun, &inputs.hash, inputs.policy).with_record(&update);
        report.would_write = Some(ResumeRecordPatcher::would_change(
            &existing_bytes,
            &update,
        )?);
        return Ok(report);
    }

    let outcome = patcher.apply(&existing_bytes, &update)?;
    let report = match outcome {
        ApplyOutcome::NoOp => {
            log.write_entry(
                &LogEntry::new(EventType::RemapNoop, Severity::Info)
                    .with_hash(inputs.hash.as_str())
                    .with_path(&inputs.paths.fastresume),
            );
            RunReport::new(RunStatus::Noop, &inputs.hash, inputs.policy).with_record(&update)
        }
        ApplyOutcome::Written { backup_created } => {
            log.write_entry(
                &LogEntry::new(EventType::RemapApplied, Severity::Info)
                    .with_hash(inputs.hash.as_str())
                    .with_path(&inputs.paths.fastresume)
                    .with_files(resolution.mappings.len())
                    .with_save_path(update.save_path())
                    .with_backup_created(backup_created),
            );
            let mut report = RunReport::new(RunStatus::Written, &inputs.hash, inputs.policy)
                .with_record(&update);
            report.backup_created = Some(backup_created);
            report.backup_path = Some(inputs.paths.backup.clone());
            report
        }
    };
    Ok(report)
}

fn report_fuzzy_picks(resolution: &Resolution) {
    for mapping in resolution.disambiguated_mappings() {
        eprintln!(
            "File \"{}\" had several candidates",
            mapping.declared.relative_path
        );
        eprintln!(" Fuzzy match: {}", mapping.chosen.absolute_path.display());
    }
}

fn debug_dump<T: Serialize + ?Sized>(label: &str, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => eprintln!("[QBR-DEBUG] {label}: {json}"),
        Err(e) => eprintln!("[QBR-DEBUG] {label}: <unserializable: {e}>"),
    }
}

fn print_report_human(report: &RunReport) {
    match report.status {
        RunStatus::Cancelled => {
            println!("{} no changes made", "Cancelled:".yellow().bold());
            return;
        }
        RunStatus::Noop => {
            println!(
                "{} resume data already matches, no changes made",
                "Up to date:".green().bold()
            );
        }
        RunStatus::DryRun => {
            let verdict = if report.would_write == Some(true) {
                "resume data would be rewritten"
            } else {
                "resume data already matches"
            };
            println!("{} {verdict}", "Dry run:".cyan().bold());
        }
        RunStatus::Written => {
            println!("{} resume data rewritten", "Done:".green().bold());
        }
    }

    println!("  Torrent:   {}", report.hash);
    if let Some(save_path) = &report.save_path {
        println!("  Save path: {save_path}");
    }
    if !report.mapped_files.is_empty() {
        println!("  Mapped files:");
        for file in &report.mapped_files {
            println!("    {file}");
        }
    }
    if let (Some(created), Some(path)) = (report.backup_created, &report.backup_path) {
        let note = if created { "created" } else { "kept existing" };
        println!("  Backup:    {} ({note})", path.display());
    }
    if report.status == RunStatus::Written {
        println!(
            "  {}",
            "The torrent is paused; resume it in qBittorrent once you have checked the result."
                .dimmed()
        );
    }
}

fn write_json_line(payload: &serde_json::Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
