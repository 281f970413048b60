//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{RelinkError, Result};
use crate::core::paths::{default_bt_backup_dir, home_dir};
use crate::matcher::policy::AmbiguityPolicy;

/// Full qbt-relink configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub scanner: ScannerConfig,
    pub matcher: MatcherConfig,
    pub paths: PathsConfig,
}

/// Torrent client integration: where its state lives and how to detect it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Case-insensitive substring matched against running process names.
    pub process_name: String,
    /// Directory holding `<hash>.torrent` and `<hash>.fastresume`.
    pub bt_backup_dir: PathBuf,
    /// Appended to the resume-record path to form the backup path.
    pub backup_suffix: String,
}

/// Disk scan behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Descend into symlinked directories. Symlinked files are always indexed.
    pub follow_symlinks: bool,
    pub parallelism: usize,
}

/// Ambiguity handling defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MatcherConfig {
    pub policy: AmbiguityPolicy,
}

/// Filesystem paths used by qbt-relink itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            process_name: "qbittorrent".to_string(),
            bt_backup_dir: default_bt_backup_dir(),
            backup_suffix: ".bkp".to_string(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            parallelism: std::thread::available_parallelism()
                .map_or(2, |n| n.get().saturating_div(2).max(1)),
        }
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            policy: AmbiguityPolicy::RejectOnAmbiguity,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home = home_dir();
        Self {
            config_file: home.join(".config").join("qbt-relink").join("config.toml"),
            activity_log: home
                .join(".local")
                .join("share")
                .join("qbt-relink")
                .join("activity.jsonl"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| RelinkError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(RelinkError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("QBR_CLIENT_PROCESS_NAME") {
            self.client.process_name = raw;
        }
        if let Some(raw) = lookup("QBR_CLIENT_BT_BACKUP_DIR") {
            self.client.bt_backup_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("QBR_CLIENT_BACKUP_SUFFIX") {
            self.client.backup_suffix = raw;
        }
        if let Some(raw) = lookup("QBR_SCANNER_FOLLOW_SYMLINKS") {
            self.scanner.follow_symlinks = parse_env_bool("QBR_SCANNER_FOLLOW_SYMLINKS", &raw)?;
        }
        if let Some(raw) = lookup("QBR_SCANNER_PARALLELISM") {
            self.scanner.parallelism = parse_env_usize("QBR_SCANNER_PARALLELISM", &raw)?;
        }
        if let Some(raw) = lookup("QBR_MATCHER_POLICY") {
            self.matcher.policy =
                raw.parse::<AmbiguityPolicy>()
                    .map_err(|details| RelinkError::ConfigParse {
                        context: "env",
                        details: format!("QBR_MATCHER_POLICY={raw:?}: {details}"),
                    })?;
        }
        if let Some(raw) = lookup("QBR_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.client.process_name.trim().is_empty() {
            return Err(RelinkError::InvalidConfig {
                details: "client.process_name must not be empty".to_string(),
            });
        }
        if self.client.backup_suffix.is_empty() {
            return Err(RelinkError::InvalidConfig {
                details: "client.backup_suffix must not be empty".to_string(),
            });
        }
        if self.client.backup_suffix.contains(['/', '\\']) {
            return Err(RelinkError::InvalidConfig {
                details: format!(
                    "client.backup_suffix must not contain path separators, got {:?}",
                    self.client.backup_suffix
                ),
            });
        }
        if self.scanner.parallelism == 0 {
            return Err(RelinkError::InvalidConfig {
                details: "scanner.parallelism must be >= 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_usize(name: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|error| RelinkError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| RelinkError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::{AmbiguityPolicy, Config, RelinkError};
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.client.process_name, "qbittorrent");
        assert_eq!(cfg.client.backup_suffix, ".bkp");
        assert_eq!(cfg.matcher.policy, AmbiguityPolicy::RejectOnAmbiguity);
    }

    #[test]
    fn empty_process_name_rejected() {
        let mut cfg = Config::default();
        cfg.client.process_name = "  ".to_string();
        let err = cfg.validate().expect_err("expected invalid process name");
        assert!(err.to_string().contains("process_name"));
    }

    #[test]
    fn backup_suffix_with_separator_rejected() {
        let mut cfg = Config::default();
        cfg.client.backup_suffix = "/../evil".to_string();
        let err = cfg.validate().expect_err("expected invalid suffix");
        assert!(err.to_string().contains("backup_suffix"));
    }

    #[test]
    fn zero_parallelism_rejected() {
        let mut cfg = Config::default();
        cfg.scanner.parallelism = 0;
        let err = cfg.validate().expect_err("expected parallelism error");
        assert!(err.to_string().contains("parallelism"));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        let overrides = vars(&[
            ("QBR_CLIENT_PROCESS_NAME", "transmission"),
            ("QBR_CLIENT_BT_BACKUP_DIR", "/srv/qbt/BT_backup"),
            ("QBR_SCANNER_FOLLOW_SYMLINKS", "true"),
            ("QBR_SCANNER_PARALLELISM", "3"),
            ("QBR_MATCHER_POLICY", "fuzzy-confirm"),
        ]);

        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("env overrides should parse");

        assert_eq!(cfg.client.process_name, "transmission");
        assert_eq!(
            cfg.client.bt_backup_dir,
            PathBuf::from("/srv/qbt/BT_backup")
        );
        assert!(cfg.scanner.follow_symlinks);
        assert_eq!(cfg.scanner.parallelism, 3);
        assert_eq!(cfg.matcher.policy, AmbiguityPolicy::FuzzyWithConfirmation);
    }

    #[test]
    fn env_invalid_boolean_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("QBR_SCANNER_FOLLOW_SYMLINKS", "yes-please")]);

        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("invalid bool should fail");
        match err {
            RelinkError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("QBR_SCANNER_FOLLOW_SYMLINKS"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_invalid_policy_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("QBR_MATCHER_POLICY", "coin-flip")]);
        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("unknown policy should fail");
        assert!(err.to_string().contains("QBR_MATCHER_POLICY"));
    }

    #[test]
    fn toml_sections_parse() {
        let raw = r#"
            [client]
            process_name = "qbittorrent-nox"
            backup_suffix = ".orig"

            [matcher]
            policy = "fuzzy"
        "#;
        let cfg: Config = toml::from_str(raw).expect("config should parse");
        assert_eq!(cfg.client.process_name, "qbittorrent-nox");
        assert_eq!(cfg.client.backup_suffix, ".orig");
        assert_eq!(cfg.matcher.policy, AmbiguityPolicy::FuzzyAutomatic);
        // Unspecified sections keep their defaults.
        assert!(!cfg.scanner.follow_symlinks);
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scanner]\nparallelism = 1\n").unwrap();

        let cfg = Config::load(Some(&path)).expect("config should load");
        assert_eq!(cfg.scanner.parallelism, 1);
        assert_eq!(cfg.paths.config_file, path);
    }

    #[test]
    fn load_returns_error_for_explicit_missing_path() {
        let result = Config::load(Some(Path::new("/nonexistent/qbt-relink/config.toml")));
        assert!(matches!(result, Err(RelinkError::MissingConfig { .. })));
    }
}
