//! Info-hash identifier used to locate a torrent's files in `BT_backup`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::errors::RelinkError;

static HEX40: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{40}$"));

/// A v1 torrent info-hash: 40 hexadecimal characters, stored lower-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct InfoHash(String);

impl InfoHash {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InfoHash {
    type Err = RelinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let pattern = HEX40.as_ref().map_err(|err| RelinkError::InvalidConfig {
            details: format!("hash pattern: {err}"),
        })?;
        if !pattern.is_match(trimmed) {
            return Err(RelinkError::InvalidHash {
                input: s.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
