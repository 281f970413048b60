//! Resume record model: `BT_backup` file layout, remap plan, key overlay.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::codec::bencode::{self, Dict, Value};
use crate::core::errors::{RelinkError, Result};
use crate::core::paths::{common_ancestor, parent_or_self};
use crate::matcher::resolve::ResolvedMapping;
use crate::torrent::hash::InfoHash;

pub const KEY_SAVE_PATH: &str = "save_path";
pub const KEY_QBT_SAVE_PATH: &str = "qBt-savePath";
pub const KEY_MAPPED_FILES: &str = "mapped_files";
pub const KEY_PAUSED: &str = "paused";

/// Keys the remap owns; every other key passes through untouched.
pub const REMAP_KEYS: [&str; 4] = [KEY_SAVE_PATH, KEY_QBT_SAVE_PATH, KEY_MAPPED_FILES, KEY_PAUSED];

/// Files belonging to one torrent inside the client's state directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumePaths {
    pub torrent: PathBuf,
    pub fastresume: PathBuf,
    pub backup: PathBuf,
}

impl ResumePaths {
    /// `<dir>/<hash>.torrent`, `<dir>/<hash>.fastresume`, and the backup
    /// `<dir>/<hash>.fastresume<suffix>`.
    #[must_use]
    pub fn for_hash(bt_backup_dir: &Path, hash: &InfoHash, backup_suffix: &str) -> Self {
        let torrent = bt_backup_dir.join(format!("{hash}.torrent"));
        let fastresume = bt_backup_dir.join(format!("{hash}.fastresume"));
        let backup = bt_backup_dir.join(format!("{hash}.fastresume{backup_suffix}"));
        Self {
            torrent,
            fastresume,
            backup,
        }
    }
}

/// New save path plus per-file paths relative to it, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemapPlan {
    pub save_path: PathBuf,
    pub mapped_files: Vec<PathBuf>,
}

impl RemapPlan {
    /// The save path is the parent of the deepest directory shared by every
    /// chosen disk file.
    pub fn from_mappings(mappings: &[ResolvedMapping]) -> Result<Self> {
        let ancestor = common_ancestor(mappings.iter().map(|m| m.chosen.absolute_path.as_path()))
            .ok_or_else(|| RelinkError::Codec {
                context: "remap_plan",
                details: "resolved files share no common ancestor".to_string(),
            })?;
        let save_path = parent_or_self(&ancestor);

        let mapped_files = mappings
            .iter()
            .map(|mapping| {
                mapping
                    .chosen
                    .absolute_path
                    .strip_prefix(&save_path)
                    .map(Path::to_path_buf)
                    .map_err(|_| RelinkError::Codec {
                        context: "remap_plan",
                        details: format!(
                            "{} is outside save path {}",
                            mapping.chosen.absolute_path.display(),
                            save_path.display()
                        ),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            save_path,
            mapped_files,
        })
    }
}

/// A decoded `.fastresume` dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeRecord {
    fields: Dict,
}

impl ResumeRecord {
    /// Decode a resume record; the top level must be a dictionary.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        match bencode::decode(bytes)? {
            Value::Dict(fields) => Ok(Self { fields }),
            other => Err(RelinkError::Codec {
                context: "resume_record",
                details: format!("top level is a {}, expected a dictionary", other.kind()),
            }),
        }
    }

    /// Canonical encoding (keys sorted).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        bencode::encode(&Value::Dict(self.fields.clone()))
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key.as_bytes())
    }

    #[must_use]
    pub fn fields(&self) -> &Dict {
        &self.fields
    }

    /// Copy of this record with the remap keys set from `plan`.
    ///
    /// `paused` is always forced to `1` so the client does not start
    /// checking before the operator has looked at the result.
    pub fn with_plan(&self, plan: &RemapPlan) -> Result<Self> {
        let save_path = path_value(&plan.save_path)?;
        let mapped_files = plan
            .mapped_files
            .iter()
            .map(|p| path_value(p))
            .collect::<Result<Vec<_>>>()?;

        let mut fields = self.fields.clone();
        fields.insert(KEY_SAVE_PATH.as_bytes().to_vec(), save_path.clone());
        fields.insert(KEY_QBT_SAVE_PATH.as_bytes().to_vec(), save_path);
        fields.insert(KEY_MAPPED_FILES.as_bytes().to_vec(), Value::List(mapped_files));
        fields.insert(KEY_PAUSED.as_bytes().to_vec(), Value::Int(1));
        Ok(Self { fields })
    }

    /// Copy of this record with the remap keys taken from `update`. Keys
    /// `update` lacks are left as they are.
    #[must_use]
    pub fn overlay(&self, update: &Self) -> Self {
        let mut fields = self.fields.clone();
        for key in REMAP_KEYS {
            if let Some(value) = update.get(key) {
                fields.insert(key.as_bytes().to_vec(), value.clone());
            }
        }
        Self { fields }
    }

    /// `save_path` as text, if present.
    #[must_use]
    pub fn save_path(&self) -> Option<&str> {
        self.get(KEY_SAVE_PATH).and_then(Value::as_str)
    }

    /// `mapped_files` entries that are valid UTF-8.
    #[must_use]
    pub fn mapped_files(&self) -> Vec<&str> {
        self.get(KEY_MAPPED_FILES)
            .and_then(Value::as_list)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

fn path_value(path: &Path) -> Result<Value> {
    path.to_str()
        .map(Value::from)
        .ok_or_else(|| RelinkError::Codec {
            context: "resume_record",
            details: format!("path is not valid UTF-8: {}", path.display()),
        })
}
