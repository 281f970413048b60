//! Torrent descriptor parsing: the ordered list of files a torrent declares.

#![allow(missing_docs)]

use std::path::{MAIN_SEPARATOR_STR, Path};

use serde::Serialize;

use crate::codec::bencode::{self, Value};
use crate::core::errors::{RelinkError, Result};
use crate::scanner::index::{DiskFile, extension_of};

/// A file entry declared by the torrent, in descriptor order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclaredFile {
    /// Torrent-internal path, segments joined with the host separator.
    pub relative_path: String,
    pub declared_size: u64,
    /// Disk files that could be this entry. Populated and narrowed by the matcher.
    pub candidates: Vec<DiskFile>,
}

impl DeclaredFile {
    #[must_use]
    pub fn new(relative_path: impl Into<String>, declared_size: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            declared_size,
            candidates: Vec::new(),
        }
    }

    /// Extension of the last path segment, with leading dot.
    #[must_use]
    pub fn extension(&self) -> String {
        extension_of(Path::new(&self.relative_path))
    }

    /// Last path segment.
    #[must_use]
    pub fn base_name(&self) -> &str {
        self.relative_path
            .rsplit(MAIN_SEPARATOR_STR)
            .next()
            .unwrap_or(&self.relative_path)
    }
}

/// Parse a `.torrent` buffer into its declared files.
///
/// Multi-file torrents (`info.files`) yield one entry per element in list
/// order; single-file torrents yield one entry from `info.name` + `info.length`.
pub fn parse(bytes: &[u8]) -> Result<Vec<DeclaredFile>> {
    let root = bencode::decode(bytes).map_err(|e| RelinkError::malformed(e.to_string()))?;
    let info = root
        .get("info")
        .ok_or_else(|| RelinkError::malformed("missing 'info' dictionary"))?;
    if info.as_dict().is_none() {
        return Err(RelinkError::malformed(format!(
            "'info' is a {}, expected a dictionary",
            info.kind()
        )));
    }

    if let Some(files) = info.get("files") {
        let list = files.as_list().ok_or_else(|| {
            RelinkError::malformed(format!("'info.files' is a {}, expected a list", files.kind()))
        })?;
        if list.is_empty() {
            return Err(RelinkError::malformed("'info.files' is empty"));
        }
        return list
            .iter()
            .enumerate()
            .map(|(idx, entry)| parse_file_entry(idx, entry))
            .collect();
    }

    let name = text_field(info, "name", "info")?;
    let length = length_field(info, "info")?;
    Ok(vec![DeclaredFile::new(name, length)])
}

fn parse_file_entry(idx: usize, entry: &Value) -> Result<DeclaredFile> {
    let location = format!("info.files[{idx}]");
    if entry.as_dict().is_none() {
        return Err(RelinkError::malformed(format!(
            "'{location}' is a {}, expected a dictionary",
            entry.kind()
        )));
    }
    let length = length_field(entry, &location)?;
    let segments = entry
        .get("path")
        .and_then(Value::as_list)
        .ok_or_else(|| RelinkError::malformed(format!("'{location}.path' missing or not a list")))?;
    if segments.is_empty() {
        return Err(RelinkError::malformed(format!("'{location}.path' is empty")));
    }
    let parts = segments
        .iter()
        .map(|segment| {
            segment.as_str().map(str::to_owned).ok_or_else(|| {
                RelinkError::malformed(format!(
                    "'{location}.path' holds a non-UTF-8 or non-string segment"
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DeclaredFile::new(parts.join(MAIN_SEPARATOR_STR), length))
}

fn text_field(dict: &Value, key: &str, location: &str) -> Result<String> {
    dict.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            RelinkError::malformed(format!("'{location}.{key}' missing or not a UTF-8 string"))
        })
}

fn length_field(dict: &Value, location: &str) -> Result<u64> {
    let raw = dict
        .get("length")
        .and_then(Value::as_int)
        .ok_or_else(|| RelinkError::malformed(format!("'{location}.length' missing or not an integer")))?;
    u64::try_from(raw)
        .map_err(|_| RelinkError::malformed(format!("'{location}.length' is negative ({raw})")))
}
