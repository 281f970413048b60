//! Shared path manipulation utilities.

use std::env;
use std::path::{Component, Path, PathBuf};

/// Resolve a user-supplied path to an absolute, normalized path.
///
/// The path is joined onto the CWD when relative and `.`/`..` are folded
/// syntactically. Symlinks are kept as given and no `\\?\` verbatim prefix
/// is introduced.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| {
        env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
    });
    normalize_syntactic(&absolute)
}

fn normalize_syntactic(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir | Component::Normal(_) => {
                components.push(component);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if let Some(Component::Normal(_)) = components.last() {
                    components.pop();
                }
            }
        }
    }
    components.into_iter().collect()
}

/// Deepest directory-or-file path that is a component-wise prefix of every
/// input. Returns `None` for an empty input or when the paths share nothing
/// (e.g. different Windows drives).
///
/// A single path is its own common ancestor.
pub fn common_ancestor<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter = paths.into_iter();
    let first = iter.next()?;
    let mut prefix: Vec<Component<'a>> = first.components().collect();

    for path in iter {
        let shared = prefix
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(shared);
        if prefix.is_empty() {
            return None;
        }
    }

    Some(prefix.into_iter().collect())
}

/// Parent of `path`, or `path` itself when it has none (filesystem root).
pub fn parent_or_self(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| path.to_path_buf(), Path::to_path_buf)
}

/// Default qBittorrent `BT_backup` directory for the current platform.
pub fn default_bt_backup_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let local = env::var_os("LOCALAPPDATA").map_or_else(
            || {
                eprintln!("[QBR-CONFIG] WARNING: LOCALAPPDATA not set, using current directory");
                PathBuf::from(".")
            },
            PathBuf::from,
        );
        local.join("qBittorrent").join("BT_backup")
    }
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .join("Library")
            .join("ApplicationSupport")
            .join("qBittorrent")
            .join("BT_backup")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        home_dir()
            .join(".local")
            .join("share")
            .join("data")
            .join("qBittorrent")
            .join("BT_backup")
    }
}

/// `$HOME` (or `%USERPROFILE%`), falling back to the temp dir with a warning.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map_or_else(
            || {
                eprintln!("[QBR-CONFIG] WARNING: HOME not set, falling back to temp dir");
                env::temp_dir()
            },
            PathBuf::from,
        )
}
