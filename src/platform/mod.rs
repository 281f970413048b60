//! Host OS helpers: process liveness and directory access checks.

pub mod process;

use std::path::Path;

use crate::core::errors::{RelinkError, Result};

/// Fail unless `path` is an existing, readable directory.
pub fn ensure_readable_dir(path: &Path) -> Result<()> {
    let meta = std::fs::metadata(path).map_err(|source| RelinkError::io(path, source))?;
    if !meta.is_dir() {
        return Err(RelinkError::InvalidConfig {
            details: format!("{} is not a directory", path.display()),
        });
    }

    #[cfg(unix)]
    {
        use nix::unistd::{AccessFlags, access};
        access(path, AccessFlags::R_OK | AccessFlags::X_OK).map_err(|errno| {
            RelinkError::io(path, std::io::Error::from_raw_os_error(errno as i32))
        })?;
    }
    #[cfg(not(unix))]
    {
        std::fs::read_dir(path).map_err(|source| RelinkError::io(path, source))?;
    }
    Ok(())
}
