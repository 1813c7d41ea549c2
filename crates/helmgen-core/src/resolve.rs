//! Command name to executable path resolution

use std::path::{Path, PathBuf};

use crate::env::ExecutionContext;
use crate::error::{CoreError, Result};

/// Resolve a command-name token to an executable path.
///
/// Absolute paths pass through unmodified. A relative name containing a
/// path separator resolves against the working directory. Bare names are
/// looked up in each directory of the context's `PATH`, in listed order;
/// the first executable match wins.
pub fn resolve_command(command: &str, ctx: &ExecutionContext) -> Result<PathBuf> {
    let candidate = Path::new(command);
    if candidate.is_absolute() {
        return Ok(candidate.to_path_buf());
    }

    if command.contains(std::path::MAIN_SEPARATOR) {
        if is_executable(candidate) {
            return Ok(candidate.to_path_buf());
        }
        return Err(CoreError::CommandNotFound {
            command: command.to_string(),
        });
    }

    let path_var = ctx.get("PATH").unwrap_or("");
    for dir in std::env::split_paths(path_var) {
        let full = dir.join(command);
        if is_executable(&full) {
            return Ok(full);
        }
    }

    Err(CoreError::CommandNotFound {
        command: command.to_string(),
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
