//! Chart representation and file traversal

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{CoreError, Result};

/// A chart: a directory tree of configuration files treated as one unit.
///
/// The chart is owned by the caller; this crate only reads it. Generators
/// launched from directives may write into it.
#[derive(Debug, Clone)]
pub struct Chart {
    root: PathBuf,
}

impl Chart {
    /// Open a chart rooted at the given directory.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(CoreError::ChartNotFound {
                path: path.display().to_string(),
            });
        }
        let root = path.canonicalize()?;
        Ok(Self { root })
    }

    /// Absolute chart root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All regular files under the chart root, in lexicographic path order.
    ///
    /// Generator execution is order-sensitive, so the traversal must be
    /// stable across runs and platforms. Files are collected first and then
    /// sorted on their full path.
    pub fn walk_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}
