//! Directory-tree discovery of workflow definition files (spec §4.8).
//!
//! Grounded on `nebula_plugin::loader::PluginLoader::load_all`: a plain
//! `std::fs::read_dir` scan, tolerant of individual entry failures, rather
//! than pulling in a recursive-walk crate the teacher itself never reaches
//! for.

use std::path::{Path, PathBuf};

use crate::error::LoaderError;

const VENDORED_DIR_NAMES: &[&str] = &["node_modules", "target", ".git", "vendor"];

/// Recursively collect every `*.json` file under `root`, skipping
/// vendored-style directories by name (spec §4.8).
pub fn discover_workflow_files(root: &Path) -> Result<Vec<PathBuf>, LoaderError> {
    let mut files = Vec::new();
    walk(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), LoaderError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|err| LoaderError::DirectoryRead { path: dir.to_path_buf(), message: err.to_string() })?;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(dir = %dir.display(), error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();

        if path.is_dir() {
            if is_vendored(&path) {
                continue;
            }
            walk(&path, out)?;
        } else if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            out.push(path);
        }
    }
    Ok(())
}

fn is_vendored(path: &Path) -> bool {
    path.file_name().and_then(|name| name.to_str()).is_some_and(|name| VENDORED_DIR_NAMES.contains(&name))
}
