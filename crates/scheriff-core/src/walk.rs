//! File walking and the manifest-file filter

use std::path::Path;
use walkdir::WalkDir;

use crate::error::{Result, ValidatorError};

const MANIFEST_SUFFIXES: &[&str] = &[".yaml", ".yml"];

/// Whether a file name looks like a YAML manifest (case-sensitive suffix)
pub fn is_manifest_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .is_some_and(|name| MANIFEST_SUFFIXES.iter().any(|s| name.ends_with(s)))
}

/// Apply `visit` to every regular file under `path` accepted by `filter`.
///
/// A file path is visited directly. A directory is listed one level deep,
/// or fully when `recursive` is set, with entries in file-name order.
/// An entry below `path` that cannot be resolved (a dangling symlink, an
/// unreadable sub-directory) is handed to `visit` when it passes `filter`,
/// so the caller decides how to treat the read failure. Stops at the first
/// error on `path` itself, a symlink loop, or the first error returned by
/// `visit`.
pub fn walk<F, V>(path: &Path, recursive: bool, filter: F, mut visit: V) -> Result<()>
where
    F: Fn(&Path) -> bool,
    V: FnMut(&Path) -> Result<()>,
{
    if !path.exists() {
        return Err(ValidatorError::Walk {
            path: path.to_path_buf(),
            message: "no such file or directory".to_string(),
        });
    }

    let mut walker = WalkDir::new(path).follow_links(true).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => match e.path() {
                Some(unresolved) if e.depth() > 0 && e.loop_ancestor().is_none() => {
                    if filter(unresolved) {
                        visit(unresolved)?;
                    } else {
                        tracing::debug!(path = %unresolved.display(), error = %e, "skipping unresolved entry");
                    }
                    continue;
                }
                _ => {
                    return Err(ValidatorError::Walk {
                        path: e.path().unwrap_or(path).to_path_buf(),
                        message: e.to_string(),
                    });
                }
            },
        };

        if !entry.file_type().is_file() || !filter(entry.path()) {
            continue;
        }

        tracing::trace!(file = %entry.path().display(), "visiting");
        visit(entry.path())?;
    }

    Ok(())
}
