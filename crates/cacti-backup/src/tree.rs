//! Native recursive directory copy and file counting.
//!

use std::{fs, path::Path};

use walkdir::WalkDir;

use crate::collaborator::CollaboratorError;

/// Recursively copy `source` into `destination`, overwriting files that exist in both.
///
/// Files only present at the destination are left alone. Returns the number of files copied.
pub fn copy_tree(source: &Path, destination: &Path) -> Result<u64, CollaboratorError> {
    let mut copied = 0;

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|_| CollaboratorError::OutsideSource(entry.path().to_path_buf()))?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| CollaboratorError::Io {
                source: e,
                action: "create directory",
                path: target.clone(),
            })?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
            copied += 1;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| CollaboratorError::Io {
                source: e,
                action: "copy file",
                path: entry.path().to_path_buf(),
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<(), CollaboratorError> {
    let points_to = fs::read_link(link).map_err(|e| CollaboratorError::Io {
        source: e,
        action: "read symlink",
        path: link.to_path_buf(),
    })?;

    if let Err(e) = fs::remove_file(target) {
        if e.kind() != std::io::ErrorKind::NotFound {
            return Err(CollaboratorError::Io {
                source: e,
                action: "replace symlink",
                path: target.to_path_buf(),
            });
        }
    }

    std::os::unix::fs::symlink(points_to, target).map_err(|e| CollaboratorError::Io {
        source: e,
        action: "create symlink",
        path: target.to_path_buf(),
    })
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<(), CollaboratorError> {
    fs::copy(link, target)
        .map(|_| ())
        .map_err(|e| CollaboratorError::Io {
            source: e,
            action: "copy file",
            path: link.to_path_buf(),
        })
}

/// Count the files below `directory`, zero if it does not exist.
pub fn count_files(directory: &Path) -> usize {
    if !directory.is_dir() {
        return 0;
    }

    WalkDir::new(directory)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| !entry.file_type().is_dir())
        .count()
}
