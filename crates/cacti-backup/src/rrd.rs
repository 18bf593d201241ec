//! Mapping between live round-robin files and their XML snapshots.
//!
//! The snapshot of `<rrd directory>/<relative path>` lives at
//! `<snapshot directory>/<relative path>.xml`. The suffix is appended to the full file name so
//! the mapping is reversible for any file name.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::collaborator::CollaboratorError;

const RRD_EXTENSION: &str = "rrd";
const SNAPSHOT_SUFFIX: &str = ".xml";

/// A pair of a live round-robin file and its snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPair {
    /// The live `.rrd` file.
    pub rrd: PathBuf,
    /// The XML snapshot.
    pub xml: PathBuf,
}

/// A file that could not be converted. The run carries on without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    /// The file passed to the converter.
    pub path: PathBuf,
    /// What went wrong.
    pub error: String,
}

/// Find every `.rrd` file below `rrd_directory` and pair it with its snapshot location.
pub fn snapshot_pairs(
    rrd_directory: &Path,
    snapshot_directory: &Path,
) -> Result<Vec<SnapshotPair>, CollaboratorError> {
    let mut pairs = Vec::new();

    for entry in WalkDir::new(rrd_directory).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file()
            || entry.path().extension().is_none_or(|e| e != RRD_EXTENSION)
        {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(rrd_directory)
            .map_err(|_| CollaboratorError::OutsideSource(entry.path().to_path_buf()))?;

        let mut xml = snapshot_directory.join(relative).into_os_string();
        xml.push(SNAPSHOT_SUFFIX);

        pairs.push(SnapshotPair {
            rrd: entry.path().to_path_buf(),
            xml: PathBuf::from(xml),
        });
    }

    Ok(pairs)
}

/// Find every snapshot below `snapshot_directory` and pair it with its live location.
pub fn restore_pairs(
    snapshot_directory: &Path,
    rrd_directory: &Path,
) -> Result<Vec<SnapshotPair>, CollaboratorError> {
    let mut pairs = Vec::new();

    for entry in WalkDir::new(snapshot_directory).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(snapshot_directory)
            .map_err(|_| CollaboratorError::OutsideSource(entry.path().to_path_buf()))?;

        let Some(live_relative) = strip_snapshot_suffix(relative) else {
            continue;
        };

        pairs.push(SnapshotPair {
            rrd: rrd_directory.join(live_relative),
            xml: entry.path().to_path_buf(),
        });
    }

    Ok(pairs)
}

fn strip_snapshot_suffix(relative: &Path) -> Option<PathBuf> {
    let name = relative.file_name()?.to_str()?;
    let live_name = name.strip_suffix(SNAPSHOT_SUFFIX)?;
    if live_name.is_empty() {
        return None;
    }

    Some(relative.with_file_name(OsString::from(live_name)))
}
