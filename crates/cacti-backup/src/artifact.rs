//! Backup artifacts: naming, parsing and listing.
//!

use core::{fmt, str::FromStr};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use thiserror::Error;
use tracing::warn;

/// The file name of the database dump inside a backup.
pub const DUMP_FILE_NAME: &str = "cacti.sql";

const NAME_PREFIX: &str = "cacti-backup-";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const ARCHIVE_EXTENSIONS: [&str; 2] = [".tar.gz", ".tgz"];

/// What a backup contains.
#[derive(Hash, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackupKind {
    /// Every installation area and the database dump.
    Full,

    /// Only the RRD snapshots.
    RrdOnly,
}

impl BackupKind {
    /// The name segment for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::RrdOnly => "rrd",
        }
    }

    /// The operation name shown in the menu and log prefixes.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Full => "Full Backup",
            Self::RrdOnly => "RRD-only Backup",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation())
    }
}

impl FromStr for BackupKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "rrd" => Ok(Self::RrdOnly),
            _ => Err(format!("invalid backup kind '{s}'")),
        }
    }
}

/// Whether an artifact is a plain directory or a compressed archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    #[allow(missing_docs)]
    Plain,
    #[allow(missing_docs)]
    Compressed,
}

/// A backup found in the backup root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// The directory or archive.
    pub path: PathBuf,

    /// The kind, if the name follows the naming scheme.
    pub kind: Option<BackupKind>,

    /// The creation time, if the name carries one.
    pub created: Option<NaiveDateTime>,

    /// Directory or archive.
    pub compression: Compression,
}

impl Artifact {
    /// Describe the entry at `path`, `None` if it is neither a directory nor an archive.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();

        let (stem, compression) = if path.is_dir() {
            (name.as_str(), Compression::Plain)
        } else if path.is_file() {
            let stem = ARCHIVE_EXTENSIONS
                .iter()
                .find_map(|extension| name.strip_suffix(extension))?;
            (stem, Compression::Compressed)
        } else {
            return None;
        };

        let (kind, created) = parse_stem(stem);

        Some(Self {
            path,
            kind,
            created,
            compression,
        })
    }

    /// The file name of the artifact.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;

        let mut details = Vec::new();
        if let Some(kind) = self.kind {
            details.push(kind.as_str().to_string());
        }
        if let Some(created) = self.created {
            details.push(created.format("%Y-%m-%d %H:%M:%S").to_string());
        }
        if self.compression == Compression::Compressed {
            details.push("compressed".to_string());
        }

        if !details.is_empty() {
            write!(f, " ({})", details.join(", "))?;
        }

        Ok(())
    }
}

/// Recover the kind and timestamp from an artifact name without its archive extension.
///
/// Accepts `cacti-backup-<kind>-<YYYYmmdd-HHMMSS>` and the older `cacti-backup-<YYYYmmdd>`.
fn parse_stem(stem: &str) -> (Option<BackupKind>, Option<NaiveDateTime>) {
    let Some(rest) = stem.strip_prefix(NAME_PREFIX) else {
        return (None, None);
    };

    if let Some((kind, timestamp)) = rest.split_once('-') {
        if let Ok(kind) = kind.parse::<BackupKind>() {
            let created = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok();
            return (Some(kind), created);
        }
    }

    let created = NaiveDate::parse_from_str(rest, "%Y%m%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0));

    (created.map(|_| BackupKind::Full), created)
}

/// The staging directory name for a backup of `kind` started at `now`.
pub fn staging_name(kind: BackupKind, now: DateTime<Local>) -> String {
    format!(
        "{NAME_PREFIX}{}-{}",
        kind.as_str(),
        now.format(TIMESTAMP_FORMAT)
    )
}

/// The archive a staging directory is compressed into, next to it.
pub fn archive_path(staging: &Path) -> PathBuf {
    let mut name = staging.file_name().unwrap_or_default().to_os_string();
    name.push(".tar.gz");
    staging.with_file_name(name)
}

/// List the artifacts in `backup_root`, sorted by name.
///
/// The timestamped names make this oldest first. A missing root has no artifacts.
pub fn list_artifacts(backup_root: &Path) -> Result<Vec<Artifact>, ListArtifactsError> {
    let directory = match fs::read_dir(backup_root) {
        Ok(directory) => directory,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(error) => return Err(ListArtifactsError::ReadRoot(error)),
    };

    let mut artifacts: Vec<Artifact> = directory
        .filter_map(|entry| match entry {
            Ok(entry) => Artifact::from_path(entry.path()),
            Err(error) => {
                warn!("Could not read entry in {backup_root:?}: {error}");
                None
            }
        })
        .collect();

    artifacts.sort_by_key(Artifact::name);

    Ok(artifacts)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ListArtifactsError {
    #[error("Failed to read the backup root:\n{0}")]
    ReadRoot(#[source] io::Error),
}
