//! Backup tool config
//!

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to do when the poller service cannot be stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollerPolicy {
    /// Warn and carry on, risking a snapshot taken while the poller writes.
    #[default]
    BestEffort,

    /// Abort the operation before anything is copied.
    FailFast,
}

/// The background poller that writes into the RRD files and database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poller {
    /// The service manager unit running the poller.
    pub service: String,

    /// How a failed stop is treated. A failed start is always a warning.
    pub policy: PollerPolicy,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            service: "cron".into(),
            policy: PollerPolicy::default(),
        }
    }
}

/// Credentials and name of the monitoring database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    /// The database user.
    pub user: String,

    /// The database password, empty for none.
    pub password: String,

    /// The database to dump and reload.
    pub name: String,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            user: "root".into(),
            password: String::new(),
            name: "cacti".into(),
        }
    }
}

/// The round-robin database directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rrd {
    /// Label used in status lines and the validation report.
    pub label: String,

    /// Where the live `.rrd` files are.
    pub directory: PathBuf,

    /// The folder inside a backup holding the XML snapshots.
    pub backup_folder: String,
}

impl Default for Rrd {
    fn default() -> Self {
        Self {
            label: "RRD files".into(),
            directory: PathBuf::from("/var/lib/cacti/rra"),
            backup_folder: "cacti_rra".into(),
        }
    }
}

/// A directory of the installation that is copied as is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileArea {
    /// Label used in status lines and the validation report.
    pub label: String,

    /// The live location of the files.
    pub live_path: PathBuf,

    /// The folder inside a backup holding the copy.
    pub backup_folder: String,
}

/// Validation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    /// A database dump at or below this size is reported as suspicious.
    pub minimum_dump_bytes: u64,
}

impl Default for Validation {
    fn default() -> Self {
        Self {
            minimum_dump_bytes: 2048,
        }
    }
}

/// The backup tool's config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where backups are written to and listed from.
    pub backup_root: PathBuf,

    /// Parent of the scratch directories used to extract archives during restore.
    pub temporary_directory: PathBuf,

    /// Where the rolling log files are written.
    pub log_directory: PathBuf,

    /// The poller service.
    pub poller: Poller,

    /// The monitoring database.
    pub database: Database,

    /// The round-robin database directory.
    pub rrd: Rrd,

    /// The directories copied as is, in backup order.
    pub file_areas: Vec<FileArea>,

    /// Validation thresholds.
    pub validation: Validation,
}

impl Config {
    /// Tries to load a config from a toml file.
    pub fn load_toml(file_path: PathBuf) -> Result<Self, LoadConfigError> {
        if !file_path.exists() {
            return Err(LoadConfigError::NoFile);
        }

        let contents = fs::read_to_string(file_path).map_err(LoadConfigError::Read)?;
        let config = toml::from_str(&contents)?;

        Ok(config)
    }

    /// The installation-area mapping, file areas first then the RRD directory.
    ///
    /// Backup and restore both walk this list so a backup is directly restorable.
    pub fn areas(&self) -> Vec<Area<'_>> {
        self.file_areas
            .iter()
            .map(|area| Area {
                label: &area.label,
                live_path: &area.live_path,
                backup_folder: &area.backup_folder,
                kind: AreaKind::Files,
            })
            .chain(core::iter::once(Area {
                label: &self.rrd.label,
                live_path: &self.rrd.directory,
                backup_folder: &self.rrd.backup_folder,
                kind: AreaKind::RoundRobin,
            }))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backup_root: PathBuf::from("/opt/cacti_backups"),
            temporary_directory: PathBuf::from("/tmp/cacti_restore"),
            log_directory: PathBuf::from("./logs"),
            poller: Poller::default(),
            database: Database::default(),
            rrd: Rrd::default(),
            file_areas: vec![
                FileArea {
                    label: "Web files".into(),
                    live_path: PathBuf::from("/usr/share/cacti"),
                    backup_folder: "cacti_files".into(),
                },
                FileArea {
                    label: "Config files".into(),
                    live_path: PathBuf::from("/etc/cacti"),
                    backup_folder: "cacti_config".into(),
                },
            ],
            validation: Validation::default(),
        }
    }
}

/// How an area is carried into a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaKind {
    /// Copied file for file.
    Files,

    /// Every `.rrd` file converted to an XML snapshot.
    RoundRobin,
}

/// One entry of the installation-area mapping.
#[derive(Debug, Clone, Copy)]
pub struct Area<'a> {
    /// Label used in status lines.
    pub label: &'a str,

    /// The live location.
    pub live_path: &'a Path,

    /// The folder inside a backup.
    pub backup_folder: &'a str,

    /// How the area is carried.
    pub kind: AreaKind,
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("The file does not exist.")]
    NoFile,

    #[error("Failed to read the file:\n{0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to deserialize the file:\n{0}")]
    Deserialize(#[from] toml::de::Error),
}
