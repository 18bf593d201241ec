//! Validation report for a finished backup.
//!
//! The report only informs the operator. Nothing in it aborts a run or changes its outcome.

use core::fmt;
use std::{fs, path::Path};

use tracing::{error, info, warn};

use crate::{
    artifact::{BackupKind, DUMP_FILE_NAME},
    config::{AreaKind, Config},
    context::Context,
    rrd::ConversionFailure,
    tree::count_files,
};

/// The outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    #[allow(missing_docs)]
    Pass,
    #[allow(missing_docs)]
    Warn,
    #[allow(missing_docs)]
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// A single line of the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// What was checked.
    pub label: String,
    /// The outcome.
    pub status: Status,
    /// Human readable detail.
    pub detail: String,
}

/// The validation report of a backup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// The checks, in the order they ran.
    pub checks: Vec<Check>,
}

impl Report {
    /// Inspect the backup in `staging`.
    ///
    /// Every area expected for `kind` is counted. The dump is only expected for full backups.
    pub fn validate(config: &Config, staging: &Path, kind: BackupKind) -> Self {
        let mut report = Self::default();

        for area in config.areas() {
            if kind == BackupKind::RrdOnly && area.kind != AreaKind::RoundRobin {
                continue;
            }

            let folder = staging.join(area.backup_folder);
            let file_count = count_files(&folder);

            if file_count > 0 {
                report.push(
                    area.label,
                    Status::Pass,
                    format!("{file_count} files found in {folder:?}"),
                );
            } else {
                report.push(
                    area.label,
                    Status::Warn,
                    format!("No files found or folder missing ({folder:?})"),
                );
            }
        }

        if kind == BackupKind::Full {
            report.check_dump(&staging.join(DUMP_FILE_NAME), config.validation.minimum_dump_bytes);
        }

        report
    }

    fn check_dump(&mut self, dump: &Path, minimum_bytes: u64) {
        const LABEL: &str = "SQL dump";

        match fs::metadata(dump) {
            Ok(metadata) if metadata.len() == 0 => {
                self.push(LABEL, Status::Fail, format!("{dump:?} is empty"));
            }
            Ok(metadata) if metadata.len() <= minimum_bytes => {
                self.push(
                    LABEL,
                    Status::Warn,
                    format!(
                        "File too small ({} bytes), may be incomplete: {dump:?}",
                        metadata.len()
                    ),
                );
            }
            Ok(metadata) => {
                self.push(
                    LABEL,
                    Status::Pass,
                    format!("{} KiB at {dump:?}", metadata.len() / 1024),
                );
            }
            Err(_) => {
                self.push(LABEL, Status::Fail, format!("File not found at {dump:?}"));
            }
        }
    }

    /// Add a failed check for every file the converter rejected.
    pub fn add_conversion_failures(&mut self, failures: &[ConversionFailure]) {
        for failure in failures {
            self.push(
                "RRD conversion",
                Status::Fail,
                format!("{:?}: {}", failure.path, failure.error),
            );
        }
    }

    /// The status of the first check with `label`.
    pub fn status_of(&self, label: &str) -> Option<Status> {
        self.checks
            .iter()
            .find(|check| check.label == label)
            .map(|check| check.status)
    }

    /// Number of checks with `status`.
    pub fn count(&self, status: Status) -> usize {
        self.checks
            .iter()
            .filter(|check| check.status == status)
            .count()
    }

    /// Log every check at a level matching its status.
    pub fn log(&self, context: &Context) {
        info!("{context}Backup validation report:");

        for check in &self.checks {
            match check.status {
                Status::Pass => {
                    info!("{context}{} {}: {}", check.status, check.label, check.detail)
                }
                Status::Warn => {
                    warn!("{context}{} {}: {}", check.status, check.label, check.detail)
                }
                Status::Fail => {
                    error!("{context}{} {}: {}", check.status, check.label, check.detail)
                }
            }
        }

        info!(
            "{context}Validation complete: {} passed, {} warnings, {} failures. Review any warnings before relying on this backup.",
            self.count(Status::Pass),
            self.count(Status::Warn),
            self.count(Status::Fail)
        );
    }

    fn push(&mut self, label: &str, status: Status, detail: String) {
        self.checks.push(Check {
            label: label.to_string(),
            status,
            detail,
        });
    }
}
