//! Backing up the installation into a staging directory.
//!

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    artifact::{self, BackupKind, DUMP_FILE_NAME},
    collaborator::{CollaboratorError, Collaborators},
    config::{Area, AreaKind, Config},
    context::Context,
    poller,
    report::Report,
    rrd::{self, ConversionFailure},
};

/// The result of a finished backup run.
#[derive(Debug)]
pub struct BackupSummary {
    /// The staging directory holding the backup.
    pub staging: PathBuf,

    /// The validation report, including any conversion failures.
    pub report: Report,

    /// RRD files that could not be converted.
    pub conversion_failures: Vec<ConversionFailure>,
}

/// Runs backups for a config.
pub struct BackupRunner<'a, C: Collaborators> {
    config: &'a Config,
    collaborators: &'a mut C,
}

impl<'a, C: Collaborators> BackupRunner<'a, C> {
    #[allow(missing_docs)]
    pub fn new(config: &'a Config, collaborators: &'a mut C) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Back up into `staging`, creating it once the poller is stopped.
    ///
    /// The poller is restarted afterwards even if stopping it or the copy failed.
    /// Existing files in `staging` are overwritten, so re-running into the same directory is safe.
    pub fn run(&mut self, kind: BackupKind, staging: &Path) -> Result<BackupSummary, BackupError> {
        let mut context = Context::new(kind.operation());

        if let Err(error) = poller::stop(self.collaborators, &self.config.poller, &mut context) {
            poller::start(self.collaborators, &self.config.poller, &mut context);
            return Err(BackupError::StopPoller(error));
        }

        let captured = self.capture(kind, staging, &mut context);

        poller::start(self.collaborators, &self.config.poller, &mut context);

        let conversion_failures = match captured {
            Ok(failures) => failures,
            Err(error) => {
                context.current_context = "Abort";
                error!("{context}Backup aborted, partial backup left at {staging:?}");
                return Err(error);
            }
        };

        context.current_context = "Validate";
        let mut report = Report::validate(self.config, staging, kind);
        report.add_conversion_failures(&conversion_failures);
        report.log(&context);

        Ok(BackupSummary {
            staging: staging.to_path_buf(),
            report,
            conversion_failures,
        })
    }

    /// Create `staging`, copy and convert every area of `kind`, then dump the database for full
    /// backups.
    fn capture(
        &mut self,
        kind: BackupKind,
        staging: &Path,
        context: &mut Context,
    ) -> Result<Vec<ConversionFailure>, BackupError> {
        let config = self.config;
        let mut conversion_failures = Vec::new();

        context.current_context = "Prepare";
        fs::create_dir_all(staging).map_err(|e| BackupError::Io(e, "create staging directory"))?;
        info!("{context}Backing up into {staging:?}");

        for area in config.areas() {
            let destination = staging.join(area.backup_folder);

            match area.kind {
                AreaKind::Files if kind == BackupKind::Full => {
                    context.current_context = "Copy Files";
                    let copied = self
                        .collaborators
                        .copy_tree(area.live_path, &destination)
                        .map_err(|source| BackupError::Copy {
                            label: area.label.to_string(),
                            source,
                        })?;
                    info!(
                        "{context}Backed up {} ({copied} files) {:?} -> {destination:?}",
                        area.label, area.live_path
                    );
                }
                AreaKind::Files => {}
                AreaKind::RoundRobin => {
                    context.current_context = "Convert RRD";
                    conversion_failures.extend(self.convert(area, &destination, context)?);
                }
            }
        }

        if kind == BackupKind::Full {
            context.current_context = "Dump Database";
            let dump_path = staging.join(DUMP_FILE_NAME);
            info!("{context}Dumping database '{}'", config.database.name);

            let dump =
                File::create(&dump_path).map_err(|e| BackupError::Io(e, "create dump file"))?;
            self.collaborators
                .database_dump(&config.database, dump)
                .map_err(BackupError::Dump)?;

            info!("{context}Database dumped to {dump_path:?}");
        }

        Ok(conversion_failures)
    }

    /// Convert every round-robin file of `area` into `destination`.
    ///
    /// A missing RRD directory is skipped. A file the converter rejects is recorded and the
    /// remaining files are still converted.
    fn convert(
        &mut self,
        area: Area<'_>,
        destination: &Path,
        context: &Context,
    ) -> Result<Vec<ConversionFailure>, BackupError> {
        if !area.live_path.is_dir() {
            warn!(
                "{context}{} directory {:?} does not exist, skipping",
                area.label, area.live_path
            );
            return Ok(Vec::new());
        }

        let pairs = rrd::snapshot_pairs(area.live_path, destination).map_err(BackupError::FindRrd)?;
        let mut failures = Vec::new();

        for pair in &pairs {
            if let Some(parent) = pair.xml.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| BackupError::Io(e, "create snapshot directory"))?;
            }

            if let Err(error) = self.collaborators.rrd_dump(&pair.rrd, &pair.xml) {
                warn!("{context}Could not convert {:?}: {error}", pair.rrd);
                failures.push(ConversionFailure {
                    path: pair.rrd.clone(),
                    error: error.to_string(),
                });
            }
        }

        info!(
            "{context}Exported {} of {} RRD files {:?} -> {destination:?}",
            pairs.len() - failures.len(),
            pairs.len(),
            area.live_path
        );

        Ok(failures)
    }

    /// Compress `staging` into an archive next to it, then remove `staging`.
    ///
    /// The directory is only removed once the archiver succeeded and the archive exists.
    pub fn compress(&mut self, staging: &Path) -> Result<PathBuf, BackupError> {
        let mut context = Context::new("Compress");
        context.current_context = "Archive";

        let archive = artifact::archive_path(staging);
        info!("{context}Compressing {staging:?} into {archive:?}");

        self.collaborators
            .compress(staging, &archive)
            .map_err(BackupError::Compress)?;

        if !archive.is_file() {
            return Err(BackupError::ArchiveMissing(archive));
        }

        context.current_context = "Remove Staging";
        fs::remove_dir_all(staging).map_err(|e| BackupError::Io(e, "remove staging directory"))?;
        info!("{context}Original folder removed, final backup: {archive:?}");

        Ok(archive)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Failed to {1}: {0}")]
    Io(#[source] io::Error, &'static str),

    #[error("Failed to stop the poller:\n{0}")]
    StopPoller(#[source] CollaboratorError),

    #[error("Failed to back up {label}:\n{source}")]
    Copy {
        label: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("Failed to find RRD files:\n{0}")]
    FindRrd(#[source] CollaboratorError),

    #[error("Failed to dump the database:\n{0}")]
    Dump(#[source] CollaboratorError),

    #[error("Failed to compress the backup:\n{0}")]
    Compress(#[source] CollaboratorError),

    #[error("Archiver reported success but {0:?} does not exist")]
    ArchiveMissing(PathBuf),
}
