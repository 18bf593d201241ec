//! Restoring the installation from a backup artifact.
//!

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use shared::Failure;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    artifact::{self, Artifact, Compression, DUMP_FILE_NAME, ListArtifactsError},
    collaborator::{CollaboratorError, Collaborators},
    config::{Area, AreaKind, Config},
    context::Context,
    poller,
    rrd::{self, ConversionFailure},
};

/// What a restore did.
#[derive(Debug, Default)]
pub struct RestoreSummary {
    /// Labels of the areas copied back.
    pub restored_areas: Vec<String>,

    /// Labels of the areas the backup did not contain.
    pub skipped_areas: Vec<String>,

    /// Whether a database dump was loaded.
    pub database_restored: bool,

    /// Snapshots the inverse converter rejected.
    pub conversion_failures: Vec<ConversionFailure>,
}

/// The directory a restore reads from.
#[derive(Debug)]
pub struct Workspace {
    /// The directory holding the backup folders.
    pub path: PathBuf,

    /// The scratch directory an archive was extracted into, if any.
    pub temporary: Option<TempDir>,
}

/// Runs restores for a config.
pub struct RestoreRunner<'a, C: Collaborators> {
    config: &'a Config,
    collaborators: &'a mut C,
}

impl<'a, C: Collaborators> RestoreRunner<'a, C> {
    #[allow(missing_docs)]
    pub fn new(config: &'a Config, collaborators: &'a mut C) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// The artifacts available in the backup root, sorted by name.
    pub fn list(&self) -> Result<Vec<Artifact>, ListArtifactsError> {
        artifact::list_artifacts(&self.config.backup_root)
    }

    /// Restore the live installation from `artifact`.
    ///
    /// An artifact holding no backup folder and no dump is refused before the poller is stopped.
    /// Areas missing from the backup are left untouched. Any copy or database failure aborts the
    /// restore, leaving the installation partially restored. The poller is restarted and the
    /// temporary extraction directory removed regardless.
    pub fn restore(&mut self, artifact: &Artifact) -> Result<RestoreSummary, RestoreError> {
        let mut context = Context::new("Restore");

        context.current_context = "Resolve";
        let workspace = self.resolve(artifact, &context)?;

        if !holds_backup(self.config, &workspace.path) {
            error!(
                "{context}{:?} holds no backup folder and no database dump, nothing to restore",
                artifact.path
            );
            cleanup(workspace, &mut context);
            return Err(RestoreError::NothingToRestore(artifact.path.clone()));
        }

        info!("{context}Restoring from {:?}", workspace.path);

        let applied = match poller::stop(self.collaborators, &self.config.poller, &mut context) {
            Ok(()) => {
                let applied = self.apply(&workspace.path, &mut context);
                poller::start(self.collaborators, &self.config.poller, &mut context);
                applied
            }
            Err(error) => {
                poller::start(self.collaborators, &self.config.poller, &mut context);
                Err(RestoreError::StopPoller(error))
            }
        };

        cleanup(workspace, &mut context);

        let summary = match applied {
            Ok(summary) => summary,
            Err(error) => {
                context.current_context = "Abort";
                error!("{context}Restore aborted, the installation may be partially restored");
                return Err(error);
            }
        };

        if !summary.conversion_failures.is_empty() {
            return Err(RestoreError::Conversion(summary.conversion_failures));
        }

        context.current_context = "Done";
        info!(
            "{context}Restored {} areas, skipped {}, database {}",
            summary.restored_areas.len(),
            summary.skipped_areas.len(),
            if summary.database_restored {
                "restored"
            } else {
                "not in backup"
            }
        );

        Ok(summary)
    }

    /// Turn `artifact` into a directory holding the backup folders.
    ///
    /// Archives are extracted into a fresh temporary directory. If the archive holds a single
    /// top-level directory, and it is not itself a backup folder, that directory is the workspace.
    pub fn resolve(
        &mut self,
        artifact: &Artifact,
        context: &Context,
    ) -> Result<Workspace, RestoreError> {
        if artifact.compression == Compression::Plain {
            return Ok(Workspace {
                path: artifact.path.clone(),
                temporary: None,
            });
        }

        fs::create_dir_all(&self.config.temporary_directory)
            .map_err(|e| RestoreError::Io(e, "create temporary directory root"))?;
        let temporary = tempfile::Builder::new()
            .prefix("cacti-restore-")
            .tempdir_in(&self.config.temporary_directory)
            .map_err(|e| RestoreError::Io(e, "create temporary directory"))?;

        info!(
            "{context}Extracting {:?} into {:?}",
            artifact.path,
            temporary.path()
        );
        self.collaborators
            .extract(&artifact.path, temporary.path())
            .map_err(RestoreError::Extract)?;

        let area_folders: Vec<&str> = self
            .config
            .areas()
            .iter()
            .map(|area| area.backup_folder)
            .collect();
        let path = wrapping_directory(temporary.path(), &area_folders)
            .map_err(|e| RestoreError::Io(e, "read extracted archive"))?
            .unwrap_or_else(|| temporary.path().to_path_buf());

        Ok(Workspace {
            path,
            temporary: Some(temporary),
        })
    }

    fn apply(
        &mut self,
        working: &Path,
        context: &mut Context,
    ) -> Result<RestoreSummary, RestoreError> {
        let config = self.config;
        let mut summary = RestoreSummary::default();

        for area in config.areas() {
            let folder = working.join(area.backup_folder);

            if !folder.is_dir() {
                context.current_context = "Skip Area";
                info!(
                    "{context}{} not in backup, leaving {:?} untouched",
                    area.label, area.live_path
                );
                summary.skipped_areas.push(area.label.to_string());
                continue;
            }

            match area.kind {
                AreaKind::Files => {
                    context.current_context = "Copy Files";
                    let copied = self
                        .collaborators
                        .copy_tree(&folder, area.live_path)
                        .map_err(|source| RestoreError::Copy {
                            label: area.label.to_string(),
                            source,
                        })?;
                    info!(
                        "{context}Restored {} ({copied} files) {folder:?} -> {:?}",
                        area.label, area.live_path
                    );
                }
                AreaKind::RoundRobin => {
                    context.current_context = "Convert RRD";
                    let failures = self.convert(area, &folder, context)?;
                    summary.conversion_failures.extend(failures);
                }
            }

            summary.restored_areas.push(area.label.to_string());
        }

        let dump_path = working.join(DUMP_FILE_NAME);
        context.current_context = "Restore Database";
        if dump_path.is_file() {
            info!("{context}Restoring database '{}'", config.database.name);

            let dump = File::open(&dump_path).map_err(|e| RestoreError::Io(e, "open dump file"))?;
            self.collaborators
                .database_restore(&config.database, dump)
                .map_err(RestoreError::Database)?;

            summary.database_restored = true;
            info!("{context}Database restored from {dump_path:?}");
        } else {
            info!("{context}No database dump in backup, skipping");
        }

        Ok(summary)
    }

    /// Rebuild every live round-robin file from its snapshot in `folder`.
    fn convert(
        &mut self,
        area: Area<'_>,
        folder: &Path,
        context: &Context,
    ) -> Result<Vec<ConversionFailure>, RestoreError> {
        let pairs =
            rrd::restore_pairs(folder, area.live_path).map_err(RestoreError::FindSnapshots)?;
        let mut failures = Vec::new();

        for pair in &pairs {
            if let Some(parent) = pair.rrd.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| RestoreError::Io(e, "create RRD directory"))?;
            }

            if let Err(error) = self.collaborators.rrd_restore(&pair.xml, &pair.rrd) {
                warn!("{context}Could not rebuild {:?}: {error}", pair.rrd);
                failures.push(ConversionFailure {
                    path: pair.xml.clone(),
                    error: error.to_string(),
                });
            }
        }

        info!(
            "{context}Rebuilt {} of {} RRD files {folder:?} -> {:?}",
            pairs.len() - failures.len(),
            pairs.len(),
            area.live_path
        );

        Ok(failures)
    }
}

/// Whether `directory` holds at least one backup folder or a database dump.
fn holds_backup(config: &Config, directory: &Path) -> bool {
    config
        .areas()
        .iter()
        .any(|area| directory.join(area.backup_folder).is_dir())
        || directory.join(DUMP_FILE_NAME).is_file()
}

/// The only entry of `directory` if it is a directory wrapping the backup folders.
fn wrapping_directory(directory: &Path, area_folders: &[&str]) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(directory)?.collect::<Result<Vec<_>, _>>()?;

    if entries.len() != 1 {
        return Ok(None);
    }

    match entries.pop() {
        Some(entry)
            if entry.file_type()?.is_dir()
                && !area_folders.iter().any(|folder| entry.file_name() == *folder) =>
        {
            Ok(Some(entry.path()))
        }
        _ => Ok(None),
    }
}

/// Remove the temporary extraction directory, if one was made. A failure is only a warning.
fn cleanup(workspace: Workspace, context: &mut Context) {
    let Some(temporary) = workspace.temporary else {
        return;
    };

    context.current_context = "Cleanup";
    let path = temporary.path().to_path_buf();

    if temporary
        .close()
        .or_warn(&format!("{context}Could not remove temporary directory {path:?}"))
        .is_some()
    {
        info!("{context}Removed temporary directory {path:?}");
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("Failed to {1}: {0}")]
    Io(#[source] io::Error, &'static str),

    #[error("{0:?} is not a backup, it holds no backup folder and no database dump")]
    NothingToRestore(PathBuf),

    #[error("Failed to extract the archive:\n{0}")]
    Extract(#[source] CollaboratorError),

    #[error("Failed to stop the poller:\n{0}")]
    StopPoller(#[source] CollaboratorError),

    #[error("Failed to restore {label}:\n{source}")]
    Copy {
        label: String,
        #[source]
        source: CollaboratorError,
    },

    #[error("Failed to find RRD snapshots:\n{0}")]
    FindSnapshots(#[source] CollaboratorError),

    #[error("Failed to restore the database:\n{0}")]
    Database(#[source] CollaboratorError),

    #[error("Failed to rebuild {} RRD files", .0.len())]
    Conversion(Vec<ConversionFailure>),
}
