//! External tools the backup and restore runs are sequenced around.
//!

use core::fmt;
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::config::Database;

mod system;

pub use system::System;

/// Action for the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    #[allow(missing_docs)]
    Stop,
    #[allow(missing_docs)]
    Start,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Start => write!(f, "start"),
        }
    }
}

/// The external tools a run depends on, one method per tool contract.
///
/// Every call blocks until the tool finishes. There is no timeout.
pub trait Collaborators {
    /// Recursively copy `source` into `destination`, overwriting existing files and never
    /// deleting files absent from `source`. Returns the number of files copied.
    fn copy_tree(&mut self, source: &Path, destination: &Path) -> Result<u64, CollaboratorError>;

    /// Stop or start a service.
    fn service(&mut self, service: &str, action: ServiceAction) -> Result<(), CollaboratorError>;

    /// Write the XML serialization of the round-robin file `rrd` to `xml`.
    fn rrd_dump(&mut self, rrd: &Path, xml: &Path) -> Result<(), CollaboratorError>;

    /// Rebuild the round-robin file `rrd` from the XML snapshot `xml`, replacing it.
    fn rrd_restore(&mut self, xml: &Path, rrd: &Path) -> Result<(), CollaboratorError>;

    /// Write the full logical dump of the database into `output`.
    fn database_dump(&mut self, database: &Database, output: File)
    -> Result<(), CollaboratorError>;

    /// Apply the dump read from `input` to the database.
    fn database_restore(
        &mut self,
        database: &Database,
        input: File,
    ) -> Result<(), CollaboratorError>;

    /// Compress `source` into `archive`, keeping `source` as the single top-level folder.
    fn compress(&mut self, source: &Path, archive: &Path) -> Result<(), CollaboratorError>;

    /// Extract `archive` into the existing directory `destination`.
    fn extract(&mut self, archive: &Path, destination: &Path) -> Result<(), CollaboratorError>;
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Failed to run {command}:\n{source}")]
    RunCommand {
        #[source]
        source: io::Error,
        command: &'static str,
    },

    #[error("{command} exited with {status}:\n{stderr}")]
    CommandErrored {
        command: &'static str,
        status: String,
        stderr: String,
    },

    #[error("Failed to {action} {path:?}: {source}")]
    Io {
        #[source]
        source: io::Error,
        action: &'static str,
        path: PathBuf,
    },

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Entry {0:?} is outside of the copied directory")]
    OutsideSource(PathBuf),

    #[error("Path {0:?} has no file name")]
    NoFileName(PathBuf),
}
