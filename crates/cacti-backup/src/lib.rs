//! # cacti-backup
//! Backup and restore of a Cacti installation: web files, config, RRD files and the database.
//!

pub mod artifact;
pub mod backup;
pub mod collaborator;
pub mod config;
mod context;
mod poller;
pub mod report;
pub mod restore;
pub mod rrd;
pub mod session;
mod tree;

pub use artifact::{Artifact, BackupKind, Compression, DUMP_FILE_NAME, list_artifacts};
pub use backup::{BackupError, BackupRunner, BackupSummary};
pub use collaborator::{CollaboratorError, Collaborators, ServiceAction, System};
pub use config::{Config, LoadConfigError, PollerPolicy};
pub use context::Context;
pub use report::{Report, Status};
pub use restore::{RestoreError, RestoreRunner, RestoreSummary};
pub use session::{MenuChoice, Session, SessionError};
pub use tree::{copy_tree, count_files};
