//! The interactive menu.
//!

use std::io::{self, BufRead, Write};

use chrono::Local;
use thiserror::Error;

use crate::{
    artifact::{self, Artifact, BackupKind, DUMP_FILE_NAME, ListArtifactsError},
    backup::{BackupError, BackupRunner},
    collaborator::Collaborators,
    config::{AreaKind, Config},
    restore::{RestoreError, RestoreRunner},
};

/// An entry of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    #[allow(missing_docs)]
    FullBackup,
    #[allow(missing_docs)]
    RrdBackup,
    #[allow(missing_docs)]
    Restore,
    #[allow(missing_docs)]
    Exit,
}

impl MenuChoice {
    /// Every entry, in menu order.
    pub const ALL: [Self; 4] = [Self::FullBackup, Self::RrdBackup, Self::Restore, Self::Exit];

    /// The entry for a 1-based menu number.
    pub fn from_selection(input: &str) -> Option<Self> {
        let number: usize = input.trim().parse().ok()?;
        Self::ALL.get(number.checked_sub(1)?).copied()
    }

    /// The text shown in the menu.
    pub fn label(&self) -> &'static str {
        match self {
            Self::FullBackup => BackupKind::Full.operation(),
            Self::RrdBackup => BackupKind::RrdOnly.operation(),
            Self::Restore => "Restore",
            Self::Exit => "Exit",
        }
    }
}

/// An interactive session reading choices from `input` and writing prompts to `output`.
pub struct Session<'a, R: BufRead, W: Write, C: Collaborators> {
    config: &'a Config,
    collaborators: &'a mut C,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write, C: Collaborators> Session<'a, R, W, C> {
    #[allow(missing_docs)]
    pub fn new(config: &'a Config, collaborators: &'a mut C, input: R, output: W) -> Self {
        Self {
            config,
            collaborators,
            input,
            output,
        }
    }

    /// Show the menu until the operator exits or an operation fails.
    pub fn run(&mut self) -> Result<(), SessionError> {
        self.say("Cacti Backup & Restore Tool")?;

        loop {
            match self.menu()? {
                MenuChoice::FullBackup => self.backup(BackupKind::Full)?,
                MenuChoice::RrdBackup => self.backup(BackupKind::RrdOnly)?,
                MenuChoice::Restore => self.restore()?,
                MenuChoice::Exit => {
                    self.say("Goodbye.")?;
                    return Ok(());
                }
            }
        }
    }

    /// Ask for a menu entry until a valid one is given. End of input exits.
    fn menu(&mut self) -> Result<MenuChoice, SessionError> {
        self.say("")?;
        for (index, choice) in MenuChoice::ALL.iter().enumerate() {
            self.say(&format!("  {}. {}", index + 1, choice.label()))?;
        }

        loop {
            let Some(line) = self.prompt("Select an option [1-4]: ")? else {
                return Ok(MenuChoice::Exit);
            };

            match MenuChoice::from_selection(&line) {
                Some(choice) => return Ok(choice),
                None => self.say(&format!(
                    "Invalid choice '{}', enter a number between 1 and 4.",
                    line.trim()
                ))?,
            }
        }
    }

    fn backup(&mut self, kind: BackupKind) -> Result<(), SessionError> {
        self.explain_backup(kind)?;
        if !self.confirm("Do you want to proceed? Type 'yes' to continue: ")? {
            self.say("Backup cancelled.")?;
            return Ok(());
        }

        let staging = self
            .config
            .backup_root
            .join(artifact::staging_name(kind, Local::now()));

        if staging.exists() {
            self.say(&format!(
                "{staging:?} already exists, files in it will be overwritten."
            ))?;
            if !self.confirm("Overwrite it? Type 'yes' to continue: ")? {
                self.say("Backup cancelled.")?;
                return Ok(());
            }
        }

        let summary = BackupRunner::new(self.config, self.collaborators).run(kind, &staging)?;

        if !self.confirm(
            "Do you want to compress the backup into a single .tar.gz file? Type 'yes' to proceed: ",
        )? {
            self.say(&format!("Compression skipped. Backup is at {:?}", summary.staging))?;
            return Ok(());
        }

        let archive =
            BackupRunner::new(self.config, self.collaborators).compress(&summary.staging)?;
        self.say(&format!("Backup finished: {archive:?}"))?;

        Ok(())
    }

    fn restore(&mut self) -> Result<(), SessionError> {
        let artifacts = RestoreRunner::new(self.config, self.collaborators).list()?;

        if artifacts.is_empty() {
            self.say(&format!(
                "No backups found in {:?}.",
                self.config.backup_root
            ))?;
            return Ok(());
        }

        self.say("Available backups:")?;
        for (index, artifact) in artifacts.iter().enumerate() {
            self.say(&format!("  {}. {artifact}", index + 1))?;
        }

        let Some(artifact) = self.select_artifact(&artifacts)? else {
            self.say("Restore cancelled.")?;
            return Ok(());
        };

        self.explain_restore(&artifact)?;
        if !self.confirm("Do you want to proceed? Type 'yes' to continue: ")? {
            self.say("Restore cancelled.")?;
            return Ok(());
        }

        match RestoreRunner::new(self.config, self.collaborators).restore(&artifact) {
            Err(RestoreError::NothingToRestore(path)) => {
                self.say(&format!("{path:?} is not a backup, nothing was restored."))
            }
            result => {
                result?;
                self.say("Restore complete.")
            }
        }?;

        Ok(())
    }

    /// Ask for a backup number until a valid one is given. `0` or end of input cancels.
    fn select_artifact(
        &mut self,
        artifacts: &[Artifact],
    ) -> Result<Option<Artifact>, SessionError> {
        let message = format!("Select a backup [1-{}, 0 to cancel]: ", artifacts.len());

        loop {
            let Some(line) = self.prompt(&message)? else {
                return Ok(None);
            };

            match line.trim().parse::<usize>() {
                Ok(0) => return Ok(None),
                Ok(number) => {
                    if let Some(artifact) = artifacts.get(number - 1) {
                        return Ok(Some(artifact.clone()));
                    }
                }
                Err(_) => {}
            }

            self.say(&format!(
                "Invalid choice '{}', enter a number between 0 and {}.",
                line.trim(),
                artifacts.len()
            ))?;
        }
    }

    fn explain_backup(&mut self, kind: BackupKind) -> Result<(), SessionError> {
        let config = self.config;

        self.say(&format!("\n{kind} overview:"))?;
        for area in config.areas() {
            match area.kind {
                AreaKind::Files if kind == BackupKind::Full => {
                    self.say(&format!("  - {} from {:?}", area.label, area.live_path))?
                }
                AreaKind::Files => {}
                AreaKind::RoundRobin => self.say(&format!(
                    "  - {} from {:?}, exported to XML",
                    area.label, area.live_path
                ))?,
            }
        }
        if kind == BackupKind::Full {
            self.say(&format!(
                "  - A dump of the '{}' database",
                config.database.name
            ))?;
        }
        self.say(&format!(
            "The poller ({}) is stopped while the backup runs.",
            config.poller.service
        ))?;
        self.say(&format!("Backup will be stored in: {:?}", config.backup_root))
    }

    fn explain_restore(&mut self, artifact: &Artifact) -> Result<(), SessionError> {
        let config = self.config;

        self.say("\nRestore overview:")?;
        self.say("  - Overwrites the live files of every area present in the backup:")?;
        for area in config.areas() {
            self.say(&format!("      {} -> {:?}", area.label, area.live_path))?;
        }
        self.say(&format!(
            "  - Reloads the '{}' database if the backup holds {DUMP_FILE_NAME}",
            config.database.name
        ))?;
        self.say(&format!("Source backup: {:?}", artifact.path))
    }

    fn confirm(&mut self, message: &str) -> Result<bool, SessionError> {
        Ok(self
            .prompt(message)?
            .is_some_and(|answer| answer.trim().eq_ignore_ascii_case("yes")))
    }

    /// Write `message` and read a line. `None` at end of input.
    fn prompt(&mut self, message: &str) -> Result<Option<String>, SessionError> {
        write!(self.output, "{message}").map_err(|e| SessionError::Io(e, "write prompt"))?;
        self.output
            .flush()
            .map_err(|e| SessionError::Io(e, "flush prompt"))?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| SessionError::Io(e, "read input"))?;

        if read == 0 {
            return Ok(None);
        }

        Ok(Some(line))
    }

    fn say(&mut self, message: &str) -> Result<(), SessionError> {
        writeln!(self.output, "{message}").map_err(|e| SessionError::Io(e, "write output"))
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to {1}: {0}")]
    Io(#[source] io::Error, &'static str),

    #[error("Backup failed:\n{0}")]
    Backup(#[from] BackupError),

    #[error("Restore failed:\n{0}")]
    Restore(#[from] RestoreError),

    #[error("Could not list backups:\n{0}")]
    List(#[from] ListArtifactsError),
}
