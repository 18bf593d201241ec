use std::{
    fs::File,
    path::Path,
    process::{Command, Output, Stdio},
};

use tracing::debug;

use super::{CollaboratorError, Collaborators, ServiceAction};
use crate::{config::Database, tree};

/// The real tools: `systemctl`, `rrdtool`, `mysqldump`/`mysql` and `tar`.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl Collaborators for System {
    fn copy_tree(&mut self, source: &Path, destination: &Path) -> Result<u64, CollaboratorError> {
        tree::copy_tree(source, destination)
    }

    fn service(&mut self, service: &str, action: ServiceAction) -> Result<(), CollaboratorError> {
        let action = action.to_string();
        let output = Command::new("systemctl")
            .args([action.as_str(), service])
            .output()
            .map_err(|e| run_error(e, "systemctl"))?;

        check_output(&output, "systemctl")
    }

    fn rrd_dump(&mut self, rrd: &Path, xml: &Path) -> Result<(), CollaboratorError> {
        let output = Command::new("rrdtool")
            .arg("dump")
            .arg(rrd)
            .arg(xml)
            .output()
            .map_err(|e| run_error(e, "rrdtool dump"))?;

        check_output(&output, "rrdtool dump")
    }

    fn rrd_restore(&mut self, xml: &Path, rrd: &Path) -> Result<(), CollaboratorError> {
        // -f overwrites the live file
        let output = Command::new("rrdtool")
            .args(["restore", "-f"])
            .arg(xml)
            .arg(rrd)
            .output()
            .map_err(|e| run_error(e, "rrdtool restore"))?;

        check_output(&output, "rrdtool restore")
    }

    fn database_dump(
        &mut self,
        database: &Database,
        output: File,
    ) -> Result<(), CollaboratorError> {
        let output = mysql_command("mysqldump", database)
            .stdout(Stdio::from(output))
            .output()
            .map_err(|e| run_error(e, "mysqldump"))?;

        check_output(&output, "mysqldump")
    }

    fn database_restore(
        &mut self,
        database: &Database,
        input: File,
    ) -> Result<(), CollaboratorError> {
        let output = mysql_command("mysql", database)
            .stdin(Stdio::from(input))
            .output()
            .map_err(|e| run_error(e, "mysql"))?;

        check_output(&output, "mysql")
    }

    fn compress(&mut self, source: &Path, archive: &Path) -> Result<(), CollaboratorError> {
        let parent = source.parent().unwrap_or_else(|| Path::new("."));
        let name = source
            .file_name()
            .ok_or_else(|| CollaboratorError::NoFileName(source.to_path_buf()))?;

        let output = Command::new("tar")
            .arg("-czf")
            .arg(archive)
            .arg("-C")
            .arg(parent)
            .arg(name)
            .output()
            .map_err(|e| run_error(e, "tar"))?;

        check_output(&output, "tar")
    }

    fn extract(&mut self, archive: &Path, destination: &Path) -> Result<(), CollaboratorError> {
        let output = Command::new("tar")
            .arg("-xzf")
            .arg(archive)
            .arg("-C")
            .arg(destination)
            .output()
            .map_err(|e| run_error(e, "tar"))?;

        check_output(&output, "tar")
    }
}

/// A mysql client command for `database`. The password goes through the environment so it
/// does not show up in the process list.
fn mysql_command(program: &str, database: &Database) -> Command {
    let mut command = Command::new(program);
    command.args(["-u", &database.user, &database.name]);

    if !database.password.is_empty() {
        command.env("MYSQL_PWD", &database.password);
    }

    command
}

fn run_error(source: std::io::Error, command: &'static str) -> CollaboratorError {
    CollaboratorError::RunCommand { source, command }
}

fn check_output(output: &Output, command: &'static str) -> Result<(), CollaboratorError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(CollaboratorError::CommandErrored {
            command,
            status: output.status.to_string(),
            stderr,
        });
    }

    debug!("{command} succeeded");
    Ok(())
}
