//! # common
//!

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use cacti_backup::{
    CollaboratorError, Collaborators, Config, ServiceAction, config::Database, copy_tree,
};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const DATABASE: &str = "CREATE TABLE host (id INT, hostname VARCHAR(100));\nINSERT INTO host VALUES (1, 'router-1'), (2, 'switch-2');\nINSERT INTO settings VALUES ('path_rrdtool', '/usr/bin/rrdtool');\n";

/// A call made to the fake collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CopyTree(PathBuf, PathBuf),
    Service(String, ServiceAction),
    RrdDump(PathBuf),
    RrdRestore(PathBuf),
    DatabaseDump,
    DatabaseRestore,
    Compress(PathBuf),
    Extract(PathBuf),
}

/// How the fake archiver lays out an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLayout {
    /// The source directory is the single top-level entry.
    Wrapped,
    /// The source directory's contents are at the root.
    Flat,
}

/// Collaborators that record every call and work on the filesystem without external tools.
///
/// RRD files are "converted" by wrapping their contents in tags. Archives are JSON maps of
/// relative path to contents.
#[derive(Debug)]
pub struct Fake {
    pub calls: Vec<Call>,
    pub database: String,
    pub fail_service: Option<ServiceAction>,
    pub fail_rrd: Vec<String>,
    pub fail_copy: bool,
    pub fail_dump: bool,
    pub fail_compress: bool,
    pub layout: ArchiveLayout,
}

impl Default for Fake {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            database: DATABASE.to_string(),
            fail_service: None,
            fail_rrd: Vec::new(),
            fail_copy: false,
            fail_dump: false,
            fail_compress: false,
            layout: ArchiveLayout::Wrapped,
        }
    }
}

impl Fake {
    pub fn service_calls(&self) -> Vec<ServiceAction> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                Call::Service(_, action) => Some(*action),
                _ => None,
            })
            .collect()
    }
}

fn fake_error(command: &'static str) -> CollaboratorError {
    CollaboratorError::CommandErrored {
        command,
        status: "exit status: 1".into(),
        stderr: format!("{command} failed"),
    }
}

fn io_error(error: std::io::Error, path: &Path) -> CollaboratorError {
    CollaboratorError::Io {
        source: error,
        action: "fake io",
        path: path.to_path_buf(),
    }
}

impl Collaborators for Fake {
    fn copy_tree(&mut self, source: &Path, destination: &Path) -> Result<u64, CollaboratorError> {
        self.calls
            .push(Call::CopyTree(source.to_path_buf(), destination.to_path_buf()));
        if self.fail_copy {
            return Err(fake_error("cp"));
        }

        copy_tree(source, destination)
    }

    fn service(&mut self, service: &str, action: ServiceAction) -> Result<(), CollaboratorError> {
        self.calls.push(Call::Service(service.to_string(), action));
        if self.fail_service == Some(action) {
            return Err(fake_error("systemctl"));
        }

        Ok(())
    }

    fn rrd_dump(&mut self, rrd: &Path, xml: &Path) -> Result<(), CollaboratorError> {
        self.calls.push(Call::RrdDump(rrd.to_path_buf()));
        if self.should_fail_rrd(rrd) {
            return Err(fake_error("rrdtool dump"));
        }

        let contents = fs::read_to_string(rrd).map_err(|e| io_error(e, rrd))?;
        fs::write(xml, format!("<rrd>{contents}</rrd>")).map_err(|e| io_error(e, xml))
    }

    fn rrd_restore(&mut self, xml: &Path, rrd: &Path) -> Result<(), CollaboratorError> {
        self.calls.push(Call::RrdRestore(xml.to_path_buf()));
        if self.should_fail_rrd(rrd) {
            return Err(fake_error("rrdtool restore"));
        }

        let contents = fs::read_to_string(xml).map_err(|e| io_error(e, xml))?;
        let contents = contents
            .strip_prefix("<rrd>")
            .and_then(|contents| contents.strip_suffix("</rrd>"))
            .ok_or_else(|| fake_error("rrdtool restore"))?;
        fs::write(rrd, contents).map_err(|e| io_error(e, rrd))
    }

    fn database_dump(
        &mut self,
        _database: &Database,
        mut output: File,
    ) -> Result<(), CollaboratorError> {
        self.calls.push(Call::DatabaseDump);
        if self.fail_dump {
            return Err(fake_error("mysqldump"));
        }

        output
            .write_all(self.database.as_bytes())
            .map_err(|e| io_error(e, Path::new("dump")))
    }

    fn database_restore(
        &mut self,
        _database: &Database,
        mut input: File,
    ) -> Result<(), CollaboratorError> {
        self.calls.push(Call::DatabaseRestore);

        let mut database = String::new();
        input
            .read_to_string(&mut database)
            .map_err(|e| io_error(e, Path::new("dump")))?;
        self.database = database;

        Ok(())
    }

    fn compress(&mut self, source: &Path, archive: &Path) -> Result<(), CollaboratorError> {
        self.calls.push(Call::Compress(source.to_path_buf()));
        if self.fail_compress {
            return Err(fake_error("tar"));
        }

        let prefix = match self.layout {
            ArchiveLayout::Wrapped => PathBuf::from(source.file_name().unwrap()),
            ArchiveLayout::Flat => PathBuf::new(),
        };

        let entries: BTreeMap<String, String> = tree_contents(source)
            .into_iter()
            .map(|(path, contents)| (prefix.join(path).to_string_lossy().to_string(), contents))
            .collect();

        let file = File::create(archive).map_err(|e| io_error(e, archive))?;
        serde_json::to_writer(file, &entries).map_err(|_| fake_error("tar"))
    }

    fn extract(&mut self, archive: &Path, destination: &Path) -> Result<(), CollaboratorError> {
        self.calls.push(Call::Extract(archive.to_path_buf()));

        let file = File::open(archive).map_err(|e| io_error(e, archive))?;
        let entries: BTreeMap<String, String> =
            serde_json::from_reader(file).map_err(|_| fake_error("tar"))?;

        for (path, contents) in entries {
            let target = destination.join(path);
            fs::create_dir_all(target.parent().unwrap()).map_err(|e| io_error(e, &target))?;
            fs::write(&target, contents).map_err(|e| io_error(e, &target))?;
        }

        Ok(())
    }
}

impl Fake {
    fn should_fail_rrd(&self, path: &Path) -> bool {
        let name = path.file_name().unwrap().to_string_lossy();
        self.fail_rrd.iter().any(|fail| name.starts_with(fail.as_str()))
    }
}

/// A scratch installation with live directories, a backup root and a config pointing at them.
pub struct TestInstall {
    pub root: TempDir,
    pub config: Config,
}

impl TestInstall {
    pub fn web(&self) -> PathBuf {
        self.root.path().join("live/web")
    }

    pub fn etc(&self) -> PathBuf {
        self.root.path().join("live/etc")
    }

    pub fn rra(&self) -> PathBuf {
        self.root.path().join("live/rra")
    }

    pub fn backups(&self) -> PathBuf {
        self.root.path().join("backups")
    }

    /// Fill the live directories with a small installation.
    pub fn populate(&self) {
        write(&self.web().join("index.php"), "<?php include('include/global.php');");
        write(&self.web().join("include/global.php"), "<?php $config = [];");
        write(&self.etc().join("config.php"), "<?php $database_default = 'cacti';");
        write(&self.rra().join("load_1min_5.rrd"), "load samples");
        write(&self.rra().join("router_1/traffic_in_7.rrd"), "traffic samples");
        write(&self.rra().join("router_1/README"), "not converted");
    }

    /// Remove the live directories.
    pub fn wipe_live(&self) {
        fs::remove_dir_all(self.root.path().join("live")).unwrap();
    }
}

pub fn test_install() -> TestInstall {
    let root = tempfile::tempdir().unwrap();
    let mut config = Config {
        backup_root: root.path().join("backups"),
        temporary_directory: root.path().join("tmp"),
        log_directory: root.path().join("logs"),
        ..Config::default()
    };

    config.rrd.directory = root.path().join("live/rra");
    config.validation.minimum_dump_bytes = 64;

    for (area, directory) in config.file_areas.iter_mut().zip(["web", "etc"]) {
        area.live_path = root.path().join("live").join(directory);
    }

    TestInstall { root, config }
}

pub fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Every file below `directory` by relative path.
pub fn tree_contents(directory: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(directory)
        .into_iter()
        .map(Result::unwrap)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry.path().strip_prefix(directory).unwrap().to_path_buf();
            (relative, fs::read_to_string(entry.path()).unwrap())
        })
        .collect()
}
