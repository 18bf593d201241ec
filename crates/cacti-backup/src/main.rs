//! # cacti-backup
//! Interactive backup and restore of a Cacti installation.
//!

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::{fs, io, path::PathBuf, process::ExitCode};

use cacti_backup::{Config, LoadConfigError, Session, System};
use mimalloc::MiMalloc;
use shared::{Failure, init_logger};
use tracing::{error, info, warn};

const CONFIG_FILE: &str = "./config.toml";

fn main() -> ExitCode {
    // Initialize config if args include 'init'.
    if std::env::args().any(|arg| arg.eq("init")) {
        let config = Config::default();
        let contents =
            toml::to_string_pretty(&config).or_log_and_panic("Could not serialize config file");
        fs::write(CONFIG_FILE, contents).or_log_and_panic("Could not create config file");
        println!("Wrote default config to {CONFIG_FILE}");
        return ExitCode::SUCCESS;
    }

    // Load config before the logger so the log directory can be configured.
    let loaded = Config::load_toml(PathBuf::from(CONFIG_FILE));
    let config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => Config::default(),
    };

    let _logger = init_logger(&config.log_directory).or_log_and_panic("Could not start logger");

    match loaded {
        Ok(_) => info!("Loaded config from {CONFIG_FILE}"),
        Err(LoadConfigError::NoFile) => {
            warn!("No {CONFIG_FILE} found, using defaults. Run with 'init' to create one.")
        }
        Err(error) => {
            error!("Could not load config: {error}");
            return ExitCode::FAILURE;
        }
    }

    let mut system = System;
    let mut session = Session::new(&config, &mut system, io::stdin().lock(), io::stdout());

    match session.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error}");
            ExitCode::FAILURE
        }
    }
}
