//! # Shared
//! Ambient components shared by the backup tooling binaries.
//!

#![warn(missing_docs)]

mod failure;
mod logger;

pub use failure::Failure;
pub use logger::{LoggerError, init_logger};
