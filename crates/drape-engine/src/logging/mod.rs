//! Logging utilities.
//!
//! The engine only talks to the `log` facade. `init_logging` wires up
//! `env_logger` for binaries and tests that want console output.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
