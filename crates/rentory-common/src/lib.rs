//! Core shared utilities for Rentory binaries: logging setup and layered
//! configuration loading.

pub mod config;
pub mod logging;

pub use config::{ConfigLoader, ConfigurationError};
pub use logging::LogFormat;
