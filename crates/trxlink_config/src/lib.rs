//! Parsing and validation of `trxlink.toml` bridge configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`LinkConfig`], then resolves clock strings and tap values into a
//! [`ResolvedLink`] ready to build a simulation from.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use resolve::{resolve_link, ResolvedLink, ResolvedTransceiver};
pub use types::*;
