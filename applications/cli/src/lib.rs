//! Vibe.FM CLI Library
//!
//! Configuration loading and the playback watch loop behind the `vibe` binary.
//!
//! This library exposes the core components for testing purposes.

pub mod config;
pub mod error;
pub mod watch;

pub use crate::config::{CliConfig, ServerSettings};
pub use crate::error::{CliError, Result};
pub use crate::watch::{render, WatchOptions};
