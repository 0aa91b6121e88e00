//! # Configuration
//!
//! - `file`: the project config file (`envsync.yaml`) holding the secret-name
//!   schema and target definitions
//! - `runtime`: process settings from `ENVSYNC_*` environment variables

pub mod file;
pub mod runtime;

pub use file::{ConfigFile, TargetDef};
pub use runtime::{LogFormat, RuntimeConfig};
