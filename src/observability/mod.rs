//! # Observability
//!
//! Structured logging setup and helpers for keeping secret values out of logs.

pub mod logging;

pub use logging::{init_logging, mask_secret_value};
