//! Configuration and process setup.

pub mod logging;
pub mod toml_config;

pub use toml_config::{CoachConfig, ConfigError};
