//! Translator client: owns one translation job and drives the engine transports.
mod config;
mod controller;
mod effects;

pub use config::{load_config, parse_config, ClientConfig, ConfigError, LogConfig, LogTarget};
pub use controller::{ControllerError, JobController, JobSnapshot};
