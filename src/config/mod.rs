//! Configuration Module
//!
//! Operator-tunable settings loaded from TOML, plus compile-time defaults.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` on the command line
//! 2. `PIPEGUARD_CONFIG` environment variable (path to TOML file)
//! 3. `pipeguard.toml` in the current working directory
//! 4. Built-in defaults
//!
//! The loaded [`PipelineConfig`] is passed explicitly to whatever needs it;
//! there is no process-global config.

mod pipeline_config;
pub mod defaults;

pub use pipeline_config::*;
