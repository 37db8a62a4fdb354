//! Configuration management for spectroscroll.
//!
//! Settings live in a TOML file in the user's config directory. Every field has
//! a default, so the file is optional and may be partial.

pub mod file;

pub use file::{get_config_path, AudioConfig, AxisConfig, DisplayConfig, SpectroConfig};
