//! Configuration management for the QR login service
//!
//! This module handles loading and managing configuration settings
//! from defaults, TOML files, environment variables and CLI flags.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::Settings;
