//! Configuration management
//!
//! Serde types for the server configuration file and the loader that reads
//! them from TOML or JSON.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
