//! Configuration for the sylva biome residency stack.
//!
//! Settings persist to disk as RON, accept CLI overrides via clap, and
//! support hot-reload detection. Every section is `#[serde(default)]` so
//! older files keep loading as fields are added.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CatalogConfig, Config, DebugConfig, OverlayConfig, ResidencyConfig};
pub use error::ConfigError;
