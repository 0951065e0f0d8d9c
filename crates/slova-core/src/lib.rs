//! Pipeline-wide configuration.
//!
//! Every stage crate owns the config struct for its own section; this crate
//! assembles them into one [`Config`] loaded from TOML with `SLOVA_*`
//! environment overrides.

pub mod config;

pub use config::{Config, PathsConfig};
