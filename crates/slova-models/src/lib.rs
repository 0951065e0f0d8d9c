//! Language model configuration for the architecture comparison.
//!
//! Nothing here trains a model. The crate sizes a fixed set of architecture
//! presets against a shared parameter budget, writes their configuration
//! files for an external trainer, and splits the packed corpus into train
//! and eval sets.

pub mod artifacts;
pub mod compare;
pub mod config;
pub mod error;
pub mod preset;
pub mod split;

pub use artifacts::{PresetArtifacts, TrainingArgs, write_model_configs};
pub use compare::{PresetSize, SizeComparison};
pub use config::ModelsConfig;
pub use error::{ModelError, Result};
pub use preset::{Architecture, ModelDims, ModelPreset, default_presets};
pub use split::{SplitReport, split_blocks};
