use std::collections::HashSet;

use serde::Deserialize;

use crate::artifacts::TrainingArgs;
use crate::error::{ModelError, Result};
use crate::preset::{ModelDims, ModelPreset, default_presets};

fn default_eval_fraction() -> f64 {
    0.05
}

fn default_seed() -> u64 {
    42
}

fn default_max_spread_pct() -> f64 {
    15.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    #[serde(default)]
    pub dims: ModelDims,
    #[serde(default = "default_presets")]
    pub presets: Vec<ModelPreset>,
    #[serde(default)]
    pub training: TrainingArgs,
    /// Share of packed blocks held out for evaluation.
    #[serde(default = "default_eval_fraction")]
    pub eval_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_max_spread_pct")]
    pub max_spread_pct: f64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dims: ModelDims::default(),
            presets: default_presets(),
            training: TrainingArgs::default(),
            eval_fraction: default_eval_fraction(),
            seed: default_seed(),
            max_spread_pct: default_max_spread_pct(),
        }
    }
}

impl ModelsConfig {
    /// # Errors
    ///
    /// Returns an error for an empty or duplicated preset list, an invalid
    /// preset, or an eval fraction outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.presets.is_empty() {
            return Err(ModelError::NoPresets);
        }
        let mut seen = HashSet::new();
        for preset in &self.presets {
            if !seen.insert(preset.name.as_str()) {
                return Err(ModelError::DuplicatePreset(preset.name.clone()));
            }
            preset.validate(&self.dims)?;
        }
        if !(0.0..=1.0).contains(&self.eval_fraction) {
            return Err(ModelError::InvalidFraction(self.eval_fraction));
        }
        Ok(())
    }
}
