use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ModelsConfig;
use crate::error::Result;

/// Optimizer and schedule settings handed to the training framework.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrainingArgs {
    /// Filled in per preset when written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    pub per_device_train_batch_size: u32,
    pub per_device_eval_batch_size: u32,
    pub gradient_accumulation_steps: u32,
    pub learning_rate: f64,
    pub lr_scheduler_type: String,
    pub warmup_steps: u32,
    pub weight_decay: f64,
    pub num_train_epochs: u32,
    pub logging_steps: u32,
    pub eval_strategy: String,
    pub eval_steps: u32,
    pub save_strategy: String,
    pub save_steps: u32,
    pub save_total_limit: u32,
    pub fp16: bool,
    pub gradient_checkpointing: bool,
    pub report_to: String,
}

impl Default for TrainingArgs {
    fn default() -> Self {
        Self {
            output_dir: None,
            per_device_train_batch_size: 4,
            per_device_eval_batch_size: 4,
            gradient_accumulation_steps: 8,
            learning_rate: 2e-4,
            lr_scheduler_type: "cosine".into(),
            warmup_steps: 100,
            weight_decay: 0.01,
            num_train_epochs: 1,
            logging_steps: 10,
            eval_strategy: "steps".into(),
            eval_steps: 500,
            save_strategy: "steps".into(),
            save_steps: 1000,
            save_total_limit: 2,
            fp16: true,
            gradient_checkpointing: true,
            report_to: "tensorboard".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetArtifacts {
    pub name: String,
    pub config_path: PathBuf,
    pub training_args_path: PathBuf,
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    std::fs::write(path, body)?;
    Ok(())
}

/// Write `<models_dir>/<preset>/config.json` and `training_args.json` for
/// every preset.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or a file cannot be
/// written.
pub fn write_model_configs(models_dir: &Path, config: &ModelsConfig) -> Result<Vec<PresetArtifacts>> {
    config.validate()?;
    let mut written = Vec::with_capacity(config.presets.len());
    for preset in &config.presets {
        let dir = models_dir.join(&preset.name);
        std::fs::create_dir_all(&dir)?;

        let config_path = dir.join("config.json");
        write_json(&config_path, &preset.hf_config(&config.dims))?;

        let args = TrainingArgs {
            output_dir: Some(dir.display().to_string()),
            ..config.training.clone()
        };
        let training_args_path = dir.join("training_args.json");
        write_json(&training_args_path, &args)?;

        tracing::debug!(preset = %preset.name, dir = %dir.display(), "model config written");
        written.push(PresetArtifacts {
            name: preset.name.clone(),
            config_path,
            training_args_path,
        });
    }
    tracing::info!(presets = written.len(), dir = %models_dir.display(), "model configs written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_directory_per_preset() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_model_configs(dir.path(), &ModelsConfig::default()).unwrap();
        assert_eq!(written.len(), 5);

        let llama: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[0].config_path).unwrap()).unwrap();
        assert_eq!(llama["model_type"], "llama");
        assert_eq!(llama["num_key_value_heads"], 4);

        let args: TrainingArgs =
            serde_json::from_str(&std::fs::read_to_string(&written[0].training_args_path).unwrap())
                .unwrap();
        assert_eq!(args.gradient_accumulation_steps, 8);
        assert!(args.output_dir.unwrap().ends_with("llama_gqa"));
    }

    #[test]
    fn invalid_config_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ModelsConfig {
            eval_fraction: -0.1,
            ..ModelsConfig::default()
        };
        assert!(write_model_configs(dir.path(), &config).is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn training_overrides_from_toml() {
        let args: TrainingArgs = toml::from_str("learning_rate = 3e-4\nfp16 = false").unwrap();
        assert!((args.learning_rate - 3e-4).abs() < f64::EPSILON);
        assert!(!args.fp16);
        assert_eq!(args.save_total_limit, 2);
    }
}
