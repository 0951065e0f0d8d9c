//! Architecture presets and their analytic parameter counts.
//!
//! Counts follow the Hugging Face implementations of each family with tied
//! input/output embeddings and no linear biases, so they match what the
//! training framework reports for the emitted `config.json`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{ModelError, Result};

fn default_vocab_size() -> usize {
    40_000
}

fn default_hidden_size() -> usize {
    1024
}

fn default_num_attention_heads() -> usize {
    16
}

fn default_intermediate_size() -> usize {
    2816
}

fn default_context_length() -> usize {
    2048
}

fn default_rms_norm_eps() -> f64 {
    1e-6
}

fn default_eos_token_id() -> u32 {
    1
}

/// Dimensions shared by every preset so that the comparison isolates the
/// architecture.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelDims {
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,
    #[serde(default = "default_num_attention_heads")]
    pub num_attention_heads: usize,
    /// SwiGLU width. Falcon ignores it and uses `4 * hidden_size`.
    #[serde(default = "default_intermediate_size")]
    pub intermediate_size: usize,
    #[serde(default = "default_context_length")]
    pub context_length: usize,
    #[serde(default = "default_rms_norm_eps")]
    pub rms_norm_eps: f64,
    #[serde(default)]
    pub bos_token_id: u32,
    /// Also used as the padding id.
    #[serde(default = "default_eos_token_id")]
    pub eos_token_id: u32,
}

impl Default for ModelDims {
    fn default() -> Self {
        Self {
            vocab_size: default_vocab_size(),
            hidden_size: default_hidden_size(),
            num_attention_heads: default_num_attention_heads(),
            intermediate_size: default_intermediate_size(),
            context_length: default_context_length(),
            rms_norm_eps: default_rms_norm_eps(),
            bos_token_id: 0,
            eos_token_id: default_eos_token_id(),
        }
    }
}

impl ModelDims {
    #[must_use]
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads.max(1)
    }
}

fn default_conv_kernel() -> usize {
    4
}

fn default_ssm_head_dim() -> usize {
    64
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Architecture {
    /// Llama decoder. `num_key_value_heads` below the head count gives GQA,
    /// equal to it gives classic multi-head attention.
    Llama { num_key_value_heads: usize },
    /// Llama-style decoder with sliding window attention.
    Mistral {
        num_key_value_heads: usize,
        sliding_window: usize,
    },
    /// Parallel attention/MLP block with a GELU MLP. One kv head is MQA.
    Falcon { num_kv_heads: usize },
    /// Attention-free selective state space model.
    Mamba2 {
        state_size: usize,
        expand: usize,
        n_groups: usize,
        #[serde(default = "default_ssm_head_dim")]
        head_dim: usize,
        #[serde(default = "default_conv_kernel")]
        conv_kernel: usize,
        chunk_size: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelPreset {
    pub name: String,
    pub num_hidden_layers: usize,
    #[serde(flatten)]
    pub architecture: Architecture,
}

impl ModelPreset {
    #[must_use]
    pub fn new(name: &str, num_hidden_layers: usize, architecture: Architecture) -> Self {
        Self {
            name: name.to_owned(),
            num_hidden_layers,
            architecture,
        }
    }

    /// Check the preset's head layout against the shared dimensions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPreset` naming the first inconsistency found.
    pub fn validate(&self, dims: &ModelDims) -> Result<()> {
        let invalid = |reason: String| ModelError::InvalidPreset {
            name: self.name.clone(),
            reason,
        };
        if self.num_hidden_layers == 0 {
            return Err(invalid("num_hidden_layers must be positive".into()));
        }
        let heads = dims.num_attention_heads;
        if heads == 0 || dims.hidden_size % heads != 0 {
            return Err(invalid(format!(
                "hidden_size {} is not divisible by {heads} heads",
                dims.hidden_size
            )));
        }
        match &self.architecture {
            Architecture::Llama {
                num_key_value_heads: kv,
            }
            | Architecture::Mistral {
                num_key_value_heads: kv,
                ..
            }
            | Architecture::Falcon { num_kv_heads: kv } => {
                if *kv == 0 || heads % kv != 0 {
                    return Err(invalid(format!("{heads} heads cannot be grouped over {kv} kv heads")));
                }
            }
            Architecture::Mamba2 {
                expand,
                head_dim,
                n_groups,
                ..
            } => {
                let inner = expand * dims.hidden_size;
                if *head_dim == 0 || inner % head_dim != 0 {
                    return Err(invalid(format!("inner size {inner} is not divisible by head_dim {head_dim}")));
                }
                if *n_groups == 0 || (inner / head_dim) % n_groups != 0 {
                    return Err(invalid(format!("{} ssm heads cannot form {n_groups} groups", inner / head_dim)));
                }
            }
        }
        if let Architecture::Mistral { sliding_window, .. } = self.architecture
            && sliding_window == 0
        {
            return Err(invalid("sliding_window must be positive".into()));
        }
        Ok(())
    }

    /// Trainable parameters, tied embeddings counted once.
    #[must_use]
    pub fn parameter_count(&self, dims: &ModelDims) -> u64 {
        let h = dims.hidden_size as u64;
        let embeddings = dims.vocab_size as u64 * h;
        let head_dim = dims.head_dim() as u64;

        let (per_layer, final_norm) = match &self.architecture {
            Architecture::Llama {
                num_key_value_heads: kv,
            }
            | Architecture::Mistral {
                num_key_value_heads: kv,
                ..
            } => {
                let kv_dim = *kv as u64 * head_dim;
                let attention = 2 * h * h + 2 * h * kv_dim;
                let mlp = 3 * h * dims.intermediate_size as u64;
                let norms = 2 * h;
                (attention + mlp + norms, h)
            }
            Architecture::Falcon { num_kv_heads } => {
                let fused_qkv = h * (h + 2 * head_dim * *num_kv_heads as u64);
                let dense = h * h;
                let mlp = 2 * h * 4 * h;
                // ln_attn and ln_mlp, each with weight and bias
                let norms = 4 * h;
                (fused_qkv + dense + mlp + norms, 2 * h)
            }
            Architecture::Mamba2 {
                state_size,
                expand,
                n_groups,
                head_dim: ssm_head_dim,
                conv_kernel,
                ..
            } => {
                let inner = (*expand as u64) * h;
                let ssm_heads = inner / (*ssm_head_dim as u64).max(1);
                let group_state = 2 * (*n_groups as u64) * (*state_size as u64);
                let in_proj = h * (2 * inner + group_state + ssm_heads);
                let conv_dim = inner + group_state;
                let conv = conv_dim * (*conv_kernel as u64) + conv_dim;
                // dt_bias, A_log, D
                let per_head = 3 * ssm_heads;
                let gated_norm = inner;
                let out_proj = inner * h;
                let norm = h;
                (in_proj + conv + per_head + gated_norm + out_proj + norm, h)
            }
        };
        embeddings + self.num_hidden_layers as u64 * per_layer + final_norm
    }

    /// The preset as a Hugging Face style `config.json` object.
    #[must_use]
    pub fn hf_config(&self, dims: &ModelDims) -> Value {
        let mut config = match &self.architecture {
            Architecture::Llama {
                num_key_value_heads,
            } => json!({
                "architectures": ["LlamaForCausalLM"],
                "model_type": "llama",
                "num_attention_heads": dims.num_attention_heads,
                "num_key_value_heads": num_key_value_heads,
                "intermediate_size": dims.intermediate_size,
                "max_position_embeddings": dims.context_length,
                "rms_norm_eps": dims.rms_norm_eps,
                "hidden_act": "silu",
            }),
            Architecture::Mistral {
                num_key_value_heads,
                sliding_window,
            } => json!({
                "architectures": ["MistralForCausalLM"],
                "model_type": "mistral",
                "num_attention_heads": dims.num_attention_heads,
                "num_key_value_heads": num_key_value_heads,
                "intermediate_size": dims.intermediate_size,
                "sliding_window": sliding_window,
                "max_position_embeddings": dims.context_length,
                "rms_norm_eps": dims.rms_norm_eps,
                "hidden_act": "silu",
            }),
            Architecture::Falcon { num_kv_heads } => json!({
                "architectures": ["FalconForCausalLM"],
                "model_type": "falcon",
                "num_attention_heads": dims.num_attention_heads,
                "num_kv_heads": num_kv_heads,
                "parallel_attn": true,
                "new_decoder_architecture": true,
                "bias": false,
                "max_position_embeddings": dims.context_length,
            }),
            Architecture::Mamba2 {
                state_size,
                expand,
                n_groups,
                head_dim,
                conv_kernel,
                chunk_size,
            } => json!({
                "architectures": ["Mamba2ForCausalLM"],
                "model_type": "mamba2",
                "state_size": state_size,
                "expand": expand,
                "n_groups": n_groups,
                "head_dim": head_dim,
                "num_heads": expand * dims.hidden_size / (*head_dim).max(1),
                "conv_kernel": conv_kernel,
                "chunk_size": chunk_size,
                "rms_norm": true,
            }),
        };
        if let Value::Object(map) = &mut config {
            map.insert("vocab_size".into(), json!(dims.vocab_size));
            map.insert("hidden_size".into(), json!(dims.hidden_size));
            map.insert("num_hidden_layers".into(), json!(self.num_hidden_layers));
            map.insert("tie_word_embeddings".into(), json!(true));
            map.insert("bos_token_id".into(), json!(dims.bos_token_id));
            map.insert("eos_token_id".into(), json!(dims.eos_token_id));
            map.insert("pad_token_id".into(), json!(dims.eos_token_id));
        }
        config
    }
}

/// The five presets of the architecture comparison, each sized to roughly
/// 300M parameters with the default dimensions.
#[must_use]
pub fn default_presets() -> Vec<ModelPreset> {
    vec![
        ModelPreset::new(
            "llama_gqa",
            23,
            Architecture::Llama {
                num_key_value_heads: 4,
            },
        ),
        ModelPreset::new(
            "mistral_sliding",
            23,
            Architecture::Mistral {
                num_key_value_heads: 4,
                sliding_window: 512,
            },
        ),
        ModelPreset::new("falcon_mqa", 25, Architecture::Falcon { num_kv_heads: 1 }),
        ModelPreset::new(
            "mamba2_ssm",
            40,
            Architecture::Mamba2 {
                state_size: 128,
                expand: 2,
                n_groups: 1,
                head_dim: default_ssm_head_dim(),
                conv_kernel: default_conv_kernel(),
                chunk_size: 256,
            },
        ),
        ModelPreset::new(
            "llama_mha_baseline",
            21,
            Architecture::Llama {
                num_key_value_heads: 16,
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset(name: &str) -> ModelPreset {
        default_presets()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap()
    }

    #[test]
    fn default_preset_counts() {
        let dims = ModelDims::default();
        let expected = [
            ("llama_gqa", 300_268_544),
            ("mistral_sliding", 300_268_544),
            ("falcon_mqa", 306_485_248),
            ("mamba2_ssm", 305_003_264),
            ("llama_mha_baseline", 310_750_208),
        ];
        for (name, count) in expected {
            assert_eq!(preset(name).parameter_count(&dims), count, "{name}");
        }
    }

    #[test]
    fn sliding_window_adds_no_parameters() {
        let dims = ModelDims::default();
        assert_eq!(
            preset("llama_gqa").parameter_count(&dims),
            preset("mistral_sliding").parameter_count(&dims)
        );
    }

    #[test]
    fn more_kv_heads_cost_more() {
        let dims = ModelDims::default();
        let gqa = ModelPreset::new("a", 10, Architecture::Llama { num_key_value_heads: 4 });
        let mha = ModelPreset::new("b", 10, Architecture::Llama { num_key_value_heads: 16 });
        assert!(mha.parameter_count(&dims) > gqa.parameter_count(&dims));
    }

    #[test]
    fn defaults_validate() {
        let dims = ModelDims::default();
        for p in default_presets() {
            p.validate(&dims).unwrap();
        }
    }

    #[test]
    fn ungroupable_kv_heads_rejected() {
        let p = ModelPreset::new("bad", 4, Architecture::Llama { num_key_value_heads: 3 });
        let err = p.validate(&ModelDims::default()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidPreset { name, .. } if name == "bad"));
    }

    #[test]
    fn zero_layers_rejected() {
        let p = ModelPreset::new("empty", 0, Architecture::Falcon { num_kv_heads: 1 });
        assert!(p.validate(&ModelDims::default()).is_err());
    }

    #[test]
    fn hf_config_carries_shared_and_family_fields() {
        let dims = ModelDims::default();
        let config = preset("mistral_sliding").hf_config(&dims);
        assert_eq!(config["model_type"], "mistral");
        assert_eq!(config["sliding_window"], 512);
        assert_eq!(config["num_hidden_layers"], 23);
        assert_eq!(config["vocab_size"], 40_000);
        assert_eq!(config["tie_word_embeddings"], true);
        assert_eq!(config["pad_token_id"], config["eos_token_id"]);

        let mamba = preset("mamba2_ssm").hf_config(&dims);
        assert_eq!(mamba["num_heads"], 32);
        assert!(mamba.get("num_attention_heads").is_none());
    }

    #[test]
    fn preset_from_toml() {
        let p: ModelPreset = toml::from_str(
            r#"
            name = "tiny"
            num_hidden_layers = 2
            family = "mistral"
            num_key_value_heads = 2
            sliding_window = 128
            "#,
        )
        .unwrap();
        assert_eq!(
            p.architecture,
            Architecture::Mistral {
                num_key_value_heads: 2,
                sliding_window: 128
            }
        );
    }

    mod proptest_counts {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn each_layer_adds_the_same_amount(
                layers in 1usize..64,
                kv in prop::sample::select(vec![1usize, 2, 4, 8, 16]),
            ) {
                let dims = ModelDims::default();
                let count = |n: usize| {
                    ModelPreset::new("p", n, Architecture::Llama { num_key_value_heads: kv })
                        .parameter_count(&dims)
                };
                let step = count(2) - count(1);
                prop_assert_eq!(count(layers + 1) - count(layers), step);
                prop_assert!(count(layers) > dims.vocab_size as u64 * dims.hidden_size as u64);
            }
        }
    }
}
