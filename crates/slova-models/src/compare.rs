use crate::preset::{ModelDims, ModelPreset};

/// Parameter budget of one preset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetSize {
    pub name: String,
    pub parameters: u64,
}

/// Parameter counts across presets and how far apart they are.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeComparison {
    pub sizes: Vec<PresetSize>,
    /// `(largest - smallest) / smallest * 100`.
    pub spread_pct: f64,
    pub max_spread_pct: f64,
}

impl SizeComparison {
    #[must_use]
    pub fn compute(presets: &[ModelPreset], dims: &ModelDims, max_spread_pct: f64) -> Self {
        let sizes: Vec<PresetSize> = presets
            .iter()
            .map(|p| PresetSize {
                name: p.name.clone(),
                parameters: p.parameter_count(dims),
            })
            .collect();
        let smallest = sizes.iter().map(|s| s.parameters).min().unwrap_or(0);
        let largest = sizes.iter().map(|s| s.parameters).max().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let spread_pct = if smallest == 0 {
            0.0
        } else {
            (largest - smallest) as f64 / smallest as f64 * 100.0
        };
        Self {
            sizes,
            spread_pct,
            max_spread_pct,
        }
    }

    /// Whether every preset is within `max_spread_pct` of the smallest.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.spread_pct <= self.max_spread_pct
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn log(&self) {
        for size in &self.sizes {
            tracing::info!(
                preset = %size.name,
                params_m = format_args!("{:.2}", size.parameters as f64 / 1e6),
                "parameter count"
            );
        }
        if self.is_balanced() {
            tracing::info!(spread_pct = format_args!("{:.1}", self.spread_pct), "presets are comparable");
        } else {
            tracing::warn!(
                spread_pct = format_args!("{:.1}", self.spread_pct),
                max_spread_pct = self.max_spread_pct,
                "presets differ too much in size, adjust num_hidden_layers"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preset::{Architecture, default_presets};

    #[test]
    fn default_presets_are_balanced() {
        let cmp = SizeComparison::compute(&default_presets(), &ModelDims::default(), 15.0);
        assert_eq!(cmp.sizes.len(), 5);
        assert!(cmp.spread_pct > 3.0 && cmp.spread_pct < 4.0, "{}", cmp.spread_pct);
        assert!(cmp.is_balanced());
    }

    #[test]
    fn oversized_preset_breaks_balance() {
        let mut presets = default_presets();
        presets.push(ModelPreset::new(
            "deep_llama",
            40,
            Architecture::Llama {
                num_key_value_heads: 16,
            },
        ));
        let cmp = SizeComparison::compute(&presets, &ModelDims::default(), 15.0);
        assert!(!cmp.is_balanced());
    }

    #[test]
    fn empty_set_has_no_spread() {
        let cmp = SizeComparison::compute(&[], &ModelDims::default(), 15.0);
        assert!(cmp.sizes.is_empty());
        assert!(cmp.is_balanced());
    }
}
