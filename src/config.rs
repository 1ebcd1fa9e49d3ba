use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HypothesisError;

/// Settings for hypothesis processing, loadable from JSON. Every field has a
/// default, so a config file only lists what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisConfig {
    pub features: FeatureConfig,
    pub expansion: ExpansionConfig,
    /// Alternatives below this probability are dropped when pruning.
    pub prune_prob: f64,
    pub prune: bool,
    pub lowercase: bool,
}

impl HypothesisConfig {
    pub const DEFAULT_PRUNE_PROB: f64 = 0.001;

    pub fn load(path: &Path) -> Result<Self, HypothesisError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| HypothesisError::io("read hypothesis config", e))?;
        serde_json::from_str(&data).map_err(|e| HypothesisError::json("parse hypothesis config", e))
    }
}

impl Default for HypothesisConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            expansion: ExpansionConfig::default(),
            prune_prob: Self::DEFAULT_PRUNE_PROB,
            prune: false,
            lowercase: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Only `ngram` is supported.
    pub feature_type: String,
    /// Longest n-gram extracted.
    pub size: usize,
    pub with_boundaries: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            feature_type: "ngram".to_string(),
            size: 3,
            with_boundaries: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Hard cap on hypotheses drawn from a lattice.
    pub max_hypotheses: usize,
    /// Stop early once this much probability mass is covered.
    pub prob_mass: Option<f64>,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_hypotheses: 10,
            prob_mass: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypothesis_config_default() {
        let config = HypothesisConfig::default();
        assert_eq!(config.features.feature_type, "ngram");
        assert_eq!(config.features.size, 3);
        assert!(config.features.with_boundaries);
        assert_eq!(config.expansion.max_hypotheses, 10);
        assert_eq!(config.expansion.prob_mass, None);
        assert_eq!(config.prune_prob, HypothesisConfig::DEFAULT_PRUNE_PROB);
        assert!(!config.prune);
        assert!(!config.lowercase);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{
            "features": { "size": 4 },
            "expansion": { "prob_mass": 0.9 },
            "prune": true
        }"#;
        let config: HypothesisConfig = serde_json::from_str(json).expect("valid config json");
        assert_eq!(config.features.size, 4);
        assert_eq!(config.features.feature_type, "ngram");
        assert_eq!(config.expansion.max_hypotheses, 10);
        assert_eq!(config.expansion.prob_mass, Some(0.9));
        assert!(config.prune);
        assert!(!config.lowercase);
    }

    #[test]
    fn load_reports_missing_file() {
        let path = std::env::temp_dir().join("confnet_rs_missing_config.json");
        let err = HypothesisConfig::load(&path).unwrap_err();
        assert!(matches!(err, HypothesisError::Io { .. }));
    }

    #[test]
    fn load_reads_json_file() {
        let path = std::env::temp_dir().join(format!("hypothesis_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "lowercase": true }"#).unwrap();
        let config = HypothesisConfig::load(&path);
        std::fs::remove_file(&path).ok();
        assert!(config.unwrap().lowercase);
    }
}
