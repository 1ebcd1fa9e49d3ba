use crate::confnet::ConfusionLattice;
use crate::error::HypothesisError;
use crate::features::{
    confnet_features, nbest_features, utterance_features, FeatureType, Features, NBestFeatureKey,
};
use crate::nbest::RankedHypothesisList;
use crate::pipeline::traits::{FeatureExtractor, HypothesisExpander};
use crate::utterance::WordSequence;

/// N-gram and skip n-gram features up to `size` words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NgramFeatureExtractor {
    pub size: usize,
    pub with_boundaries: bool,
}

impl NgramFeatureExtractor {
    /// Fails with `UnsupportedFeatureType` unless `feature_type` is `ngram`.
    pub fn new(feature_type: &str, size: usize, with_boundaries: bool) -> Result<Self, HypothesisError> {
        match feature_type.parse::<FeatureType>()? {
            FeatureType::Ngram => Ok(Self {
                size,
                with_boundaries,
            }),
        }
    }
}

impl FeatureExtractor for NgramFeatureExtractor {
    fn utterance_features(&self, utterance: &WordSequence) -> Result<Features, HypothesisError> {
        utterance_features(utterance, self.size, self.with_boundaries)
    }

    fn confnet_features(&self, confnet: &ConfusionLattice) -> Result<Features, HypothesisError> {
        confnet_features(confnet, self.size, self.with_boundaries)
    }

    fn nbest_features(
        &self,
        nblist: &RankedHypothesisList,
    ) -> Result<Features<NBestFeatureKey>, HypothesisError> {
        nbest_features(nblist, self.size, self.with_boundaries)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchAndBoundExpander {
    pub max_hypotheses: usize,
    pub prob_mass: Option<f64>,
}

impl HypothesisExpander for BranchAndBoundExpander {
    fn expand(&self, confnet: &ConfusionLattice) -> RankedHypothesisList {
        confnet.get_best_hypotheses(self.max_hypotheses, self.prob_mass)
    }
}
