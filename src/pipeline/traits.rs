use crate::confnet::ConfusionLattice;
use crate::error::HypothesisError;
use crate::features::{Features, NBestFeatureKey};
use crate::nbest::RankedHypothesisList;
use crate::utterance::WordSequence;

pub trait FeatureExtractor: Send + Sync {
    fn utterance_features(&self, utterance: &WordSequence) -> Result<Features, HypothesisError>;

    fn confnet_features(&self, confnet: &ConfusionLattice) -> Result<Features, HypothesisError>;

    fn nbest_features(
        &self,
        nblist: &RankedHypothesisList,
    ) -> Result<Features<NBestFeatureKey>, HypothesisError>;
}

/// Turns a sorted lattice into a ranked list of whole-sequence hypotheses.
pub trait HypothesisExpander: Send + Sync {
    fn expand(&self, confnet: &ConfusionLattice) -> RankedHypothesisList;
}
