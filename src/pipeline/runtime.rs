use crate::error::HypothesisError;
use crate::pipeline::traits::{FeatureExtractor, HypothesisExpander};
use crate::types::{AsrHypothesis, HypothesisFeatures, ProcessedHypothesis};

pub struct HypothesisProcessor {
    feature_extractor: Box<dyn FeatureExtractor>,
    expander: Box<dyn HypothesisExpander>,
    prune_prob: Option<f64>,
    lowercase: bool,
}

pub(crate) struct HypothesisProcessorParts {
    pub feature_extractor: Box<dyn FeatureExtractor>,
    pub expander: Box<dyn HypothesisExpander>,
    pub prune_prob: Option<f64>,
    pub lowercase: bool,
}

impl HypothesisProcessor {
    pub(crate) fn from_parts(parts: HypothesisProcessorParts) -> Self {
        Self {
            feature_extractor: parts.feature_extractor,
            expander: parts.expander,
            prune_prob: parts.prune_prob,
            lowercase: parts.lowercase,
        }
    }

    /// Normalizes the hypothesis (optional lowercasing; lattices are pruned
    /// if configured and always sorted), extracts its features and, for a
    /// lattice, expands it into an N-best list.
    pub fn process(&self, hypothesis: AsrHypothesis) -> Result<ProcessedHypothesis, HypothesisError> {
        let kind = hypothesis.kind();
        tracing::debug!(kind, lowercase = self.lowercase, "processing hypothesis");

        let processed = match hypothesis {
            AsrHypothesis::Utterance(mut utterance) => {
                if self.lowercase {
                    utterance.lower();
                }
                let features = self.feature_extractor.utterance_features(&utterance)?;
                ProcessedHypothesis {
                    best: Some(utterance),
                    features: HypothesisFeatures::Utterance(features),
                    nblist: None,
                    confnet: None,
                }
            }
            AsrHypothesis::OneBest(mut one_best) => {
                if self.lowercase {
                    one_best.utterance.lower();
                }
                let features = self.feature_extractor.utterance_features(&one_best.utterance)?;
                ProcessedHypothesis {
                    best: Some(one_best.utterance),
                    features: HypothesisFeatures::Utterance(features),
                    nblist: None,
                    confnet: None,
                }
            }
            AsrHypothesis::NBest(mut nblist) => {
                if self.lowercase {
                    nblist.lower();
                }
                let features = self.feature_extractor.nbest_features(&nblist)?;
                ProcessedHypothesis {
                    best: nblist.get_best().cloned(),
                    features: HypothesisFeatures::NBest(features),
                    nblist: Some(nblist),
                    confnet: None,
                }
            }
            AsrHypothesis::ConfusionNetwork(mut confnet) => {
                if self.lowercase {
                    confnet.lower();
                }
                if let Some(prune_prob) = self.prune_prob {
                    let before = confnet.len();
                    confnet.prune(prune_prob);
                    tracing::debug!(before, after = confnet.len(), prune_prob, "confnet pruned");
                }
                confnet.sort();
                let features = self.feature_extractor.confnet_features(&confnet)?;
                let nblist = self.expander.expand(&confnet);
                tracing::debug!(hypotheses = nblist.len(), "confnet expanded");
                ProcessedHypothesis {
                    best: nblist
                        .get_best()
                        .cloned()
                        .or_else(|| Some(confnet.best_utterance())),
                    features: HypothesisFeatures::ConfusionNetwork(features),
                    nblist: Some(nblist),
                    confnet: Some(confnet),
                }
            }
        };

        tracing::debug!(kind, features = processed.features.len(), "hypothesis processed");
        Ok(processed)
    }
}
