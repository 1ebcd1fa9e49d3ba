use crate::config::HypothesisConfig;
use crate::error::HypothesisError;
use crate::pipeline::defaults::{BranchAndBoundExpander, NgramFeatureExtractor};
use crate::pipeline::runtime::{HypothesisProcessor, HypothesisProcessorParts};
use crate::pipeline::traits::{FeatureExtractor, HypothesisExpander};

pub struct HypothesisProcessorBuilder {
    config: HypothesisConfig,
    feature_extractor: Option<Box<dyn FeatureExtractor>>,
    expander: Option<Box<dyn HypothesisExpander>>,
}

impl HypothesisProcessorBuilder {
    pub fn new(config: HypothesisConfig) -> Self {
        Self {
            config,
            feature_extractor: None,
            expander: None,
        }
    }

    pub fn with_feature_extractor(mut self, feature_extractor: Box<dyn FeatureExtractor>) -> Self {
        self.feature_extractor = Some(feature_extractor);
        self
    }

    pub fn with_expander(mut self, expander: Box<dyn HypothesisExpander>) -> Self {
        self.expander = Some(expander);
        self
    }

    pub fn build(self) -> Result<HypothesisProcessor, HypothesisError> {
        let config = self.config;
        if !(0.0..1.0).contains(&config.prune_prob) {
            return Err(HypothesisError::invalid_input(format!(
                "prune_prob must lie in [0, 1), got {}",
                config.prune_prob
            )));
        }
        if config.expansion.max_hypotheses == 0 {
            return Err(HypothesisError::invalid_input(
                "expansion.max_hypotheses must be >= 1",
            ));
        }

        let feature_extractor = match self.feature_extractor {
            Some(feature_extractor) => feature_extractor,
            None => Box::new(NgramFeatureExtractor::new(
                &config.features.feature_type,
                config.features.size,
                config.features.with_boundaries,
            )?),
        };

        Ok(HypothesisProcessor::from_parts(HypothesisProcessorParts {
            feature_extractor,
            expander: self.expander.unwrap_or_else(|| {
                Box::new(BranchAndBoundExpander {
                    max_hypotheses: config.expansion.max_hypotheses,
                    prob_mass: config.expansion.prob_mass,
                })
            }),
            prune_prob: config.prune.then_some(config.prune_prob),
            lowercase: config.lowercase,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::confnet::ConfusionLattice;
    use crate::features::{FeatureKey, Features, NBestFeatureKey};
    use crate::nbest::RankedHypothesisList;
    use crate::types::{AsrHypothesis, HypothesisFeatures, OneBestHypothesis};
    use crate::utterance::WordSequence;

    use super::*;

    struct MockExtractor;

    impl FeatureExtractor for MockExtractor {
        fn utterance_features(&self, utterance: &WordSequence) -> Result<Features, HypothesisError> {
            let mut features = Features::new();
            features.add(FeatureKey::ngram(&["len"]), utterance.len() as f64);
            Ok(features)
        }

        fn confnet_features(&self, confnet: &ConfusionLattice) -> Result<Features, HypothesisError> {
            let mut features = Features::new();
            features.add(FeatureKey::ngram(&["slots"]), confnet.len() as f64);
            Ok(features)
        }

        fn nbest_features(
            &self,
            nblist: &RankedHypothesisList,
        ) -> Result<Features<NBestFeatureKey>, HypothesisError> {
            let mut features = Features::new();
            features.add(NBestFeatureKey::TopProb, nblist.len() as f64);
            Ok(features)
        }
    }

    struct SingleBestExpander;

    impl HypothesisExpander for SingleBestExpander {
        fn expand(&self, confnet: &ConfusionLattice) -> RankedHypothesisList {
            let best = confnet.best_hypothesis();
            std::iter::once((best.prob, best.utterance)).collect()
        }
    }

    fn make_lattice() -> ConfusionLattice {
        ConfusionLattice::from_slots(vec![
            vec![(0.3, "Book"), (0.7, "Look")],
            vec![(0.9995, ""), (0.0005, "uh")],
            vec![(1.0, "Flights")],
        ])
    }

    #[test]
    fn build_fails_on_unsupported_feature_type() {
        let mut config = HypothesisConfig::default();
        config.features.feature_type = "tfidf".to_string();
        let result = HypothesisProcessorBuilder::new(config).build();
        assert!(matches!(
            result,
            Err(HypothesisError::UnsupportedFeatureType { .. })
        ));
    }

    #[test]
    fn custom_extractor_skips_feature_type_check() {
        let mut config = HypothesisConfig::default();
        config.features.feature_type = "tfidf".to_string();
        let result = HypothesisProcessorBuilder::new(config)
            .with_feature_extractor(Box::new(MockExtractor))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn build_fails_on_invalid_limits() {
        let mut config = HypothesisConfig::default();
        config.prune_prob = 1.5;
        assert!(matches!(
            HypothesisProcessorBuilder::new(config).build(),
            Err(HypothesisError::InvalidInput { .. })
        ));

        let mut config = HypothesisConfig::default();
        config.expansion.max_hypotheses = 0;
        assert!(matches!(
            HypothesisProcessorBuilder::new(config).build(),
            Err(HypothesisError::InvalidInput { .. })
        ));
    }

    #[test]
    fn process_utterance_with_defaults() {
        let processor = HypothesisProcessorBuilder::new(HypothesisConfig::default())
            .build()
            .expect("build should succeed");
        let processed = processor
            .process(AsrHypothesis::Utterance(WordSequence::new("book a flight")))
            .unwrap();
        assert_eq!(processed.best.unwrap(), "book a flight");
        assert!(processed.nblist.is_none());
        let HypothesisFeatures::Utterance(features) = processed.features else {
            panic!("expected utterance features");
        };
        assert_eq!(features.get(&FeatureKey::ngram(&["<s>", "book"])), 1.0);
    }

    #[test]
    fn process_lowercases_one_best() {
        let config = HypothesisConfig {
            lowercase: true,
            ..HypothesisConfig::default()
        };
        let processor = HypothesisProcessorBuilder::new(config)
            .with_feature_extractor(Box::new(MockExtractor))
            .build()
            .unwrap();
        let processed = processor
            .process(AsrHypothesis::OneBest(OneBestHypothesis {
                prob: 0.9,
                utterance: WordSequence::new("Hello There"),
            }))
            .unwrap();
        assert_eq!(processed.best.unwrap(), "hello there");
    }

    #[test]
    fn process_nbest_keeps_list() {
        let processor = HypothesisProcessorBuilder::new(HypothesisConfig::default())
            .with_feature_extractor(Box::new(MockExtractor))
            .build()
            .unwrap();
        let mut nblist = RankedHypothesisList::new();
        nblist.add(0.8, WordSequence::new("yes"));
        nblist.add(0.2, WordSequence::new("yeah"));
        let processed = processor.process(AsrHypothesis::NBest(nblist)).unwrap();
        assert_eq!(processed.best.unwrap(), "yes");
        assert_eq!(processed.nblist.unwrap().len(), 2);
        assert!(matches!(processed.features, HypothesisFeatures::NBest(_)));
    }

    #[test]
    fn process_confnet_prunes_sorts_and_expands() {
        let config = HypothesisConfig {
            prune: true,
            lowercase: true,
            ..HypothesisConfig::default()
        };
        let processor = HypothesisProcessorBuilder::new(config)
            .with_feature_extractor(Box::new(MockExtractor))
            .build()
            .unwrap();
        let processed = processor
            .process(AsrHypothesis::ConfusionNetwork(make_lattice()))
            .unwrap();

        assert_eq!(processed.best.unwrap(), "look flights");
        let HypothesisFeatures::ConfusionNetwork(features) = &processed.features else {
            panic!("expected confnet features");
        };
        // The silence slot was pruned.
        assert_eq!(features.get(&FeatureKey::ngram(&["slots"])), 2.0);
        assert_eq!(processed.nblist.unwrap().len(), 2);
    }

    #[test]
    fn process_confnet_with_custom_expander() {
        let processor = HypothesisProcessorBuilder::new(HypothesisConfig::default())
            .with_expander(Box::new(SingleBestExpander))
            .build()
            .unwrap();
        let processed = processor
            .process(AsrHypothesis::ConfusionNetwork(make_lattice()))
            .unwrap();
        let nblist = processed.nblist.unwrap();
        assert_eq!(nblist.len(), 1);
        assert_eq!(nblist.get_best().unwrap(), "Look Flights");
    }
}
