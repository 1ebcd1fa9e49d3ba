pub mod abstraction;
pub mod config;
pub mod confnet;
pub mod error;
pub mod features;
pub mod nbest;
pub mod pipeline;
pub mod report;
pub mod types;
pub mod utterance;

pub use abstraction::{Abstracted, AbstractedUtterance, TypedValue};
pub use config::{ExpansionConfig, FeatureConfig, HypothesisConfig};
pub use confnet::{load_confnet, ConfusionLattice, LatticePos};
pub use error::HypothesisError;
pub use features::{FeatureKey, FeatureType, Features, NBestFeatureKey};
pub use nbest::{NBestEntry, RankedHypothesis, RankedHypothesisList};
pub use pipeline::builder::HypothesisProcessorBuilder;
pub use pipeline::runtime::HypothesisProcessor;
pub use pipeline::traits::{FeatureExtractor, HypothesisExpander};
pub use report::{
    compute_confnet_report, compute_utterance_report, ConfnetReport, FeatureWeight, Meta, Report,
    UtteranceReport, REPORT_SCHEMA_VERSION,
};
pub use types::{
    Alternative, AsrHypothesis, HypothesisFeatures, LongLink, MatchStep, OneBestHypothesis,
    PhraseHyp, ProcessedHypothesis,
};
pub use utterance::{load_utterances, parse_utterances, WordSequence};
