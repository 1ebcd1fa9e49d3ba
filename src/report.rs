use serde::Serialize;

use crate::confnet::ConfusionLattice;
use crate::nbest::RankedHypothesisList;
use crate::types::{OneBestHypothesis, ProcessedHypothesis};
use crate::utterance::WordSequence;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub schema_version: u32,
    pub meta: Meta,
    pub utterances: Vec<UtteranceReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confnet: Option<ConfnetReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub generated_at: String,
    pub utterances_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confnet_path: Option<String>,
    pub feature_type: String,
    pub feature_size: usize,
    pub utterance_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureWeight {
    pub name: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UtteranceReport {
    pub id: String,
    pub utterance: WordSequence,
    pub word_count: usize,
    pub feature_count: usize,
    pub top_features: Vec<FeatureWeight>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfnetReport {
    pub slot_count: usize,
    pub long_link_count: usize,
    /// Slots left after pruning.
    pub processed_slot_count: usize,
    pub best: OneBestHypothesis,
    pub feature_count: usize,
    pub top_features: Vec<FeatureWeight>,
    pub nbest: RankedHypothesisList,
}

fn top_features(processed: &ProcessedHypothesis, top_n: usize) -> Vec<FeatureWeight> {
    processed
        .features
        .top(top_n)
        .into_iter()
        .map(|(name, weight)| FeatureWeight { name, weight })
        .collect()
}

pub fn compute_utterance_report(
    id: &str,
    utterance: &WordSequence,
    processed: &ProcessedHypothesis,
    top_n: usize,
) -> UtteranceReport {
    UtteranceReport {
        id: id.to_string(),
        utterance: processed.best.clone().unwrap_or_else(|| utterance.clone()),
        word_count: utterance.len(),
        feature_count: processed.features.len(),
        top_features: top_features(processed, top_n),
    }
}

/// `confnet` is the lattice as loaded; `processed` carries the pruned one.
pub fn compute_confnet_report(
    confnet: &ConfusionLattice,
    processed: &ProcessedHypothesis,
    top_n: usize,
) -> ConfnetReport {
    let processed_confnet = processed.confnet.as_ref().unwrap_or(confnet);
    ConfnetReport {
        slot_count: confnet.len(),
        long_link_count: (0..confnet.len())
            .map(|start| confnet.long_links(start).len())
            .sum(),
        processed_slot_count: processed_confnet.len(),
        best: processed_confnet.best_hypothesis(),
        feature_count: processed.features.len(),
        top_features: top_features(processed, top_n),
        nbest: processed.nblist.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HypothesisConfig;
    use crate::pipeline::builder::HypothesisProcessorBuilder;
    use crate::types::AsrHypothesis;

    #[test]
    fn utterance_report_lists_heaviest_features() {
        let processor = HypothesisProcessorBuilder::new(HypothesisConfig::default())
            .build()
            .unwrap();
        let utt = WordSequence::new("no no no");
        let processed = processor
            .process(AsrHypothesis::Utterance(utt.clone()))
            .unwrap();
        let report = compute_utterance_report("u1", &utt, &processed, 2);
        assert_eq!(report.id, "u1");
        assert_eq!(report.word_count, 3);
        assert_eq!(
            report.top_features[0],
            FeatureWeight {
                name: "no".to_string(),
                weight: 3.0
            }
        );
        assert_eq!(report.top_features.len(), 2);
    }

    #[test]
    fn confnet_report_counts_slots_before_and_after_pruning() {
        let config = HypothesisConfig {
            prune: true,
            ..HypothesisConfig::default()
        };
        let processor = HypothesisProcessorBuilder::new(config).build().unwrap();
        let mut confnet = ConfusionLattice::from_slots(vec![
            vec![(0.4, "hi"), (0.6, "hey")],
            vec![(1.0, "")],
            vec![(1.0, "there")],
        ]);
        confnet
            .add_long_link(0, 2, vec![0.1, 0.1], vec!["hi".to_string()])
            .unwrap();
        let processed = processor
            .process(AsrHypothesis::ConfusionNetwork(confnet.clone()))
            .unwrap();
        let report = compute_confnet_report(&confnet, &processed, 5);
        assert_eq!(report.slot_count, 3);
        assert_eq!(report.long_link_count, 1);
        // The silence slot sits under the long link and survives.
        assert_eq!(report.processed_slot_count, 3);
        assert_eq!(report.best.utterance, "hey there");
        assert!(!report.nbest.is_empty());
        assert!(report.top_features.len() <= 5);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["best"]["utterance"], serde_json::json!(["hey", "there"]));
    }
}
