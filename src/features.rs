use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::confnet::ConfusionLattice;
use crate::error::HypothesisError;
use crate::nbest::RankedHypothesisList;
use crate::utterance::WordSequence;

/// Feature produced for an empty input.
pub const EMPTY_FEATURE: &str = "__empty__";
/// Wildcard standing for one skipped word.
pub const SKIP_ONE: &str = "*1";
/// Wildcard standing for two skipped words.
pub const SKIP_TWO: &str = "*2";

/// Feature families the extractors know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    /// N-grams and skip n-grams.
    Ngram,
}

impl FromStr for FeatureType {
    type Err = HypothesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ngram" => Ok(FeatureType::Ngram),
            other => Err(HypothesisError::unsupported_feature_type(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKey {
    Empty,
    Ngram(Vec<String>),
}

impl FeatureKey {
    pub fn ngram<S: AsRef<str>>(words: &[S]) -> Self {
        FeatureKey::Ngram(words.iter().map(|w| w.as_ref().to_string()).collect())
    }

    /// `(first, *k, last)` for a window whose inner words are skipped.
    fn skip(first: &str, wildcard: &str, last: &str) -> Self {
        FeatureKey::Ngram(vec![first.to_string(), wildcard.to_string(), last.to_string()])
    }
}

impl std::fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureKey::Empty => f.write_str(EMPTY_FEATURE),
            FeatureKey::Ngram(words) => f.write_str(&words.join(" ")),
        }
    }
}

/// Features of an N-best list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NBestFeatureKey {
    /// Rank of the first hypothesis carrying the feature.
    FirstRank(FeatureKey),
    /// Feature value summed over hypotheses, weighted by their probability.
    Weighted(FeatureKey),
    /// Feature value in the top hypothesis.
    Top(FeatureKey),
    /// Probability of the top hypothesis.
    TopProb,
    /// Set when the list holds no real hypothesis.
    NoHypotheses,
}

impl std::fmt::Display for NBestFeatureKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NBestFeatureKey::FirstRank(key) => write!(f, "rank:{key}"),
            NBestFeatureKey::Weighted(key) => write!(f, "weighted:{key}"),
            NBestFeatureKey::Top(key) => write!(f, "top:{key}"),
            NBestFeatureKey::TopProb => f.write_str("top:prob"),
            NBestFeatureKey::NoHypotheses => f.write_str("top:none"),
        }
    }
}

/// Sparse feature vector. Absent keys weigh zero; `add` only accumulates.
#[derive(Debug, Clone, PartialEq)]
pub struct Features<K: Ord = FeatureKey> {
    values: BTreeMap<K, f64>,
}

impl<K: Ord> Default for Features<K> {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }
}

impl<K: Ord> Features<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, weight: f64) {
        *self.values.entry(key).or_insert(0.0) += weight;
    }

    fn set(&mut self, key: K, weight: f64) {
        self.values.insert(key, weight);
    }

    pub fn get(&self, key: &K) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> + '_ {
        self.values.iter().map(|(key, &weight)| (key, weight))
    }

    /// The `n` heaviest features, heaviest first.
    pub fn top(&self, n: usize) -> Vec<(&K, f64)> {
        let mut ranked: Vec<(&K, f64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

impl<K: Ord + std::fmt::Display> Serialize for Features<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.values.iter().map(|(key, weight)| (key.to_string(), weight)))
    }
}

/// N-gram features of a word sequence with unit counts: unigrams, then
/// windows of length `2..=size` (boundaries optional), plus `*1` / `*2`
/// skip-grams over windows of length 3 and 4.
pub fn utterance_features(
    utterance: &WordSequence,
    size: usize,
    with_boundaries: bool,
) -> Result<Features, HypothesisError> {
    let mut features = Features::new();
    if utterance.is_empty() {
        features.add(FeatureKey::Empty, 1.0);
        return Ok(features);
    }

    for word in utterance.iter() {
        features.add(FeatureKey::ngram(&[word]), 1.0);
    }
    for length in 2..=size {
        for window in utterance.iter_ngrams(length, with_boundaries) {
            features.add(FeatureKey::ngram(&window), 1.0);
            match length {
                3 => features.add(FeatureKey::skip(window[0], SKIP_ONE, window[2]), 1.0),
                4 => features.add(FeatureKey::skip(window[0], SKIP_TWO, window[3]), 1.0),
                _ => {}
            }
        }
    }

    if features.is_empty() {
        return Err(HypothesisError::empty_feature_result(utterance));
    }
    Ok(features)
}

/// N-gram features of a lattice. Unigrams add the alternative's
/// probability; a window of length `k` adds `prob^(1/k)` and its skip-gram
/// `prob^(1/2)`. Windows are long-link aware.
pub fn confnet_features(
    confnet: &ConfusionLattice,
    size: usize,
    with_boundaries: bool,
) -> Result<Features, HypothesisError> {
    let mut features = Features::new();
    if confnet.is_empty() {
        features.add(FeatureKey::Empty, 1.0);
        return Ok(features);
    }

    for alt in confnet.iter().flatten() {
        features.add(FeatureKey::ngram(&[alt.word.as_str()]), alt.prob);
    }
    for length in 2..=size {
        let exponent = 1.0 / length as f64;
        for (prob, window) in confnet.iter_ngrams(length, with_boundaries, None) {
            features.add(FeatureKey::ngram(&window), prob.powf(exponent));
            match length {
                3 => features.add(FeatureKey::skip(window[0], SKIP_ONE, window[2]), prob.sqrt()),
                4 => features.add(FeatureKey::skip(window[0], SKIP_TWO, window[3]), prob.sqrt()),
                _ => {}
            }
        }
    }

    if features.is_empty() {
        return Err(HypothesisError::empty_feature_result(confnet));
    }
    tracing::debug!(features = features.len(), slots = confnet.len(), "confnet features extracted");
    Ok(features)
}

/// Features of an N-best list built from the utterance features of its real
/// hypotheses; the catch-all entry contributes nothing.
pub fn nbest_features(
    nblist: &RankedHypothesisList,
    size: usize,
    with_boundaries: bool,
) -> Result<Features<NBestFeatureKey>, HypothesisError> {
    let mut features = Features::new();
    let mut top: Option<(f64, Features)> = None;

    for (rank, hyp) in nblist.iter().enumerate() {
        let Some(utterance) = hyp.entry.utterance() else {
            continue;
        };
        let utt_features = utterance_features(utterance, size, with_boundaries)?;
        for (key, value) in utt_features.iter() {
            let first_rank = NBestFeatureKey::FirstRank(key.clone());
            if !features.contains(&first_rank) {
                features.set(first_rank, rank as f64);
            }
            features.add(NBestFeatureKey::Weighted(key.clone()), hyp.prob * value);
        }
        if top.is_none() {
            top = Some((hyp.prob, utt_features));
        }
    }

    match top {
        Some((prob, top_features)) => {
            features.set(NBestFeatureKey::TopProb, prob);
            for (key, value) in top_features.iter() {
                features.set(NBestFeatureKey::Top(key.clone()), value);
            }
        }
        None => features.set(NBestFeatureKey::NoHypotheses, 1.0),
    }
    Ok(features)
}
