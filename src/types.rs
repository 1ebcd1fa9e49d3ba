use serde::{Deserialize, Serialize};

use crate::confnet::ConfusionLattice;
use crate::features::{Features, NBestFeatureKey};
use crate::nbest::RankedHypothesisList;
use crate::utterance::WordSequence;

/// Sentence boundary marker prepended by the `with_boundaries` iterators.
pub const SENTENCE_START: &str = "<s>";
/// Sentence boundary marker appended by the `with_boundaries` iterators.
pub const SENTENCE_END: &str = "</s>";

/// One competing word hypothesis inside a confusion-network slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub prob: f64,
    pub word: String,
}

impl Alternative {
    pub fn new(prob: f64, word: impl Into<String>) -> Self {
        Self {
            prob,
            word: word.into(),
        }
    }
}

impl<W: Into<String>> From<(f64, W)> for Alternative {
    fn from((prob, word): (f64, W)) -> Self {
        Self::new(prob, word)
    }
}

/// A multi-word hypothesis together with its combined probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseHyp {
    pub prob: f64,
    pub phrase: Vec<String>,
}

/// An edge crossing slots `start..end` (start is the index of the list
/// holding the link) with a multi-word phrase.
///
/// `orig_probs` holds one hop probability per spanned slot, so
/// `orig_probs.len() == end - start`. Normalization rescales the hops and
/// keeps `hyp.prob` equal to their product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongLink {
    pub end: usize,
    pub orig_probs: Vec<f64>,
    pub hyp: PhraseHyp,
}

/// One step of a phrase match inside a confusion network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStep {
    /// The `alt`-th alternative of slot `slot` matched one phrase word.
    Word { slot: usize, alt: usize },
    /// The `link`-th long link starting at slot `start` matched, beginning at
    /// word `offset` of its phrase (0 unless the match starts mid-link).
    Link {
        start: usize,
        link: usize,
        offset: usize,
    },
}

impl MatchStep {
    /// Slot where this step begins.
    pub fn slot(&self) -> usize {
        match *self {
            MatchStep::Word { slot, .. } => slot,
            MatchStep::Link { start, .. } => start,
        }
    }
}

/// The single most likely utterance together with its probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneBestHypothesis {
    pub prob: f64,
    pub utterance: WordSequence,
}

impl std::fmt::Display for OneBestHypothesis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} {}", self.prob, self.utterance)
    }
}

/// Any of the hypothesis representations an ASR engine may hand over.
#[derive(Debug, Clone)]
pub enum AsrHypothesis {
    Utterance(WordSequence),
    OneBest(OneBestHypothesis),
    NBest(RankedHypothesisList),
    ConfusionNetwork(ConfusionLattice),
}

impl AsrHypothesis {
    pub fn kind(&self) -> &'static str {
        match self {
            AsrHypothesis::Utterance(_) => "utterance",
            AsrHypothesis::OneBest(_) => "one_best",
            AsrHypothesis::NBest(_) => "nbest",
            AsrHypothesis::ConfusionNetwork(_) => "confnet",
        }
    }

    /// Most probable word sequence; `None` for an N-best list holding only
    /// the catch-all entry.
    pub fn best_utterance(&self) -> Option<WordSequence> {
        match self {
            AsrHypothesis::Utterance(utterance) => Some(utterance.clone()),
            AsrHypothesis::OneBest(one_best) => Some(one_best.utterance.clone()),
            AsrHypothesis::NBest(nblist) => nblist.get_best().cloned(),
            AsrHypothesis::ConfusionNetwork(confnet) => Some(confnet.best_utterance()),
        }
    }
}

/// Features extracted from one hypothesis, by representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum HypothesisFeatures {
    Utterance(Features),
    NBest(Features<NBestFeatureKey>),
    ConfusionNetwork(Features),
}

impl HypothesisFeatures {
    pub fn len(&self) -> usize {
        match self {
            HypothesisFeatures::Utterance(features)
            | HypothesisFeatures::ConfusionNetwork(features) => features.len(),
            HypothesisFeatures::NBest(features) => features.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `n` heaviest features as `(name, weight)` pairs.
    pub fn top(&self, n: usize) -> Vec<(String, f64)> {
        match self {
            HypothesisFeatures::Utterance(features)
            | HypothesisFeatures::ConfusionNetwork(features) => features
                .top(n)
                .into_iter()
                .map(|(key, weight)| (key.to_string(), weight))
                .collect(),
            HypothesisFeatures::NBest(features) => features
                .top(n)
                .into_iter()
                .map(|(key, weight)| (key.to_string(), weight))
                .collect(),
        }
    }
}

/// Result of [`HypothesisProcessor::process`](crate::HypothesisProcessor::process).
#[derive(Debug, Clone)]
pub struct ProcessedHypothesis {
    pub best: Option<WordSequence>,
    pub features: HypothesisFeatures,
    /// Present for N-best input and for lattices linearized by the expander.
    pub nblist: Option<RankedHypothesisList>,
    /// The lattice after lowercasing, pruning and sorting.
    pub confnet: Option<ConfusionLattice>,
}
