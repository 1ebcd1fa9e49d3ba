use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::HypothesisError;
use crate::utterance::WordSequence;

mod expansion;

pub use expansion::ExpandedIndex;

/// Printed in place of the catch-all entry.
pub const OTHER_LABEL: &str = "__other__";

/// What an N-best entry stands for: a real word sequence, or the mass of
/// everything the list does not name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NBestEntry {
    Hyp(WordSequence),
    Other,
}

impl NBestEntry {
    pub fn utterance(&self) -> Option<&WordSequence> {
        match self {
            NBestEntry::Hyp(utterance) => Some(utterance),
            NBestEntry::Other => None,
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self, NBestEntry::Other)
    }
}

impl std::fmt::Display for NBestEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NBestEntry::Hyp(utterance) => utterance.fmt(f),
            NBestEntry::Other => f.write_str(OTHER_LABEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedHypothesis {
    pub prob: f64,
    pub entry: NBestEntry,
}

/// Whole-sequence hypotheses ranked by probability, with at most one
/// catch-all [`NBestEntry::Other`] entry.
///
/// Building a list is `add` calls followed by [`merge`](Self::merge),
/// [`normalize`](Self::normalize) and [`sort`](Self::sort).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedHypothesisList {
    n_best: Vec<RankedHypothesis>,
}

impl RankedHypothesisList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, prob: f64, utterance: WordSequence) {
        self.add_entry(prob, NBestEntry::Hyp(utterance));
    }

    pub fn add_entry(&mut self, prob: f64, entry: NBestEntry) {
        self.n_best.push(RankedHypothesis { prob, entry });
    }

    pub fn len(&self) -> usize {
        self.n_best.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_best.is_empty()
    }

    pub fn get(&self, rank: usize) -> Option<&RankedHypothesis> {
        self.n_best.get(rank)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedHypothesis> {
        self.n_best.iter()
    }

    pub fn total_prob(&self) -> f64 {
        self.n_best.iter().map(|hyp| hyp.prob).sum()
    }

    /// Coalesces equal entries, summing their probabilities. The first
    /// occurrence keeps its place.
    pub fn merge(&mut self) -> &mut Self {
        let before = self.n_best.len();
        let mut positions: HashMap<NBestEntry, usize> = HashMap::with_capacity(before);
        let mut merged: Vec<RankedHypothesis> = Vec::with_capacity(before);
        for hyp in self.n_best.drain(..) {
            match positions.get(&hyp.entry) {
                Some(&pos) => merged[pos].prob += hyp.prob,
                None => {
                    positions.insert(hyp.entry.clone(), merged.len());
                    merged.push(hyp);
                }
            }
        }
        if merged.len() < before {
            tracing::debug!(before, after = merged.len(), "nbest merge: coalesced duplicates");
        }
        self.n_best = merged;
        self
    }

    /// Rescales all probabilities, the catch-all included, to sum to one.
    pub fn normalize(&mut self) -> &mut Self {
        let total = self.total_prob();
        if total > 0.0 {
            for hyp in &mut self.n_best {
                hyp.prob /= total;
            }
        } else if !self.n_best.is_empty() {
            tracing::warn!(total, "nbest normalize: list without positive probability mass");
        }
        self
    }

    /// Sets the catch-all entry to `max(0, 1 - sum of the other entries)`,
    /// appending it if absent. Calling it again without other changes leaves
    /// the list as it is.
    pub fn add_other(&mut self) -> Result<&mut Self, HypothesisError> {
        let others: Vec<usize> = self
            .n_best
            .iter()
            .enumerate()
            .filter(|(_, hyp)| hyp.entry.is_other())
            .map(|(rank, _)| rank)
            .collect();
        if others.len() > 1 {
            return Err(HypothesisError::invalid_nbest_state(format!(
                "{} catch-all entries at ranks {others:?}",
                others.len()
            )));
        }
        if let Some(bad) = self
            .n_best
            .iter()
            .find(|hyp| !hyp.prob.is_finite() || hyp.prob < 0.0)
        {
            return Err(HypothesisError::invalid_nbest_state(format!(
                "probability {} for \"{}\"",
                bad.prob, bad.entry
            )));
        }

        let listed: f64 = self
            .n_best
            .iter()
            .filter(|hyp| !hyp.entry.is_other())
            .map(|hyp| hyp.prob)
            .sum();
        let other_prob = (1.0 - listed).max(0.0);
        match others.first() {
            Some(&rank) => self.n_best[rank].prob = other_prob,
            None => self.add_entry(other_prob, NBestEntry::Other),
        }
        Ok(self)
    }

    /// Orders entries by decreasing probability; on ties real hypotheses
    /// come before the catch-all. The sort is stable.
    pub fn sort(&mut self) -> &mut Self {
        self.n_best.sort_by(|a, b| {
            b.prob
                .total_cmp(&a.prob)
                .then_with(|| a.entry.is_other().cmp(&b.entry.is_other()))
        });
        self
    }

    /// Lowercases every hypothesis in place.
    pub fn lower(&mut self) -> &mut Self {
        for hyp in &mut self.n_best {
            if let NBestEntry::Hyp(utterance) = &mut hyp.entry {
                utterance.lower();
            }
        }
        self
    }

    /// The most probable real hypothesis, skipping the catch-all.
    pub fn get_best(&self) -> Option<&WordSequence> {
        self.n_best.iter().find_map(|hyp| hyp.entry.utterance())
    }
}

impl<'a> IntoIterator for &'a RankedHypothesisList {
    type Item = &'a RankedHypothesis;
    type IntoIter = std::slice::Iter<'a, RankedHypothesis>;

    fn into_iter(self) -> Self::IntoIter {
        self.n_best.iter()
    }
}

impl FromIterator<(f64, WordSequence)> for RankedHypothesisList {
    fn from_iter<T: IntoIterator<Item = (f64, WordSequence)>>(iter: T) -> Self {
        let mut nblist = Self::new();
        for (prob, utterance) in iter {
            nblist.add(prob, utterance);
        }
        nblist
    }
}

impl std::fmt::Display for RankedHypothesisList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (rank, hyp) in self.n_best.iter().enumerate() {
            if rank > 0 {
                writeln!(f)?;
            }
            write!(f, "{:.3} {}", hyp.prob, hyp.entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_list(items: &[(f64, &str)]) -> RankedHypothesisList {
        items
            .iter()
            .map(|&(prob, text)| (prob, WordSequence::new(text)))
            .collect()
    }

    #[test]
    fn merge_sums_duplicates_in_first_position() {
        let mut nblist = make_list(&[(0.2, "a b"), (0.3, "c"), (0.1, "a b")]);
        nblist.merge();
        assert_eq!(nblist.len(), 2);
        assert_eq!(nblist.get(0).unwrap().entry, NBestEntry::Hyp(WordSequence::new("a b")));
        assert!((nblist.get(0).unwrap().prob - 0.3).abs() < 1e-12);
    }

    #[test]
    fn merge_then_normalize_sums_to_one() {
        let mut nblist = make_list(&[(2.0, "a"), (1.0, "b"), (1.0, "a")]);
        nblist.merge().normalize();
        assert!((nblist.total_prob() - 1.0).abs() < 1e-9);
        assert_eq!(nblist.len(), 2);
    }

    #[test]
    fn add_other_fills_missing_mass_and_is_idempotent() {
        let mut nblist = make_list(&[(0.5, "a"), (0.3, "b")]);
        nblist.add_other().unwrap();
        assert_eq!(nblist.len(), 3);
        let other = nblist.get(2).unwrap();
        assert!(other.entry.is_other());
        assert!((other.prob - 0.2).abs() < 1e-12);

        nblist.add_other().unwrap();
        assert_eq!(nblist.len(), 3);
        assert!((nblist.get(2).unwrap().prob - 0.2).abs() < 1e-12);
    }

    #[test]
    fn add_other_clamps_at_zero() {
        let mut nblist = make_list(&[(0.7, "a"), (0.6, "b")]);
        nblist.add_other().unwrap();
        assert_eq!(nblist.get(2).unwrap().prob, 0.0);
    }

    #[test]
    fn add_other_rejects_inconsistent_lists() {
        let mut nblist = make_list(&[(0.5, "a")]);
        nblist.add_entry(0.2, NBestEntry::Other);
        nblist.add_entry(0.3, NBestEntry::Other);
        assert!(matches!(
            nblist.add_other(),
            Err(HypothesisError::InvalidNBestState { .. })
        ));

        let mut nblist = make_list(&[(f64::NAN, "a")]);
        assert!(matches!(
            nblist.add_other(),
            Err(HypothesisError::InvalidNBestState { .. })
        ));
    }

    #[test]
    fn get_best_skips_other() {
        let mut nblist = make_list(&[(0.1, "a")]);
        nblist.add_other().unwrap();
        nblist.sort();
        assert!(nblist.get(0).unwrap().entry.is_other());
        assert_eq!(nblist.get_best().unwrap(), "a");

        let mut only_other = RankedHypothesisList::new();
        only_other.add_other().unwrap();
        assert!(only_other.get_best().is_none());
    }

    #[test]
    fn sort_is_descending() {
        let mut nblist = make_list(&[(0.1, "a"), (0.6, "b"), (0.3, "c")]);
        nblist.sort();
        let order: Vec<String> = nblist.iter().map(|hyp| hyp.entry.to_string()).collect();
        assert_eq!(order, ["b", "c", "a"]);
    }

    #[test]
    fn display_one_line_per_entry() {
        let mut nblist = make_list(&[(0.75, "hello world")]);
        nblist.add_other().unwrap();
        assert_eq!(nblist.to_string(), "0.750 hello world\n0.250 __other__");
    }

    #[test]
    fn serializes_entries_by_kind() {
        let mut nblist = make_list(&[(1.0, "a b")]);
        nblist.add_other().unwrap();
        let json = serde_json::to_value(&nblist).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "prob": 1.0, "entry": { "hyp": ["a", "b"] } },
                { "prob": 0.0, "entry": "other" }
            ])
        );
    }
}
