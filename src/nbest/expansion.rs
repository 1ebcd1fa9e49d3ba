use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::confnet::ConfusionLattice;
use crate::nbest::RankedHypothesisList;

/// A closed hypothesis index vector: one alternative choice per slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedIndex {
    pub prob: f64,
    pub index: Vec<usize>,
}

#[derive(Debug)]
struct Candidate {
    prob: f64,
    seq: usize,
    index: Vec<usize>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Max-heap: higher probability first, then earlier insertion.
    fn cmp(&self, other: &Self) -> Ordering {
        self.prob
            .total_cmp(&other.prob)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl ConfusionLattice {
    /// Best-first expansion of index vectors, in the order they are closed.
    ///
    /// Expects sorted slots. At most `max_hypotheses` vectors are closed;
    /// with `prob_mass` the search also stops once the closed vectors cover
    /// that much probability. Long links are not considered.
    pub fn expand_indices(&self, max_hypotheses: usize, prob_mass: Option<f64>) -> Vec<ExpandedIndex> {
        let mut closed = Vec::new();
        if max_hypotheses == 0 {
            return closed;
        }

        let best = vec![0; self.len()];
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut frontier = BinaryHeap::new();
        let mut seq = 0;
        seen.insert(best.clone());
        frontier.push(Candidate {
            prob: self.get_probability(&best),
            seq,
            index: best,
        });

        let mut covered = 0.0;
        while let Some(Candidate { prob, index, .. }) = frontier.pop() {
            for worse in self.next_worse_candidates(&index) {
                if seen.insert(worse.clone()) {
                    seq += 1;
                    frontier.push(Candidate {
                        prob: self.get_probability(&worse),
                        seq,
                        index: worse,
                    });
                }
            }
            covered += prob;
            closed.push(ExpandedIndex { prob, index });

            if closed.len() >= max_hypotheses {
                break;
            }
            if prob_mass.is_some_and(|mass| covered >= mass) {
                tracing::debug!(covered, closed = closed.len(), "nbest expansion: probability mass reached");
                break;
            }
        }

        tracing::debug!(
            closed = closed.len(),
            open = frontier.len(),
            covered,
            "nbest expansion finished"
        );
        closed
    }

    /// Linearizes the lattice into its `max_hypotheses` most probable word
    /// sequences, merged, normalized and sorted.
    pub fn get_best_hypotheses(&self, max_hypotheses: usize, prob_mass: Option<f64>) -> RankedHypothesisList {
        let mut nblist: RankedHypothesisList = self
            .expand_indices(max_hypotheses, prob_mass)
            .into_iter()
            .map(|expanded| (expanded.prob, self.utterance_for_index(&expanded.index)))
            .collect();
        nblist.merge().normalize().sort();
        nblist
    }
}

#[cfg(test)]
mod tests {
    use crate::confnet::ConfusionLattice;
    use crate::nbest::NBestEntry;

    fn make_lattice() -> ConfusionLattice {
        ConfusionLattice::from_slots(vec![
            vec![(0.6, "a"), (0.4, "b")],
            vec![(0.7, "x"), (0.3, "y")],
        ])
    }

    fn text(entry: &NBestEntry) -> String {
        entry.to_string()
    }

    #[test]
    fn expands_two_slot_lattice_in_probability_order() {
        let cn = make_lattice();
        let closed = cn.expand_indices(4, None);
        let indices: Vec<&Vec<usize>> = closed.iter().map(|c| &c.index).collect();
        assert_eq!(indices, [&vec![0, 0], &vec![1, 0], &vec![0, 1], &vec![1, 1]]);

        let nblist = cn.get_best_hypotheses(4, None);
        let got: Vec<(String, f64)> = nblist
            .iter()
            .map(|hyp| (text(&hyp.entry), hyp.prob))
            .collect();
        let expected = [("a x", 0.42), ("b x", 0.28), ("a y", 0.18), ("b y", 0.12)];
        assert_eq!(got.len(), expected.len());
        for ((word, prob), (exp_word, exp_prob)) in got.iter().zip(expected) {
            assert_eq!(word, exp_word);
            assert!((prob - exp_prob).abs() < 1e-9, "{word}: {prob}");
        }
        assert!((nblist.total_prob() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn hard_cap_limits_closed_vectors() {
        let cn = make_lattice();
        assert_eq!(cn.expand_indices(2, None).len(), 2);
        assert!(cn.expand_indices(0, None).is_empty());
        assert_eq!(cn.expand_indices(100, None).len(), 4);

        let nblist = cn.get_best_hypotheses(2, None);
        assert!((nblist.get(0).unwrap().prob - 0.42 / 0.70).abs() < 1e-9);
    }

    #[test]
    fn prob_mass_stops_early() {
        let cn = make_lattice();
        // 0.42 + 0.28 passes 0.65.
        assert_eq!(cn.expand_indices(10, Some(0.65)).len(), 2);
        assert_eq!(cn.expand_indices(10, Some(0.1)).len(), 1);
    }

    #[test]
    fn silence_paths_merge() {
        let cn = ConfusionLattice::from_slots(vec![
            vec![(0.5, "a"), (0.5, "")],
            vec![(0.5, "a"), (0.5, "")],
        ]);
        let nblist = cn.get_best_hypotheses(4, None);
        // "a" arises from two index vectors.
        assert_eq!(nblist.len(), 3);
        assert_eq!(text(&nblist.get(0).unwrap().entry), "a");
        assert!((nblist.get(0).unwrap().prob - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_lattice_yields_empty_hypothesis() {
        let nblist = ConfusionLattice::new().get_best_hypotheses(5, None);
        assert_eq!(nblist.len(), 1);
        assert!(nblist.get_best().unwrap().is_empty());
    }
}
