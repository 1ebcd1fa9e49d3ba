use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::error::HypothesisError;
use crate::types::{Alternative, LongLink, OneBestHypothesis, PhraseHyp};
use crate::utterance::WordSequence;

mod abstraction;
mod ngrams;
mod phrase;
mod replace;

pub use ngrams::{NgramHyp, SpanHypotheses};

/// Location of a single element (alternative or long link) of a lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LatticePos {
    Word { slot: usize, alt: usize },
    Link { start: usize, link: usize },
}

/// Word confusion network.
///
/// `slots[i]` holds the competing single-word alternatives of position `i`,
/// `long_links[i]` the multi-word links starting at position `i`. The two
/// vectors always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfusionLattice {
    slots: Vec<Vec<Alternative>>,
    long_links: Vec<Vec<LongLink>>,
    #[serde(skip)]
    word_set: HashSet<String>,
    /// Positions of abstracted (category-labelled) elements, sorted.
    #[serde(skip)]
    abstracted: Vec<LatticePos>,
}

impl ConfusionLattice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a lattice by calling [`add`](Self::add) for every slot.
    pub fn from_slots<I, S, A>(slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = A>,
        A: Into<Alternative>,
    {
        let mut confnet = Self::new();
        for alternatives in slots {
            confnet.add(alternatives);
        }
        confnet
    }

    /// Appends a slot. The alternatives are normalized to sum to one.
    pub fn add<I, A>(&mut self, alternatives: I)
    where
        I: IntoIterator<Item = A>,
        A: Into<Alternative>,
    {
        let mut alternatives: Vec<Alternative> = alternatives.into_iter().map(Into::into).collect();
        let total: f64 = alternatives.iter().map(|alt| alt.prob).sum();
        if total > 0.0 {
            for alt in &mut alternatives {
                alt.prob /= total;
            }
        } else {
            tracing::warn!(
                slot = self.slots.len(),
                total,
                "confnet add: slot without positive probability mass"
            );
        }
        self.word_set
            .extend(alternatives.iter().map(|alt| alt.word.clone()));
        self.slots.push(alternatives);
        self.long_links.push(Vec::new());
    }

    /// Adds a link crossing slots `start..end` with one hop probability per
    /// spanned slot. The link probability is the product of the hops; call
    /// [`normalize`](Self::normalize) once all links are in place.
    pub fn add_long_link(
        &mut self,
        start: usize,
        end: usize,
        orig_probs: Vec<f64>,
        phrase: Vec<String>,
    ) -> Result<(), HypothesisError> {
        if end <= start + 1 || end > self.slots.len() {
            return Err(HypothesisError::invalid_input(format!(
                "long link {start}..{end} must span at least two of {} slots",
                self.slots.len()
            )));
        }
        if orig_probs.len() != end - start {
            return Err(HypothesisError::invalid_input(format!(
                "long link {start}..{end} needs {} hop probabilities, got {}",
                end - start,
                orig_probs.len()
            )));
        }
        if phrase.is_empty() {
            return Err(HypothesisError::invalid_input("long link with an empty phrase"));
        }
        self.word_set.extend(phrase.iter().cloned());
        let prob = orig_probs.iter().product();
        self.long_links[start].push(LongLink {
            end,
            orig_probs,
            hyp: PhraseHyp { prob, phrase },
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the lattice has neither slots nor long links.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.long_links.iter().all(Vec::is_empty)
    }

    pub fn slots(&self) -> &[Vec<Alternative>] {
        &self.slots
    }

    pub fn slot(&self, idx: usize) -> Option<&[Alternative]> {
        self.slots.get(idx).map(Vec::as_slice)
    }

    pub fn long_links(&self, start: usize) -> &[LongLink] {
        self.long_links.get(start).map_or(&[], Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[Alternative]> + '_ {
        self.slots.iter().map(Vec::as_slice)
    }

    pub fn word_set(&self) -> &HashSet<String> {
        &self.word_set
    }

    /// Lowercases every alternative and long-link phrase in place.
    pub fn lower(&mut self) -> &mut Self {
        for alt in self.slots.iter_mut().flatten() {
            alt.word = alt.word.to_lowercase();
        }
        for link in self.long_links.iter_mut().flatten() {
            for word in &mut link.hyp.phrase {
                *word = word.to_lowercase();
            }
        }
        self.rebuild_word_set();
        self
    }

    pub(crate) fn rebuild_word_set(&mut self) {
        self.word_set = self
            .slots
            .iter()
            .flatten()
            .map(|alt| alt.word.clone())
            .chain(
                self.long_links
                    .iter()
                    .flatten()
                    .flat_map(|link| link.hyp.phrase.iter().cloned()),
            )
            .collect();
    }

    /// Probability mass at `slot`: its alternatives plus the hop probability
    /// of every long link covering it.
    pub fn slot_mass(&self, slot: usize) -> f64 {
        let alternatives: f64 = self.slots.get(slot).map_or(0.0, |alts| {
            alts.iter().map(|alt| alt.prob).sum()
        });
        let links: f64 = self
            .long_links
            .iter()
            .enumerate()
            .take(slot + 1)
            .flat_map(|(start, links)| links.iter().map(move |link| (start, link)))
            .filter(|(_, link)| link.end > slot)
            .filter_map(|(start, link)| link.orig_probs.get(slot - start))
            .sum();
        alternatives + links
    }

    /// Rescales slots `0..end` (all slots by default) so that the mass at
    /// every slot is one, then refreshes each link probability to the product
    /// of its hops. Slots without mass are left alone.
    pub fn normalize(&mut self, end: Option<usize>) {
        let end = end.map_or(self.slots.len(), |end| end.min(self.slots.len()));
        let mut covering: Vec<(usize, usize)> = Vec::new();
        for slot in 0..end {
            covering.retain(|&(start, link)| self.long_links[start][link].end > slot);
            covering.extend((0..self.long_links[slot].len()).map(|link| (slot, link)));

            let total = self.slots[slot].iter().map(|alt| alt.prob).sum::<f64>()
                + covering
                    .iter()
                    .filter_map(|&(start, link)| {
                        self.long_links[start][link].orig_probs.get(slot - start)
                    })
                    .sum::<f64>();
            if total <= 0.0 {
                tracing::debug!(slot, "confnet normalize: skipping slot without mass");
                continue;
            }

            for alt in &mut self.slots[slot] {
                alt.prob /= total;
            }
            for &(start, link) in &covering {
                if let Some(hop) = self.long_links[start][link].orig_probs.get_mut(slot - start) {
                    *hop /= total;
                }
            }
        }

        for link in self.long_links.iter_mut().flatten() {
            link.hyp.prob = link.orig_probs.iter().product();
        }
    }

    /// Sorts the alternatives of every slot by decreasing probability. Long
    /// links keep their order.
    pub fn sort(&mut self) -> &mut Self {
        for (slot, alternatives) in self.slots.iter_mut().enumerate() {
            let mut order: Vec<usize> = (0..alternatives.len()).collect();
            order.sort_by(|&a, &b| alternatives[b].prob.total_cmp(&alternatives[a].prob));
            if order.iter().enumerate().all(|(new, &old)| new == old) {
                continue;
            }
            *alternatives = order.iter().map(|&old| alternatives[old].clone()).collect();
            for pos in &mut self.abstracted {
                if let LatticePos::Word { slot: s, alt } = pos {
                    if *s == slot {
                        if let Some(new) = order.iter().position(|old| old == alt) {
                            *alt = new;
                        }
                    }
                }
            }
        }
        self.abstracted.sort();
        self
    }

    /// Drops alternatives below `prune_prob` (a slot keeps at least its best
    /// alternative) and removes silence slots: those whose best alternative
    /// is the empty word with probability above `1 - prune_prob`, or whose
    /// only surviving alternative is the empty word. Slots that carry nothing
    /// are removed as well. Slots covered by long links are never removed
    /// and long links themselves are not pruned.
    pub fn prune(&mut self, prune_prob: f64) {
        let covered = self.covered_slots();
        let slots = std::mem::take(&mut self.slots);
        let long_links = std::mem::take(&mut self.long_links);

        let mut slot_map: Vec<Option<usize>> = vec![None; slots.len()];
        let mut alt_maps: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
        for (idx, (alternatives, links)) in slots.into_iter().zip(long_links).enumerate() {
            let best = alternatives
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.prob.total_cmp(&b.prob))
                .map(|(best_idx, alt)| (best_idx, alt.clone()));
            let mut kept: Vec<usize> = alternatives
                .iter()
                .enumerate()
                .filter(|(_, alt)| alt.prob >= prune_prob)
                .map(|(alt_idx, _)| alt_idx)
                .collect();
            if kept.is_empty() {
                kept.extend(best.as_ref().map(|(best_idx, _)| *best_idx));
            }

            let silent_best = best
                .as_ref()
                .map_or(false, |(_, alt)| alt.word.is_empty() && alt.prob > 1.0 - prune_prob);
            let only_silence = kept.len() == 1 && alternatives[kept[0]].word.is_empty();
            if !covered[idx] && (kept.is_empty() || silent_best || only_silence) {
                tracing::debug!(slot = idx, "confnet prune: dropping silence slot");
                continue;
            }

            slot_map[idx] = Some(self.slots.len());
            self.slots
                .push(kept.iter().map(|&alt_idx| alternatives[alt_idx].clone()).collect());
            self.long_links.push(links);
            alt_maps[idx] = kept;
        }

        for link in self.long_links.iter_mut().flatten() {
            // The last spanned slot is covered, so it survived.
            if let Some(last) = slot_map.get(link.end - 1).copied().flatten() {
                link.end = last + 1;
            }
        }
        self.abstracted = std::mem::take(&mut self.abstracted)
            .into_iter()
            .filter_map(|pos| match pos {
                LatticePos::Word { slot, alt } => {
                    let new_slot = slot_map.get(slot).copied().flatten()?;
                    let new_alt = alt_maps[slot].iter().position(|&old| old == alt)?;
                    Some(LatticePos::Word {
                        slot: new_slot,
                        alt: new_alt,
                    })
                }
                LatticePos::Link { start, link } => Some(LatticePos::Link {
                    start: slot_map.get(start).copied().flatten()?,
                    link,
                }),
            })
            .collect();

        self.normalize(None);
        self.rebuild_word_set();
    }

    fn covered_slots(&self) -> Vec<bool> {
        let mut covered = vec![false; self.slots.len()];
        for (start, links) in self.long_links.iter().enumerate() {
            for link in links {
                for flag in covered.iter_mut().take(link.end).skip(start) {
                    *flag = true;
                }
            }
        }
        covered
    }

    /// Product of the chosen alternative probabilities, one index per slot.
    /// Long links are not considered.
    pub fn get_probability(&self, hyp_index: &[usize]) -> f64 {
        hyp_index
            .iter()
            .zip(&self.slots)
            .map(|(&alt_idx, alternatives)| {
                debug_assert!(alt_idx < alternatives.len() || alternatives.is_empty());
                alternatives.get(alt_idx).map_or(1.0, |alt| alt.prob)
            })
            .product()
    }

    /// Indices obtained by moving a single slot one alternative down.
    /// Assumes sorted slots.
    pub fn next_worse_candidates(&self, hyp_index: &[usize]) -> Vec<Vec<usize>> {
        (0..hyp_index.len())
            .filter(|&slot| hyp_index[slot] + 1 < self.slots.get(slot).map_or(0, Vec::len))
            .map(|slot| {
                let mut worse = hyp_index.to_vec();
                worse[slot] += 1;
                worse
            })
            .collect()
    }

    /// Word sequence selected by `hyp_index`; empty words (silence) vanish.
    pub fn utterance_for_index(&self, hyp_index: &[usize]) -> WordSequence {
        WordSequence::from_words(
            hyp_index
                .iter()
                .zip(&self.slots)
                .filter_map(|(&alt_idx, alternatives)| alternatives.get(alt_idx))
                .filter(|alt| !alt.word.is_empty())
                .map(|alt| alt.word.clone())
                .collect(),
        )
    }

    /// First alternative of every slot. Long links are not considered.
    pub fn best_utterance(&self) -> WordSequence {
        self.utterance_for_index(&vec![0; self.slots.len()])
    }

    pub fn best_hypothesis(&self) -> OneBestHypothesis {
        let best_index = vec![0; self.slots.len()];
        OneBestHypothesis {
            prob: self.get_probability(&best_index),
            utterance: self.utterance_for_index(&best_index),
        }
    }
}

impl std::fmt::Display for ConfusionLattice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (start, alternatives) in self.slots.iter().enumerate() {
            if start > 0 {
                writeln!(f)?;
            }
            let mut parts: Vec<String> = alternatives
                .iter()
                .map(|alt| format!("({:.3}: {})", alt.prob, alt.word))
                .collect();
            parts.extend(self.long_links[start].iter().map(|link| {
                format!(
                    "[{} ({:.3}: {})]",
                    link.end - start,
                    link.hyp.prob,
                    link.hyp.phrase.join(" ")
                )
            }));
            f.write_str(&parts.join(" "))?;
        }
        Ok(())
    }
}

/// Reads a lattice from JSON: an array of slots, each an array of
/// `[probability, word]` pairs.
pub fn load_confnet(path: &Path) -> Result<ConfusionLattice, HypothesisError> {
    let data =
        std::fs::read_to_string(path).map_err(|e| HypothesisError::io("read confnet json", e))?;
    let slots: Vec<Vec<(f64, String)>> =
        serde_json::from_str(&data).map_err(|e| HypothesisError::json("parse confnet json", e))?;
    Ok(ConfusionLattice::from_slots(slots))
}
