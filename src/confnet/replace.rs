use std::borrow::Cow;

use crate::confnet::{ConfusionLattice, LatticePos};
use crate::types::{Alternative, LongLink, MatchStep, PhraseHyp};

/// Result of a replacement that matched at least once.
#[derive(Debug, Clone)]
pub(crate) struct Replacement {
    pub lattice: ConfusionLattice,
    /// Where the replacement phrases now live.
    pub inserted: Vec<LatticePos>,
}

impl ConfusionLattice {
    /// Replaces every occurrence of `phrase` by `replacement`.
    ///
    /// Returns the receiver itself (`Cow::Borrowed`) when nothing matches;
    /// otherwise the edits are applied to a copy and the receiver is left
    /// untouched. With `keep` the original elements stay in the lattice next
    /// to the replacement.
    pub fn replace<S: AsRef<str>, R: AsRef<str>>(
        &self,
        phrase: &[S],
        replacement: &[R],
        keep: bool,
    ) -> Cow<'_, ConfusionLattice> {
        match self.replace_tracked(phrase, replacement, keep) {
            Some(replaced) => Cow::Owned(replaced.lattice),
            None => Cow::Borrowed(self),
        }
    }

    pub(crate) fn replace_tracked<S: AsRef<str>, R: AsRef<str>>(
        &self,
        phrase: &[S],
        replacement: &[R],
        keep: bool,
    ) -> Option<Replacement> {
        let mut steps = self.get_phrase_positions(phrase, 0, None, true);
        if steps.is_empty() {
            return None;
        }

        let replacement: Vec<String> = replacement
            .iter()
            .map(|word| word.as_ref().to_string())
            .collect();
        let mut replaced = self.clone();
        let mut inserted = Vec::new();
        let mut do_normalize = false;
        let mut update_word_set = false;

        while let Some(&last) = steps.last() {
            let start_slot = steps[0].slot();

            match (steps.as_slice(), last) {
                _ if replacement.is_empty() => {
                    tracing::debug!(start_slot, keep, "confnet replace: deletion");
                    if !keep {
                        replaced.remove_steps(&steps, true);
                        do_normalize = true;
                        update_word_set = true;
                    }
                }
                ([MatchStep::Word { slot, alt }], _) if replacement.len() == 1 => {
                    let (slot, alt) = (*slot, *alt);
                    tracing::debug!(slot, alt, keep, "confnet replace: single word");
                    if keep {
                        let prob = replaced.slots[slot][alt].prob;
                        replaced.slots[slot].push(Alternative::new(prob, replacement[0].clone()));
                        inserted.push(LatticePos::Word {
                            slot,
                            alt: replaced.slots[slot].len() - 1,
                        });
                        do_normalize = true;
                    } else {
                        replaced.slots[slot][alt].word = replacement[0].clone();
                        inserted.push(LatticePos::Word { slot, alt });
                    }
                    update_word_set = true;
                }
                ([_], MatchStep::Link { start, link, offset }) if offset > 0 => {
                    tracing::debug!(start, link, offset, "confnet replace: long-link tail");
                    let link_phrase = &mut replaced.long_links[start][link].hyp.phrase;
                    link_phrase.truncate(offset);
                    link_phrase.extend(replacement.iter().cloned());
                    inserted.push(LatticePos::Link { start, link });
                    update_word_set = true;
                }
                _ => {
                    let new_link = replaced.link_for_steps(&steps, &replacement);
                    tracing::debug!(
                        start_slot,
                        end = new_link.end,
                        prob = new_link.hyp.prob,
                        keep,
                        "confnet replace: new long link"
                    );
                    if !keep {
                        replaced.remove_steps(&steps, false);
                    }
                    replaced.long_links[start_slot].push(new_link);
                    inserted.push(LatticePos::Link {
                        start: start_slot,
                        link: replaced.long_links[start_slot].len() - 1,
                    });
                    do_normalize = true;
                    update_word_set = true;
                }
            }

            steps = replaced.get_phrase_positions(phrase, start_slot + 1, None, true);
        }

        if do_normalize {
            replaced.normalize(None);
        }
        if update_word_set {
            replaced.rebuild_word_set();
        }

        Some(Replacement {
            lattice: replaced,
            inserted,
        })
    }

    /// Long link replacing the matched steps: probability is the product of
    /// the matched elements, hops are their per-slot probabilities. A match
    /// starting inside a link keeps that link's leading words.
    fn link_for_steps(&self, steps: &[MatchStep], replacement: &[String]) -> LongLink {
        let start_slot = steps[0].slot();
        let mut orig_probs = Vec::new();
        let mut prob = 1.0;
        let mut phrase = Vec::new();
        let mut end = start_slot + 1;

        for step in steps {
            match *step {
                MatchStep::Word { slot, alt } => {
                    let p = self.slots[slot][alt].prob;
                    orig_probs.push(p);
                    prob *= p;
                    end = slot + 1;
                }
                MatchStep::Link {
                    start,
                    link,
                    offset,
                } => {
                    let link = &self.long_links[start][link];
                    orig_probs.extend_from_slice(&link.orig_probs);
                    prob *= link.hyp.prob;
                    phrase.extend(link.hyp.phrase[..offset].iter().cloned());
                    end = link.end;
                }
            }
        }
        phrase.extend(replacement.iter().cloned());
        debug_assert!(end > start_slot, "long link must end after its start");
        debug_assert_eq!(orig_probs.len(), end - start_slot);

        LongLink {
            end,
            orig_probs,
            hyp: PhraseHyp { prob, phrase },
        }
    }

    /// Removes the matched elements. A step starting inside a link either
    /// truncates that link's phrase (`truncate_midlink`) or drops the link.
    fn remove_steps(&mut self, steps: &[MatchStep], truncate_midlink: bool) {
        // Every step sits in its own slot, so indices stay valid.
        for step in steps {
            match *step {
                MatchStep::Word { slot, alt } => {
                    self.slots[slot].remove(alt);
                    self.forget_abstracted(LatticePos::Word { slot, alt });
                }
                MatchStep::Link {
                    start,
                    link,
                    offset,
                } if offset > 0 && truncate_midlink => {
                    self.long_links[start][link].hyp.phrase.truncate(offset);
                }
                MatchStep::Link { start, link, .. } => {
                    self.long_links[start].remove(link);
                    self.forget_abstracted(LatticePos::Link { start, link });
                }
            }
        }
    }

    /// Drops the abstraction record at `removed` and shifts the records
    /// behind it in the same slot.
    fn forget_abstracted(&mut self, removed: LatticePos) {
        self.abstracted.retain(|pos| *pos != removed);
        for pos in &mut self.abstracted {
            match (pos, removed) {
                (
                    LatticePos::Word { slot, alt },
                    LatticePos::Word {
                        slot: removed_slot,
                        alt: removed_alt,
                    },
                ) if *slot == removed_slot && *alt > removed_alt => *alt -= 1,
                (
                    LatticePos::Link { start, link },
                    LatticePos::Link {
                        start: removed_start,
                        link: removed_link,
                    },
                ) if *start == removed_start && *link > removed_link => *link -= 1,
                _ => {}
            }
        }
    }
}
