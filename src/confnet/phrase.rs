use crate::confnet::ConfusionLattice;
use crate::error::HypothesisError;
use crate::types::MatchStep;

fn words_eq<S: AsRef<str>>(words: &[String], phrase: &[S]) -> bool {
    words.len() == phrase.len() && words.iter().zip(phrase).all(|(a, b)| a == b.as_ref())
}

impl ConfusionLattice {
    /// Locates the first occurrence of `phrase` starting in slots
    /// `start..end` (`end` defaults to the lattice length).
    ///
    /// Start slots are tried left to right. At each one the phrase may begin
    /// with an ordinary alternative or with a long link whose phrase is a
    /// prefix of it; the remainder must continue at the very next slot (or at
    /// the link's end). Only if no start slot matches and
    /// `allow_midlink_start` is set, the phrase may also begin inside a long
    /// link and continue after it.
    ///
    /// Matched words occupy consecutive slots; no gaps are allowed.
    ///
    /// An empty result means no match.
    pub fn get_phrase_positions<S: AsRef<str>>(
        &self,
        phrase: &[S],
        start: usize,
        end: Option<usize>,
        allow_midlink_start: bool,
    ) -> Vec<MatchStep> {
        if phrase.is_empty() {
            return Vec::new();
        }
        let end = end.map_or(self.len(), |end| end.min(self.len()));
        if end <= start || !self.contains_all_words(phrase) {
            return Vec::new();
        }

        for slot in start..end {
            if let Some(steps) = self.match_at(phrase, slot, end) {
                return steps;
            }
        }

        if allow_midlink_start {
            for link_start in start..end {
                for (link_idx, link) in self.long_links[link_start].iter().enumerate() {
                    let link_phrase = &link.hyp.phrase;
                    for offset in 1..link_phrase.len() {
                        let suffix = &link_phrase[offset..];
                        if suffix.len() > phrase.len() || !words_eq(suffix, &phrase[..suffix.len()])
                        {
                            continue;
                        }
                        if let Some(rest) = self.match_at(&phrase[suffix.len()..], link.end, end) {
                            let mut steps = vec![MatchStep::Link {
                                start: link_start,
                                link: link_idx,
                                offset,
                            }];
                            steps.extend(rest);
                            return steps;
                        }
                    }
                }
            }
        }

        Vec::new()
    }

    /// Anchored match: `phrase` must begin exactly at `slot`.
    fn match_at<S: AsRef<str>>(
        &self,
        phrase: &[S],
        slot: usize,
        end: usize,
    ) -> Option<Vec<MatchStep>> {
        let Some((first, rest)) = phrase.split_first() else {
            return Some(Vec::new());
        };
        if slot >= end {
            return None;
        }

        if let Some(alt) = self.slots[slot]
            .iter()
            .position(|alt| alt.word == first.as_ref())
        {
            if let Some(tail) = self.match_at(rest, slot + 1, end) {
                let mut steps = vec![MatchStep::Word { slot, alt }];
                steps.extend(tail);
                return Some(steps);
            }
        }

        for (link_idx, link) in self.long_links[slot].iter().enumerate() {
            let link_phrase = &link.hyp.phrase;
            let l_len = link_phrase.len();
            if l_len == 0 || l_len > phrase.len() || !words_eq(link_phrase, &phrase[..l_len]) {
                continue;
            }
            let step = MatchStep::Link {
                start: slot,
                link: link_idx,
                offset: 0,
            };
            if l_len == phrase.len() {
                return Some(vec![step]);
            }
            if link.end <= end {
                if let Some(tail) = self.match_at(&phrase[l_len..], link.end, end) {
                    let mut steps = vec![step];
                    steps.extend(tail);
                    return Some(steps);
                }
            }
        }
        None
    }

    fn contains_all_words<S: AsRef<str>>(&self, phrase: &[S]) -> bool {
        phrase
            .iter()
            .all(|word| self.word_set.contains(word.as_ref()))
    }

    /// Slot where the first occurrence of `phrase` starts, long links
    /// included. A phrase starting inside a long link reports the link's
    /// start slot.
    pub fn find<S: AsRef<str>>(&self, phrase: &[S]) -> Option<usize> {
        self.find_in(phrase, 0, None)
    }

    pub fn find_in<S: AsRef<str>>(
        &self,
        phrase: &[S],
        start: usize,
        end: Option<usize>,
    ) -> Option<usize> {
        self.get_phrase_positions(phrase, start, end, true)
            .first()
            .map(MatchStep::slot)
    }

    pub fn index<S: AsRef<str>>(&self, phrase: &[S]) -> Result<usize, HypothesisError> {
        self.find(phrase)
            .ok_or_else(|| HypothesisError::not_found(phrase, self))
    }

    pub fn contains_phrase<S: AsRef<str>>(&self, phrase: &[S]) -> bool {
        self.find(phrase).is_some()
    }

    /// Phrase search over ordinary alternatives only, ignoring long links.
    /// Runs a prefix state machine over slots `start..end`.
    pub fn find_unaware<S: AsRef<str>>(
        &self,
        phrase: &[S],
        start: usize,
        end: Option<usize>,
    ) -> Option<usize> {
        if phrase.is_empty() || !self.contains_all_words(phrase) {
            return None;
        }
        let end = end.map_or(self.len(), |end| end.min(self.len()));

        // states[k]: a prefix of `phrase` of length k ends at the current slot.
        let mut states = vec![false; phrase.len() + 1];
        states[0] = true;
        for slot in start..end {
            let mut next = vec![false; phrase.len() + 1];
            next[0] = true;
            for (matched, &active) in states.iter().enumerate().take(phrase.len()) {
                if active
                    && self.slots[slot]
                        .iter()
                        .any(|alt| alt.word == phrase[matched].as_ref())
                {
                    next[matched + 1] = true;
                }
            }
            if next[phrase.len()] {
                return Some(slot + 1 - phrase.len());
            }
            states = next;
        }
        None
    }
}
