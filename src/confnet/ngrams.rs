use crate::confnet::ConfusionLattice;
use crate::types::{LongLink, SENTENCE_END, SENTENCE_START};

/// An n-gram hypothesis: probability and words.
pub type NgramHyp<'a> = (f64, Vec<&'a str>);

type NgramIter<'a> = Box<dyn Iterator<Item = NgramHyp<'a>> + 'a>;

fn prepend<'a>(word: &'a str, mut rest: Vec<&'a str>) -> Vec<&'a str> {
    rest.insert(0, word);
    rest
}

impl ConfusionLattice {
    /// N-grams of length `n`, aware of long links.
    ///
    /// With `start = None` every n-gram of the lattice is produced; with
    /// `Some(slot)` only those beginning exactly at `slot`. Words read off a
    /// long link carry the link's combined probability. Sentence boundaries
    /// are added on both sides when `with_boundaries` is set.
    ///
    /// Continuations are recomputed for every prefix, so overlapping windows
    /// repeat work.
    pub fn iter_ngrams(
        &self,
        n: usize,
        with_boundaries: bool,
        start: Option<usize>,
    ) -> NgramIter<'_> {
        let len = self.len();
        let starts = match start {
            None => 0..len,
            Some(slot) if slot < len => slot..slot + 1,
            Some(slot) if slot == len && with_boundaries => len..len,
            Some(_) => return Box::new(std::iter::empty()),
        };
        let at_sentence_start = with_boundaries && start.is_none();
        let anchored = start.is_some();

        match n {
            0 => Box::new(std::iter::empty()),
            1 => {
                let head = at_sentence_start.then(|| (1.0, vec![SENTENCE_START]));
                let tail = (at_sentence_start || start == Some(len))
                    .then(|| (1.0, vec![SENTENCE_END]));
                let body = starts.flat_map(move |slot| {
                    let words = self.slots[slot]
                        .iter()
                        .map(|alt| (alt.prob, vec![alt.word.as_str()]));
                    let links = self.long_links[slot].iter().flat_map(move |link| {
                        let phrase = &link.hyp.phrase;
                        let take = if anchored || phrase.len() == 1 { 1 } else { phrase.len() };
                        let prob = link.hyp.prob;
                        phrase
                            .iter()
                            .take(take)
                            .map(move |word| (prob, vec![word.as_str()]))
                    });
                    words.chain(links)
                });
                Box::new(head.into_iter().chain(body).chain(tail))
            }
            _ => {
                let head: NgramIter<'_> = if at_sentence_start {
                    Box::new(
                        self.iter_ngrams(n - 1, with_boundaries, Some(0))
                            .map(|(prob, rest)| (prob, prepend(SENTENCE_START, rest))),
                    )
                } else {
                    Box::new(std::iter::empty())
                };
                let body = starts.flat_map(move |slot| {
                    let words = self.slots[slot].iter().flat_map(move |alt| {
                        self.iter_ngrams(n - 1, with_boundaries, Some(slot + 1))
                            .map(move |(prob, rest)| {
                                (prob * alt.prob, prepend(alt.word.as_str(), rest))
                            })
                    });
                    let links = self.long_links[slot]
                        .iter()
                        .flat_map(move |link| self.link_ngrams(link, n, with_boundaries, anchored));
                    words.chain(links)
                });
                Box::new(head.chain(body))
            }
        }
    }

    /// N-grams read off `link`: windows lying inside its phrase, then
    /// windows starting in the phrase and continuing after the link's end.
    fn link_ngrams<'a>(
        &'a self,
        link: &'a LongLink,
        n: usize,
        with_boundaries: bool,
        anchored: bool,
    ) -> NgramIter<'a> {
        let phrase = &link.hyp.phrase;
        let l_len = phrase.len();
        let prob = link.hyp.prob;

        let inner_count = match (l_len >= n, anchored) {
            (false, _) => 0,
            (true, true) => 1,
            (true, false) => l_len - n + 1,
        };
        let inner = (0..inner_count).map(move |offset| {
            let words: Vec<&'a str> = phrase[offset..offset + n].iter().map(String::as_str).collect();
            (prob, words)
        });

        // Windows reaching exactly the link's end were produced above.
        let min_offset = if l_len == n { 1 } else { l_len.saturating_sub(n) };
        let end_offset = if anchored { 1 } else { l_len };
        let crossing = (min_offset..end_offset).flat_map(move |offset| {
            let prefix: Vec<&'a str> = phrase[offset..].iter().map(String::as_str).collect();
            self.iter_ngrams(n - prefix.len(), with_boundaries, Some(link.end))
                .map(move |(sub_prob, rest)| {
                    let mut words = prefix.clone();
                    words.extend(rest);
                    (prob * sub_prob, words)
                })
        });

        Box::new(inner.chain(crossing))
    }

    /// N-grams over ordinary alternatives only: the Cartesian product of the
    /// alternatives of every window of `n` slots (boundaries count as slots).
    pub fn iter_ngrams_unaware(
        &self,
        n: usize,
        with_boundaries: bool,
    ) -> impl Iterator<Item = NgramHyp<'_>> + '_ {
        let mut columns: Vec<Vec<(f64, &str)>> = Vec::with_capacity(self.len() + 2);
        if with_boundaries {
            columns.push(vec![(1.0, SENTENCE_START)]);
        }
        columns.extend(self.slots.iter().map(|alternatives| {
            alternatives
                .iter()
                .map(|alt| (alt.prob, alt.word.as_str()))
                .collect()
        }));
        if with_boundaries {
            columns.push(vec![(1.0, SENTENCE_END)]);
        }

        let windows = if n == 0 || n > columns.len() {
            0
        } else {
            columns.len() - n + 1
        };
        (0..windows).flat_map(move |first| SpanHypotheses::new(columns[first..first + n].to_vec()))
    }

    /// Every path through slots `from..to` as (product probability, words).
    pub fn span_hypotheses(&self, from: usize, to: usize) -> SpanHypotheses<'_> {
        let to = to.min(self.len());
        let from = from.min(to);
        SpanHypotheses::new(
            self.slots[from..to]
                .iter()
                .map(|alternatives| {
                    alternatives
                        .iter()
                        .map(|alt| (alt.prob, alt.word.as_str()))
                        .collect()
                })
                .collect(),
        )
    }
}

/// Cartesian product over a run of slots, the last slot varying fastest.
#[derive(Debug, Clone)]
pub struct SpanHypotheses<'a> {
    columns: Vec<Vec<(f64, &'a str)>>,
    counters: Vec<usize>,
    exhausted: bool,
}

impl<'a> SpanHypotheses<'a> {
    fn new(columns: Vec<Vec<(f64, &'a str)>>) -> Self {
        let exhausted = columns.iter().any(Vec::is_empty);
        Self {
            counters: vec![0; columns.len()],
            columns,
            exhausted,
        }
    }
}

impl<'a> Iterator for SpanHypotheses<'a> {
    type Item = NgramHyp<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let mut prob = 1.0;
        let mut words = Vec::with_capacity(self.columns.len());
        for (column, &choice) in self.columns.iter().zip(&self.counters) {
            let (p, word) = column[choice];
            prob *= p;
            words.push(word);
        }

        self.exhausted = true;
        for idx in (0..self.counters.len()).rev() {
            self.counters[idx] += 1;
            if self.counters[idx] < self.columns[idx].len() {
                self.exhausted = false;
                break;
            }
            self.counters[idx] = 0;
        }
        Some((prob, words))
    }
}
