use std::borrow::Cow;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::HypothesisError;
use crate::types::{SENTENCE_END, SENTENCE_START};

mod loader;
pub(crate) mod phrase;

pub use loader::{load_utterances, parse_utterances};

/// An ordered sequence of word tokens.
///
/// The set of distinct words is kept next to the sequence and re-derived on
/// every mutation; phrase search uses it to reject phrases early.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct WordSequence {
    words: Vec<String>,
    word_set: HashSet<String>,
}

impl WordSequence {
    /// Splits `text` on whitespace.
    pub fn new(text: &str) -> Self {
        Self::from_words(text.split_whitespace().map(str::to_string).collect())
    }

    pub fn from_words(words: Vec<String>) -> Self {
        let word_set = words.iter().cloned().collect();
        Self { words, word_set }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn set_words(&mut self, words: Vec<String>) {
        self.word_set = words.iter().cloned().collect();
        self.words = words;
    }

    pub fn word_set(&self) -> &HashSet<String> {
        &self.word_set
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.words.get(idx).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.words.iter().map(String::as_str)
    }

    /// Start index of the first occurrence of `phrase`, `None` if absent.
    pub fn find<S: AsRef<str>>(&self, phrase: &[S]) -> Option<usize> {
        phrase::find_phrase(&self.words, &self.word_set, phrase)
    }

    /// Like [`find`](Self::find) but treats absence as an error.
    pub fn index<S: AsRef<str>>(&self, phrase: &[S]) -> Result<usize, HypothesisError> {
        self.find(phrase)
            .ok_or_else(|| HypothesisError::not_found(phrase, self))
    }

    pub fn contains_phrase<S: AsRef<str>>(&self, phrase: &[S]) -> bool {
        self.find(phrase).is_some()
    }

    /// Substitutes the first occurrence of `phrase` by `replacement`.
    ///
    /// Returns the receiver itself (`Cow::Borrowed`) when `phrase` does not
    /// occur, a new sequence otherwise.
    pub fn replace<S: AsRef<str>, R: AsRef<str>>(
        &self,
        phrase: &[S],
        replacement: &[R],
    ) -> Cow<'_, WordSequence> {
        match self.replace_at(phrase, replacement) {
            Some((replaced, _)) => Cow::Owned(replaced),
            None => Cow::Borrowed(self),
        }
    }

    pub(crate) fn replace_at<S: AsRef<str>, R: AsRef<str>>(
        &self,
        phrase: &[S],
        replacement: &[R],
    ) -> Option<(WordSequence, usize)> {
        let start = self.find(phrase)?;
        let mut words = Vec::with_capacity(self.words.len() + replacement.len());
        words.extend_from_slice(&self.words[..start]);
        words.extend(replacement.iter().map(|word| word.as_ref().to_string()));
        words.extend_from_slice(&self.words[start + phrase.len()..]);
        Some((WordSequence::from_words(words), start))
    }

    /// Lowercases every word in place.
    pub fn lower(&mut self) -> &mut Self {
        for word in &mut self.words {
            *word = word.to_lowercase();
        }
        self.word_set = self.words.iter().cloned().collect();
        self
    }

    /// `[<s>, w1, .., wn, </s>]`.
    pub fn iter_with_boundaries(&self) -> impl Iterator<Item = &str> + '_ {
        std::iter::once(SENTENCE_START)
            .chain(self.iter())
            .chain(std::iter::once(SENTENCE_END))
    }

    /// Contiguous windows of length `n`, optionally over the sequence padded
    /// with sentence boundaries. A sequence exactly as long as the window
    /// yields one window, a shorter one yields none.
    pub fn iter_ngrams(&self, n: usize, with_boundaries: bool) -> Ngrams<'_> {
        let tokens = if with_boundaries {
            self.iter_with_boundaries().collect()
        } else {
            self.iter().collect()
        };
        Ngrams {
            tokens,
            n,
            next_start: 0,
        }
    }
}

/// Iterator returned by [`WordSequence::iter_ngrams`].
#[derive(Debug, Clone)]
pub struct Ngrams<'a> {
    tokens: Vec<&'a str>,
    n: usize,
    next_start: usize,
}

impl<'a> Iterator for Ngrams<'a> {
    type Item = Vec<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.n == 0 || self.next_start + self.n > self.tokens.len() {
            return None;
        }
        let window = self.tokens[self.next_start..self.next_start + self.n].to_vec();
        self.next_start += 1;
        Some(window)
    }
}

impl From<Vec<String>> for WordSequence {
    fn from(words: Vec<String>) -> Self {
        Self::from_words(words)
    }
}

impl From<WordSequence> for Vec<String> {
    fn from(sequence: WordSequence) -> Self {
        sequence.words
    }
}

impl From<&str> for WordSequence {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl PartialEq for WordSequence {
    fn eq(&self, other: &Self) -> bool {
        self.words == other.words
    }
}

impl Eq for WordSequence {}

impl PartialEq<str> for WordSequence {
    fn eq(&self, other: &str) -> bool {
        self.iter().eq(other.split_whitespace())
    }
}

impl PartialEq<&str> for WordSequence {
    fn eq(&self, other: &&str) -> bool {
        <Self as PartialEq<str>>::eq(self, other)
    }
}

impl Hash for WordSequence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.words.hash(state);
    }
}

impl PartialOrd for WordSequence {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WordSequence {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.words.cmp(&other.words)
    }
}

impl std::ops::Index<usize> for WordSequence {
    type Output = str;

    fn index(&self, idx: usize) -> &str {
        &self.words[idx]
    }
}

impl<'a> IntoIterator for &'a WordSequence {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.iter()
    }
}

impl std::fmt::Display for WordSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.words.join(" "))
    }
}
