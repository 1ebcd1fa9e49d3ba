use std::borrow::Cow;

use serde::Serialize;

use crate::error::join_words;
use crate::utterance::WordSequence;

/// Separates the category label from the abstracted value in a combined
/// element, e.g. `CITY=new york`.
pub const TYPEVAL_SPLITTER: char = '=';

/// A combined element split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedValue {
    pub combined: String,
    pub value: Vec<String>,
    pub type_: String,
}

impl TypedValue {
    pub fn parse(combined: &str) -> Self {
        let (type_, value) = match combined.split_once(TYPEVAL_SPLITTER) {
            Some((type_, value)) => (type_.to_string(), value),
            None => (combined.to_string(), ""),
        };
        Self {
            combined: combined.to_string(),
            value: value.split(' ').map(str::to_string).collect(),
            type_,
        }
    }
}

/// Hypotheses whose matched spans can be abstracted into category labels
/// (`new york` -> `CITY=new york`) and instantiated back.
pub trait Abstracted: Clone {
    /// Replaces `phrase` by the single combined element
    /// `<category label>=<phrase>` and remembers where it went. Returns the
    /// receiver unchanged when the phrase does not occur.
    fn phrase2category_label<S: AsRef<str>, L: AsRef<str>>(
        &self,
        phrase: &[S],
        category_label: &[L],
    ) -> Cow<'_, Self>;

    /// Combined elements currently recorded as abstracted, in position order.
    fn iter_typeval(&self) -> Vec<String>;

    /// Substitutes the combined element `combined` by `replacement` and
    /// forgets its abstraction record.
    fn replace_typeval<S: AsRef<str>, R: AsRef<str>>(
        &self,
        combined: &[S],
        replacement: &[R],
    ) -> Cow<'_, Self>;

    fn iter_triples(&self) -> Vec<TypedValue> {
        self.iter_typeval()
            .iter()
            .map(|combined| TypedValue::parse(combined))
            .collect()
    }

    fn make_other(type_: &str) -> String {
        format!("{type_}-OTHER")
    }

    fn join_typeval<S: AsRef<str>>(type_: &str, value: &[S]) -> String {
        format!("{type_}{TYPEVAL_SPLITTER}{}", join_words(value))
    }
}

/// A word sequence with the sorted positions of its abstracted elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbstractedUtterance {
    utterance: WordSequence,
    abstracted: Vec<usize>,
}

impl AbstractedUtterance {
    pub fn new(text: &str) -> Self {
        Self::from_utterance(WordSequence::new(text))
    }

    pub fn from_utterance(utterance: WordSequence) -> Self {
        Self {
            utterance,
            abstracted: Vec::new(),
        }
    }

    pub fn utterance(&self) -> &WordSequence {
        &self.utterance
    }

    pub fn abstracted_positions(&self) -> &[usize] {
        &self.abstracted
    }

    /// Replaces the first occurrence of `phrase`, shifting the recorded
    /// positions behind it. Positions inside the replaced span are dropped;
    /// with `mark` the replacement start is recorded.
    fn replace_recording<S: AsRef<str>, R: AsRef<str>>(
        &self,
        phrase: &[S],
        replacement: &[R],
        mark: bool,
    ) -> Cow<'_, Self> {
        let Some((utterance, start)) = self.utterance.replace_at(phrase, replacement) else {
            return Cow::Borrowed(self);
        };
        let span_end = start + phrase.len();
        let mut abstracted: Vec<usize> = self
            .abstracted
            .iter()
            .filter_map(|&idx| match idx {
                idx if idx < start => Some(idx),
                idx if idx >= span_end => Some(idx + replacement.len() - phrase.len()),
                _ => None,
            })
            .collect();
        if mark {
            abstracted.push(start);
            abstracted.sort_unstable();
        }
        Cow::Owned(Self {
            utterance,
            abstracted,
        })
    }
}

impl Abstracted for AbstractedUtterance {
    fn phrase2category_label<S: AsRef<str>, L: AsRef<str>>(
        &self,
        phrase: &[S],
        category_label: &[L],
    ) -> Cow<'_, Self> {
        let combined = Self::join_typeval(&join_words(category_label), phrase);
        self.replace_recording(phrase, &[combined], true)
    }

    fn iter_typeval(&self) -> Vec<String> {
        self.abstracted
            .iter()
            .filter_map(|&idx| self.utterance.get(idx))
            .map(str::to_string)
            .collect()
    }

    fn replace_typeval<S: AsRef<str>, R: AsRef<str>>(
        &self,
        combined: &[S],
        replacement: &[R],
    ) -> Cow<'_, Self> {
        self.replace_recording(combined, replacement, false)
    }
}

impl std::fmt::Display for AbstractedUtterance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.utterance.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_label_replaces_phrase_with_combined_element() {
        let utt = AbstractedUtterance::new("i want to go to new york please");
        let abstracted = utt.phrase2category_label(&["new", "york"], &["CITY"]);
        assert_eq!(
            abstracted.utterance().words(),
            ["i", "want", "to", "go", "to", "CITY=new york", "please"]
        );
        assert_eq!(abstracted.utterance().len(), 7);
        assert_eq!(
            abstracted.utterance().to_string(),
            "i want to go to CITY=new york please"
        );
        assert_eq!(abstracted.abstracted_positions(), [5]);
        assert_eq!(abstracted.iter_typeval(), ["CITY=new york"]);
    }

    #[test]
    fn missing_phrase_borrows_receiver() {
        let utt = AbstractedUtterance::new("hello there");
        let abstracted = utt.phrase2category_label(&["new", "york"], &["CITY"]);
        assert!(matches!(abstracted, Cow::Borrowed(_)));
    }

    #[test]
    fn later_positions_shift_after_replacement() {
        let utt = AbstractedUtterance::new("from new york to san francisco");
        let step1 = utt.phrase2category_label(&["san", "francisco"], &["CITY"]);
        assert_eq!(step1.abstracted_positions(), [4]);
        let step2 = step1.phrase2category_label(&["new", "york"], &["CITY"]);
        assert_eq!(
            step2.utterance().words(),
            ["from", "CITY=new york", "to", "CITY=san francisco"]
        );
        assert_eq!(step2.abstracted_positions(), [1, 3]);
    }

    #[test]
    fn word_right_after_the_span_keeps_its_record() {
        let utt = AbstractedUtterance::new("a b c d");
        let step1 = utt.phrase2category_label(&["c"], &["X"]);
        let step2 = step1.phrase2category_label(&["a", "b"], &["Y"]);
        assert_eq!(step2.utterance().words(), ["Y=a b", "X=c", "d"]);
        assert_eq!(step2.abstracted_positions(), [0, 1]);
    }

    #[test]
    fn triples_split_type_and_value() {
        let utt = AbstractedUtterance::new("to new york")
            .phrase2category_label(&["new", "york"], &["CITY"])
            .into_owned();
        let triples = utt.iter_triples();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].type_, "CITY");
        assert_eq!(triples[0].value, ["new", "york"]);
        assert_eq!(triples[0].combined, "CITY=new york");
    }

    #[test]
    fn replace_typeval_forgets_the_record() {
        let utt = AbstractedUtterance::new("to new york now")
            .phrase2category_label(&["new", "york"], &["CITY"])
            .into_owned();
        let other = AbstractedUtterance::make_other("CITY");
        let instantiated = utt.replace_typeval(&["CITY=new york"], &[other.as_str()]);
        assert_eq!(*instantiated.utterance(), "to CITY-OTHER now");
        assert!(instantiated.abstracted_positions().is_empty());
    }

    #[test]
    fn typed_value_without_splitter() {
        let triple = TypedValue::parse("plain");
        assert_eq!(triple.type_, "plain");
        assert_eq!(triple.value, [""]);
    }
}
