use std::borrow::Cow;

use crate::abstraction::Abstracted;
use crate::confnet::{ConfusionLattice, LatticePos};
use crate::error::join_words;

impl ConfusionLattice {
    /// Positions of the abstracted elements, sorted.
    pub fn abstracted_positions(&self) -> &[LatticePos] {
        &self.abstracted
    }

    fn element_text(&self, pos: LatticePos) -> Option<String> {
        match pos {
            LatticePos::Word { slot, alt } => self
                .slots
                .get(slot)
                .and_then(|alternatives| alternatives.get(alt))
                .map(|alt| alt.word.clone()),
            LatticePos::Link { start, link } => self
                .long_links
                .get(start)
                .and_then(|links| links.get(link))
                .map(|link| link.hyp.phrase.join(" ")),
        }
    }
}

impl Abstracted for ConfusionLattice {
    fn phrase2category_label<S: AsRef<str>, L: AsRef<str>>(
        &self,
        phrase: &[S],
        category_label: &[L],
    ) -> Cow<'_, Self> {
        let combined = Self::join_typeval(&join_words(category_label), phrase);
        let Some(mut replaced) = self.replace_tracked(phrase, &[combined], false) else {
            return Cow::Borrowed(self);
        };
        replaced.lattice.abstracted.extend(replaced.inserted);
        replaced.lattice.abstracted.sort();
        replaced.lattice.abstracted.dedup();
        tracing::debug!(
            abstracted = replaced.lattice.abstracted.len(),
            "confnet phrase2category_label"
        );
        Cow::Owned(replaced.lattice)
    }

    fn iter_typeval(&self) -> Vec<String> {
        self.abstracted
            .iter()
            .filter_map(|&pos| self.element_text(pos))
            .collect()
    }

    fn replace_typeval<S: AsRef<str>, R: AsRef<str>>(
        &self,
        combined: &[S],
        replacement: &[R],
    ) -> Cow<'_, Self> {
        let Some(mut replaced) = self.replace_tracked(combined, replacement, false) else {
            return Cow::Borrowed(self);
        };
        let inserted = replaced.inserted;
        replaced
            .lattice
            .abstracted
            .retain(|pos| !inserted.contains(pos));
        Cow::Owned(replaced.lattice)
    }
}
