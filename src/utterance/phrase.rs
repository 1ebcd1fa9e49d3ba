use std::collections::HashSet;

/// Leftmost occurrence of `phrase` in `words`.
///
/// Phrases containing a word outside `word_set` are rejected without
/// scanning. On a partial match the scan skips ahead to the next position
/// where the phrase's first word can occur inside the matched prefix, which
/// is safe because no earlier position can start a match.
pub(crate) fn find_phrase<S: AsRef<str>>(
    words: &[String],
    word_set: &HashSet<String>,
    phrase: &[S],
) -> Option<usize> {
    let (initial, rest) = phrase.split_first()?;
    if !phrase.iter().all(|word| word_set.contains(word.as_ref())) {
        return None;
    }
    if phrase.len() > words.len() {
        return None;
    }

    let initial = initial.as_ref();
    let max_skip = rest
        .iter()
        .position(|word| word.as_ref() == initial)
        .map_or(phrase.len(), |pos| pos + 1);

    let last_idx = words.len() - phrase.len();
    let mut match_idx = 0usize;
    while match_idx <= last_idx {
        if words[match_idx] != initial {
            match_idx += 1;
            continue;
        }
        let mismatch =
            (1..phrase.len()).find(|&k| words[match_idx + k] != phrase[k].as_ref());
        match mismatch {
            None => return Some(match_idx),
            Some(k) => match_idx += max_skip.min(k),
        }
    }
    None
}
