use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::HypothesisError;
use crate::utterance::WordSequence;

const KEY_SEPARATOR: &str = "=>";

/// Loads `key => utterance` lines from `path`. See [`parse_utterances`].
pub fn load_utterances(
    path: &Path,
    limit: Option<usize>,
) -> Result<BTreeMap<String, WordSequence>, HypothesisError> {
    let file = File::open(path).map_err(|e| HypothesisError::io("open utterance file", e))?;
    parse_utterances(BufReader::new(file), limit)
}

/// Parses lines of the form `<key> => <utterance>`.
///
/// Blank lines are skipped. A line without exactly one separator is kept
/// whole and keyed by its zero-based line number. Later duplicates of a key
/// overwrite earlier ones. At most `limit` lines are read.
pub fn parse_utterances<R: BufRead>(
    reader: R,
    limit: Option<usize>,
) -> Result<BTreeMap<String, WordSequence>, HypothesisError> {
    let mut utterances = BTreeMap::new();
    for (line_id, line) in reader
        .lines()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
    {
        let line = line.map_err(|e| HypothesisError::io("read utterance line", e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(KEY_SEPARATOR).collect();
        let (key, text) = match parts.as_slice() {
            [key, text] => (key.trim().to_string(), text.trim()),
            _ => {
                tracing::debug!(line_id, "utterance line without a single key separator");
                (line_id.to_string(), line)
            }
        };

        if let Some(previous) = utterances.insert(key.clone(), WordSequence::new(text)) {
            tracing::warn!(
                key = key.as_str(),
                previous = %previous,
                "duplicate utterance key; keeping the later line"
            );
        }
    }
    Ok(utterances)
}
