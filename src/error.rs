use thiserror::Error;

#[derive(Debug, Error)]
pub enum HypothesisError {
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON parse error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing \"{phrase}\" in \"{within}\"")]
    NotFound { phrase: String, within: String },
    #[error("unsupported feature type `{feature_type}`; only `ngram` features are implemented")]
    UnsupportedFeatureType { feature_type: String },
    #[error("no features extracted from non-empty input:\n{input}")]
    EmptyFeatureResult { input: String },
    #[error("invalid n-best list state: {message}")]
    InvalidNBestState { message: String },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl HypothesisError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub(crate) fn not_found<S: AsRef<str>>(phrase: &[S], within: impl std::fmt::Display) -> Self {
        Self::NotFound {
            phrase: join_words(phrase),
            within: within.to_string(),
        }
    }

    pub(crate) fn unsupported_feature_type(feature_type: impl Into<String>) -> Self {
        Self::UnsupportedFeatureType {
            feature_type: feature_type.into(),
        }
    }

    pub(crate) fn empty_feature_result(input: impl std::fmt::Display) -> Self {
        Self::EmptyFeatureResult {
            input: input.to_string(),
        }
    }

    pub(crate) fn invalid_nbest_state(message: impl Into<String>) -> Self {
        Self::InvalidNBestState {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

pub(crate) fn join_words<S: AsRef<str>>(words: &[S]) -> String {
    words
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
}
