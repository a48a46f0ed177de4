//! Error taxonomy.
//!
//! Only conditions a caller can act on are errors here. Reduction overflow is
//! reported as data on the normalized equation, cooperative cancellation is a
//! [`PassOutcome`](crate::engine::PassOutcome), and structural invariant
//! violations inside the node store are panics: they indicate a logic error
//! in the engine, never bad input.

use thiserror::Error;

/// Problems detected before any completion work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The alphabet holds more generators than the configured capacity.
    #[error("alphabet has {requested} generators, capacity is {capacity}")]
    AlphabetCapacity { requested: usize, capacity: usize },
    /// The alphabet has no generators.
    #[error("alphabet must contain at least one generator")]
    EmptyAlphabet,
    /// Two generators share a name.
    #[error("duplicate generator name `{0}`")]
    DuplicateGenerator(String),
    /// A generator name is empty or uses a reserved character.
    #[error("invalid generator name `{0}`")]
    InvalidGeneratorName(String),
    /// A name used in an inverse or separator declaration is not a generator.
    #[error("unknown generator `{0}`")]
    UnknownGenerator(String),
    /// A generator was given two different inverses.
    #[error("generator `{generator}` already has inverse `{existing}`")]
    ConflictingInverse { generator: String, existing: String },
    /// A configuration field is out of range.
    #[error("invalid configuration: {0}")]
    InvalidValue(&'static str),
    /// The word order was built for a different alphabet size.
    #[error("word order covers {order} generators, alphabet has {alphabet}")]
    OrderMismatch { order: usize, alphabet: usize },
}

/// Failure to read a textual word.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WordError {
    /// A token does not name a generator.
    #[error("unknown generator `{token}` at position {position}")]
    UnknownToken { token: String, position: usize },
    /// The word is longer than the engine can represent.
    #[error("word of length {length} exceeds the maximum of {max}")]
    TooLong { length: usize, max: usize },
}

/// Errors surfaced by the string-based engine entry points.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Word(#[from] WordError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = ConfigError::DuplicateGenerator("a".into());
        assert_eq!(err.to_string(), "duplicate generator name `a`");
        let err = WordError::UnknownToken {
            token: "z".into(),
            position: 3,
        };
        assert!(err.to_string().contains("`z`"));
    }

    #[test]
    fn engine_error_wraps_transparently() {
        let inner = ConfigError::EmptyAlphabet;
        let outer: EngineError = inner.clone().into();
        assert_eq!(outer.to_string(), inner.to_string());
    }
}
