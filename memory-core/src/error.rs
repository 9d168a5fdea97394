//! Error taxonomy for the memory system.
//!
//! Mirrors the classification in the design: input errors, not-found
//! errors, transient external errors (retryable via the circuit breaker),
//! durable corruption, and fatal I/O.

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the memory system.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested memory does not exist, active or archived.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// An id failed sanitization, or its resolved path escaped the store
    /// root after symlink resolution.
    #[error("invalid id: {0}")]
    InvalidId(String),

    /// A memory file's header could not be parsed.
    #[error("corrupt record for {id}: {reason}")]
    CorruptRecord {
        /// The memory id whose record is corrupt.
        id: String,
        /// Why the header failed to parse.
        reason: String,
    },

    /// A filesystem operation failed outright (not a missing-file case).
    #[error("storage error: {0}")]
    Store(String),

    /// A write was rejected because an exact/normalized/semantic duplicate
    /// already exists and the caller asked for strict rejection.
    #[error("duplicate rejected: {0:?}")]
    DuplicateRejected(crate::dedup::DedupLevel),

    /// `record_review` was called with a grade name the scheduler does not
    /// recognize.
    #[error("invalid grade: {0}")]
    InvalidGrade(String),

    /// `record_review` was called for a memory with no review schedule.
    #[error("not scheduled: {0}")]
    NotScheduled(String),

    /// A reference-count operation used an unrecognized ref kind.
    #[error("invalid ref type: {0}")]
    InvalidRefType(String),

    /// The embedding collaborator could not produce a vector.
    #[error("embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    /// The LLM collaborator did not respond within its deadline.
    #[error("llm timeout after {0:?}")]
    LLMTimeout(std::time::Duration),

    /// A circuit breaker is open and the call was short-circuited.
    #[error("circuit open for {0}")]
    CircuitOpen(String),

    /// A value was outside its documented valid range (e.g. importance,
    /// confidence, strength not in [0, 1]).
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Underlying (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying I/O failure that should propagate rather than be
    /// interpreted as NotFound.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded or was invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Input errors are rejected without being logged as warnings; the
    /// caller is expected to have made a programming mistake.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidId(_)
                | Error::InvalidGrade(_)
                | Error::InvalidRefType(_)
                | Error::OutOfRange(_)
        )
    }

    /// Not-found errors are expected outcomes callers decide how to handle;
    /// they are never logged as warnings.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::NotScheduled(_))
    }

    /// Transient external errors are retryable and are the only family the
    /// circuit breaker acts on.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::EmbedderUnavailable(_) | Error::LLMTimeout(_) | Error::CircuitOpen(_)
        )
    }

    /// Durable corruption is always surfaced for the targeted id, but never
    /// aborts an enumeration of many records.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptRecord { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_input_errors() {
        assert!(Error::InvalidId("bad".into()).is_input_error());
        assert!(Error::InvalidGrade("bad".into()).is_input_error());
        assert!(!Error::NotFound("x".into()).is_input_error());
    }

    #[test]
    fn classifies_not_found() {
        assert!(Error::NotFound("x".into()).is_not_found());
        assert!(Error::NotScheduled("x".into()).is_not_found());
        assert!(!Error::Store("x".into()).is_not_found());
    }

    #[test]
    fn classifies_transient() {
        assert!(Error::EmbedderUnavailable("down".into()).is_transient());
        assert!(Error::CircuitOpen("embedder".into()).is_transient());
        assert!(!Error::Configuration("bad".into()).is_transient());
    }

    #[test]
    fn classifies_corruption() {
        let err = Error::CorruptRecord {
            id: "abc".into(),
            reason: "missing header".into(),
        };
        assert!(err.is_corruption());
    }
}
