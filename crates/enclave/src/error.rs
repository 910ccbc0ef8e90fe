//! Error taxonomy

use thiserror::Error;

use crate::identifiers::EntityKind;

/// Boxed error from an underlying transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors from talking to the engine.
///
/// Run-level failures (interpretation, validation, execution) are not
/// represented here; they are folded into [`RunResult`](crate::RunResult).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The unary or streaming call failed at the transport level
    #[error("{context}: {source}")]
    Transport {
        /// What the client was doing when the call failed
        context: String,
        /// The transport's own error
        #[source]
        source: BoxError,
    },
    /// The consumer closed the response stream before it finished
    #[error("response stream was closed before it finished")]
    Cancelled,
    /// A push transport went away without signalling end or error
    #[error("response stream ended without a terminal signal")]
    Incomplete,
    /// Invalid client or run configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// JSON (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Wrap a transport error with context.
    pub fn transport(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Transport {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Add an outer layer of context to a transport error. Other variants are
    /// returned unchanged.
    pub fn context(self, outer: impl AsRef<str>) -> Self {
        match self {
            Self::Transport { context, source } => Self::Transport {
                context: format!("{}\n{context}", outer.as_ref()),
                source,
            },
            other => other,
        }
    }
}

/// Failure to resolve an identifier to exactly one full id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// More than one full id matched via the shortened id or name index
    #[error(
        "found multiple {kind}s '{}' matching '{identifier}'; use a full id to be more specific",
        matches.join("', '")
    )]
    Ambiguous {
        /// Kind of entity being resolved
        kind: EntityKind,
        /// The identifier the caller supplied
        identifier: String,
        /// Every full id it matched
        matches: Vec<String>,
    },
    /// Nothing matched
    #[error("no {kind} found for identifier '{identifier}'")]
    NotFound {
        /// Kind of entity being resolved
        kind: EntityKind,
        /// The identifier the caller supplied
        identifier: String,
    },
}
