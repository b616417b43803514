//! Engine errors.
//!
//! Two families: syntax/definition errors carry the source span of the
//! offending construct and are always fatal; resource errors (character
//! limit, frame depth) abort the run with no partial output considered
//! valid. Missing dictionary data is deliberately *not* an error; it
//! degrades to a sentinel string in the output.

use thiserror::Error;

use weft_foundation::RngError;
use weft_pattern::Span;

/// Engine result type.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine errors. All variants terminate the run; none are retried.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown tag '{name}' at {span}")]
    UnknownTag { name: String, span: Span },

    #[error("tag '{name}' at {span} expects {expected} argument(s), got {got}")]
    ArgumentMismatch {
        name: String,
        expected: usize,
        got: usize,
        span: Span,
    },

    #[error("invalid argument for tag '{name}' at {span}: {message}")]
    InvalidArgument {
        name: String,
        message: String,
        span: Span,
    },

    #[error("unresolved subroutine '{name}' taking {arity} argument(s) at {span}")]
    UnresolvedSubroutine {
        name: String,
        arity: usize,
        span: Span,
    },

    #[error("malformed pattern at {span}: {message}")]
    MalformedPattern { message: String, span: Span },

    #[error("character output limit of {limit} exceeded")]
    CharLimitExceeded { limit: usize },

    #[error("frame depth limit of {max} exceeded")]
    FrameDepthExceeded { max: usize },

    #[error(transparent)]
    Rng(#[from] RngError),
}
