use thiserror::Error;

/// Errors raised while turning filter text into a `Filter` tree.
///
/// Positions are byte offsets into the filter text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty filter")]
    EmptyFilter,

    #[error("malformed path at position {pos}: consecutive dots")]
    MalformedPath { pos: usize },

    #[error("unbalanced brackets at position {pos}")]
    UnbalancedBrackets { pos: usize },

    #[error("invalid index {found} at position {pos}: expected a non-negative integer")]
    InvalidIndex { found: String, pos: usize },

    #[error("unsupported syntax at position {pos}: {what}")]
    UnsupportedSyntax { what: String, pos: usize },

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("invalid string literal at position {pos}: {reason}")]
    InvalidString { reason: String, pos: usize },

    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of filter")]
    UnexpectedEnd,

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("filter nested deeper than {limit} levels at position {pos}")]
    NestingTooDeep { limit: usize, pos: usize },
}

/// Errors raised while evaluating a filter against a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Property '{0}' not found")]
    PropertyNotFound(String),

    #[error("Array index {index} out of bounds (length {length})")]
    IndexOutOfBounds { index: usize, length: usize },

    #[error("Negative array index {0} is not supported")]
    NegativeIndexUnsupported(i64),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Cannot iterate over {0}")]
    CannotIterate(&'static str),

    #[error("Cannot parse '{0}' as a number")]
    InvalidNumber(String),
}

impl EvalError {
    pub(crate) fn mismatch(expected: &'static str, actual: &crate::value::Value) -> Self {
        EvalError::TypeMismatch {
            expected,
            actual: actual.type_name(),
        }
    }
}
