//! Precondition errors.
//!
//! Resolution outcomes are never errors; they are `ResolutionResult` values.
//! The only fatal condition is malformed input handed over by the host.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("`{classifier}` expects {expected} type arguments, found {found}")]
    ArgumentCountMismatch {
        classifier: String,
        expected: usize,
        found: usize,
    },

    #[error("`{0}` is not a type parameter")]
    NotATypeParameter(String),

    #[error("unknown scope #{0}")]
    UnknownScope(u32),

    #[error("declaration `{declaration}` names spread parameter {index} but has {count} type parameters")]
    SpreadParameterOutOfRange {
        declaration: String,
        index: usize,
        count: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_count_mismatch_display() {
        let err = ModelError::ArgumentCountMismatch {
            classifier: "Map".into(),
            expected: 2,
            found: 1,
        };
        assert_eq!(err.to_string(), "`Map` expects 2 type arguments, found 1");
    }
}
