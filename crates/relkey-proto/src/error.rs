//! Value-layer error types.

use crate::types::TypeTag;
use thiserror::Error;

/// Errors raised while parsing, converting or computing values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Text could not be parsed as an exact decimal.
    #[error("invalid decimal: {0:?}")]
    InvalidDecimal(String),

    /// Arithmetic with no defined result (division by zero).
    #[error("arithmetic domain error: {0}")]
    ArithmeticDomain(String),

    /// A value could not be converted for a column type.
    #[error("cannot convert {input:?} to {tag}")]
    Conversion {
        /// Target column type.
        tag: TypeTag,
        /// Rendering of the rejected input.
        input: String,
    },
}

impl Error {
    pub(crate) fn conversion(tag: TypeTag, input: impl std::fmt::Display) -> Self {
        Error::Conversion {
            tag,
            input: input.to_string(),
        }
    }
}
