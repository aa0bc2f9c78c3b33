//! Error types for the element codec.

use thiserror::Error;

use crate::element::Tag;

/// Errors from element decoding and encoding.
///
/// `Clone` is required because failed lazy computations upstream cache the
/// error and replay it on every later access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("element truncated: needed {needed} more bytes")]
    Truncated { needed: usize },

    #[error("invalid length prefix: {0} length bytes")]
    InvalidLengthPrefix(u8),

    #[error("element length {0} exceeds the enclosing slice")]
    LengthOverflow(u64),

    #[error("unexpected tag {tag} in context {context}")]
    UnexpectedTag { tag: Tag, context: &'static str },

    #[error("integer value does not fit in 64 bits")]
    IntegerOverflow,

    #[error("string value is not valid UTF-8")]
    InvalidString,

    #[error("value length {got} (expected {expected})")]
    InvalidValueLength { expected: usize, got: usize },

    #[error("invalid consistency level byte: {0}")]
    InvalidConsistencyByte(i8),

    #[error("sink error: {0}")]
    Sink(#[from] coolbase_core::CoreError),
}
