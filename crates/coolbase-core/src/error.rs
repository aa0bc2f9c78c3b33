//! Error types for the CoolBase core primitives.

use thiserror::Error;

/// Errors from the core primitives.
///
/// `Clone` is required because failed lazy computations upstream cache the
/// error and replay it on every later access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("byte source is closed")]
    SourceClosed,

    #[error("byte source exhausted")]
    SourceExhausted,

    #[error("byte sink is closed")]
    SinkClosed,

    #[error("no active peek scope")]
    NotPeeking,

    #[error("no active cache scope")]
    NotCaching,

    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("public key recovery failed")]
    RecoveryFailed,
}
