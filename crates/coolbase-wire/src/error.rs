//! Error types for the framing layer.

use thiserror::Error;

use coolbase_codec::CodecError;
use coolbase_core::{CoreError, Version};

/// Errors from packet framing, context parsing, and negotiation.
///
/// `Clone` is deliberate: lazy fields cache a failed computation and replay
/// the same error on every later access (sticky failures).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// The packet did not start with the protocol magic. Fatal for the
    /// conversation.
    #[error("bad packet magic: {0:#010x}")]
    BadMagic(u32),

    /// The packet header checksum did not match. Fatal for the conversation.
    #[error("packet checksum mismatch: computed {computed:#010x}, stored {stored:#010x}")]
    ChecksumMismatch { computed: u32, stored: u32 },

    /// No registered protocol speaks the peer's version.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(Version),

    /// `parse()`/`skip()` on a context with no parts left.
    #[error("context is closed")]
    ContextClosed,

    /// `parse()` on a context whose spawned child is still open.
    #[error("context is blocked by an open child context")]
    Blocked,

    /// A required element was absent from its container.
    #[error("missing element: {0}")]
    MissingElement(&'static str),

    /// An element that must appear once appeared again.
    #[error("duplicate element: {0}")]
    DuplicateElement(&'static str),

    /// The entry type code is not recognized.
    #[error("invalid entry type code: {0}")]
    InvalidEntryType(u64),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("i/o: {0}")]
    Io(#[from] CoreError),
}
