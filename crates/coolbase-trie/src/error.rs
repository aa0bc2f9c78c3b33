//! Error types for the trie.

use thiserror::Error;

/// Errors from trie mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TrieError {
    /// The trie was produced by a successful proof build and is read-only.
    #[error("trie is frozen")]
    Frozen,
}
