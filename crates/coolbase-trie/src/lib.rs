//! # CoolBase Trie
//!
//! A path-compressed (PATRICIA) binary trie over 128-bit [`EntryKey`]s,
//! producing a deterministic Merkle digest over a record set. Replicas
//! compare root hashes to agree on data without exchanging payloads, and a
//! partial traversal plus the claimed root is enough to authenticate a
//! single record ([`TrieBuilder`]).
//!
//! Structure is canonical: the same key set always produces the same tree
//! and the same root hash, regardless of insertion order. Every internal
//! node has exactly two children.
//!
//! [`EntryKey`]: coolbase_core::EntryKey

mod builder;
mod error;
mod node;
mod trie;

pub use builder::{ProofEntry, TrieBuilder};
pub use error::TrieError;
pub use trie::BinaryTrie;
