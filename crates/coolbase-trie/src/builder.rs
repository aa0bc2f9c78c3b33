//! Proof reconstruction.
//!
//! A proof is a flat list of [`ProofEntry`] claims: hashed subtrees
//! identified by a masked key prefix. [`TrieBuilder`] reassembles them into
//! the unique canonical tree for those prefixes and checks the recomputed
//! root against the root the prover claimed. Because the tree shape is
//! fully determined by the prefixes, a prover cannot rearrange subtrees
//! without changing the root hash.

use coolbase_core::{EntryKey, Hash256};

use crate::node::{mask_key, NodeKind, TrieNode};
use crate::trie::BinaryTrie;

/// One hashed subtree of a proof: the subtree covers every key matching
/// `prefix` over its first `mask_bits` bits. `mask_bits == 128` claims a
/// single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofEntry {
    pub prefix: EntryKey,
    pub mask_bits: u8,
    pub hash: Hash256,
}

/// Reassembles [`ProofEntry`] lists into a verified [`BinaryTrie`].
#[derive(Default)]
pub struct TrieBuilder {
    entries: Vec<ProofEntry>,
}

impl TrieBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one subtree claim. Order does not matter.
    pub fn add(&mut self, entry: ProofEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    /// Reassemble the claims and verify them against `claimed_root`.
    ///
    /// Returns `None` when the entries do not describe a well-formed tree
    /// (overlapping or one-sided prefixes) or when the recomputed root
    /// disagrees with the claim. The returned trie is frozen.
    pub fn build(&self, claimed_root: Hash256) -> Option<BinaryTrie> {
        if self.entries.is_empty() || self.entries.iter().any(|e| e.mask_bits > 128) {
            return None;
        }
        let root = Self::assemble(&self.entries, 0)?;
        let computed = root.hash();
        if computed != claimed_root {
            tracing::warn!(
                computed = %computed.to_hex(),
                claimed = %claimed_root.to_hex(),
                "proof root mismatch"
            );
            return None;
        }
        let leaves = self.entries.iter().filter(|e| e.mask_bits == 128).count();
        Some(BinaryTrie::frozen(Some(root), computed, leaves))
    }

    fn assemble(entries: &[ProofEntry], start_bit: u8) -> Option<Box<TrieNode>> {
        if entries.iter().any(|e| e.mask_bits < start_bit) {
            return None;
        }
        if let [entry] = entries {
            return Some(TrieNode::pruned(
                entry.prefix,
                start_bit,
                entry.mask_bits,
                entry.hash,
            ));
        }
        // Every entry's mask reaches at least min_mask, so the split bit
        // must appear before it or the prefixes overlap.
        let min_mask = entries.iter().map(|e| e.mask_bits).min()?;
        let split_bit = (start_bit..min_mask).find(|&i| {
            let first = entries[0].prefix.bit(i);
            entries[1..].iter().any(|e| e.prefix.bit(i) != first)
        })?;

        let (zeros, ones): (Vec<_>, Vec<_>) = entries
            .iter()
            .copied()
            .partition(|e| !e.prefix.bit(split_bit));
        let child0 = Self::assemble(&zeros, split_bit + 1)?;
        let child1 = Self::assemble(&ones, split_bit + 1)?;
        Some(TrieNode::branch(
            entries[0].prefix,
            start_bit,
            split_bit,
            child0,
            child1,
        ))
    }
}

/// Sanity checks on a proof entry against the key it is supposed to prove.
impl ProofEntry {
    /// True when this entry's prefix covers `key`.
    pub fn covers(&self, key: &EntryKey) -> bool {
        mask_key(key, self.mask_bits) == mask_key(&self.prefix, self.mask_bits)
    }
}
