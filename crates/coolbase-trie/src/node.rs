//! Trie nodes and bit-span primitives.
//!
//! A node owns a span of key bits `[offset_start, end_bit)`. `offset_start`
//! counts bits already matched above the node; `offset_end` is the negative
//! distance from the full key length, so `-128` is a split at bit 0 and `0`
//! is a leaf. The bit immediately after the span routes to child 0 or
//! child 1.

use bytes::Bytes;
use coolbase_core::digest::sha3_256;
use coolbase_core::types::ENTRY_KEY_BITS;
use coolbase_core::{EntryKey, Hash256};

/// Zero all bits of `key` at or beyond `bits`.
pub(crate) fn mask_key(key: &EntryKey, bits: u8) -> EntryKey {
    if bits >= ENTRY_KEY_BITS {
        return *key;
    }
    let mut out = [0u8; 16];
    let full_bytes = (bits / 8) as usize;
    out[..full_bytes].copy_from_slice(&key.as_bytes()[..full_bytes]);
    let rem = bits % 8;
    if rem != 0 {
        out[full_bytes] = key.as_bytes()[full_bytes] & (0xFF << (8 - rem));
    }
    EntryKey::from_bytes(out)
}

pub(crate) enum NodeKind {
    /// A record: the full key plus its payload.
    Leaf(Bytes),
    /// A subtree known only by its hash (proof reconstruction).
    Pruned(Hash256),
    /// An interior split with exactly two children.
    Branch([Box<TrieNode>; 2]),
}

pub(crate) struct TrieNode {
    /// The key bits routed through this node, masked to the span end.
    pub prefix: EntryKey,
    /// Bits matched above this node.
    pub offset_start: u8,
    /// Negative distance of the span end from the key length.
    pub offset_end: i8,
    pub kind: NodeKind,
}

impl TrieNode {
    pub fn leaf(key: EntryKey, offset_start: u8, payload: Bytes) -> Box<Self> {
        Box::new(Self {
            prefix: key,
            offset_start,
            offset_end: 0,
            kind: NodeKind::Leaf(payload),
        })
    }

    pub fn pruned(prefix: EntryKey, offset_start: u8, end_bit: u8, hash: Hash256) -> Box<Self> {
        Box::new(Self {
            prefix: mask_key(&prefix, end_bit),
            offset_start,
            offset_end: (i16::from(end_bit) - i16::from(ENTRY_KEY_BITS)) as i8,
            kind: NodeKind::Pruned(hash),
        })
    }

    pub fn branch(
        prefix: EntryKey,
        offset_start: u8,
        split_bit: u8,
        child0: Box<TrieNode>,
        child1: Box<TrieNode>,
    ) -> Box<Self> {
        Box::new(Self {
            prefix: mask_key(&prefix, split_bit),
            offset_start,
            offset_end: (i16::from(split_bit) - i16::from(ENTRY_KEY_BITS)) as i8,
            kind: NodeKind::Branch([child0, child1]),
        })
    }

    /// First bit past the node's span (the routing bit for branches).
    pub fn end_bit(&self) -> u8 {
        (i16::from(ENTRY_KEY_BITS) + i16::from(self.offset_end)) as u8
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// True iff `key`'s bits over `[offset_start, end_bit)` equal the
    /// node's prefix.
    pub fn compare(&self, key: &EntryKey) -> bool {
        self.find_common(key).is_none()
    }

    /// Read the routing bit: the key bit immediately after the span.
    pub fn is_next_1(&self, key: &EntryKey) -> bool {
        key.bit(self.end_bit())
    }

    /// Scan forward from `offset_start` for the first bit where `key`
    /// diverges from the prefix. `None` means identical across the span
    /// (for a leaf: a duplicate key).
    pub fn find_common(&self, key: &EntryKey) -> Option<u8> {
        (self.offset_start..self.end_bit()).find(|&i| key.bit(i) != self.prefix.bit(i))
    }

    /// Merkle hash of the subtree rooted here.
    ///
    /// Leaf: `digest(key ‖ payload)`. Branch: `digest(child0 ‖ child1 ‖
    /// prefix ‖ offsets)` so a proof cannot move a subtree to a different
    /// split point without changing the root.
    pub fn hash(&self) -> Hash256 {
        match &self.kind {
            NodeKind::Leaf(payload) => {
                let mut buf = Vec::with_capacity(16 + payload.len());
                buf.extend_from_slice(self.prefix.as_bytes());
                buf.extend_from_slice(payload);
                sha3_256(&buf)
            }
            NodeKind::Pruned(hash) => *hash,
            NodeKind::Branch(children) => {
                let mut buf = Vec::with_capacity(32 + 32 + 16 + 2);
                buf.extend_from_slice(children[0].hash().as_bytes());
                buf.extend_from_slice(children[1].hash().as_bytes());
                buf.extend_from_slice(self.prefix.as_bytes());
                buf.push(self.offset_start);
                buf.push(self.offset_end as u8);
                sha3_256(&buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(hi: u64, lo: u64) -> EntryKey {
        EntryKey::from_halves(hi, lo)
    }

    #[test]
    fn test_mask_key() {
        let k = key(u64::MAX, u64::MAX);
        assert_eq!(mask_key(&k, 0), EntryKey::ZERO);
        assert_eq!(mask_key(&k, 128), k);
        assert_eq!(mask_key(&k, 1), key(0x8000_0000_0000_0000, 0));
        assert_eq!(mask_key(&k, 64), key(u64::MAX, 0));
        assert_eq!(mask_key(&k, 65), key(u64::MAX, 0x8000_0000_0000_0000));
    }

    #[test]
    fn test_leaf_span_and_compare() {
        let k = key(0xA000_0000_0000_0000, 7);
        let leaf = TrieNode::leaf(k, 0, Bytes::from_static(b"p"));
        assert_eq!(leaf.end_bit(), 128);
        assert!(leaf.compare(&k));
        assert!(!leaf.compare(&key(0xA000_0000_0000_0000, 6)));
        assert_eq!(leaf.find_common(&k), None);
    }

    #[test]
    fn test_find_common_reports_first_divergence() {
        let k = key(0xFF00_0000_0000_0000, 0);
        let leaf = TrieNode::leaf(k, 0, Bytes::new());
        // Differs at bit 8 (first bit of the second byte).
        let other = key(0xFF80_0000_0000_0000, 0);
        assert_eq!(leaf.find_common(&other), Some(8));
        // Differs at bit 127.
        let other = key(0xFF00_0000_0000_0000, 1);
        assert_eq!(leaf.find_common(&other), Some(127));
    }

    #[test]
    fn test_branch_routing_bit() {
        let zero_side = TrieNode::leaf(key(0, 0), 1, Bytes::new());
        let one_side = TrieNode::leaf(key(1 << 62, 0), 1, Bytes::new());
        // Split at bit 1: span [0, 1), routing bit is bit 1.
        let branch = TrieNode::branch(key(0, 0), 0, 1, zero_side, one_side);
        assert_eq!(branch.end_bit(), 1);
        assert!(!branch.is_next_1(&key(0, 0)));
        assert!(branch.is_next_1(&key(1 << 62, 0)));
    }

    #[test]
    fn test_leaf_hash_binds_key_and_payload() {
        let a = TrieNode::leaf(key(1, 2), 0, Bytes::from_static(b"x"));
        let b = TrieNode::leaf(key(1, 3), 0, Bytes::from_static(b"x"));
        let c = TrieNode::leaf(key(1, 2), 0, Bytes::from_static(b"y"));
        assert_ne!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }
}
