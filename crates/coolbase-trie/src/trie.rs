//! The binary trie.

use bytes::Bytes;
use coolbase_core::{EntryKey, Hash256};

use crate::builder::ProofEntry;
use crate::error::TrieError;
use crate::node::{NodeKind, TrieNode};

/// A path-compressed binary trie keyed by 128-bit [`EntryKey`]s.
///
/// Mutation is single-threaded; a trie returned by a successful proof build
/// is frozen and safe for unlimited concurrent read-only traversal.
#[derive(Default)]
pub struct BinaryTrie {
    root: Option<Box<TrieNode>>,
    frozen_root: Option<Hash256>,
    len: usize,
}

impl BinaryTrie {
    /// An empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn frozen(root: Option<Box<TrieNode>>, root_hash: Hash256, len: usize) -> Self {
        Self {
            root,
            frozen_root: Some(root_hash),
            len,
        }
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the trie holds no records.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once the trie is read-only.
    pub fn is_frozen(&self) -> bool {
        self.frozen_root.is_some()
    }

    /// Insert a record, replacing the payload in place when the key already
    /// exists. The rest of the tree is untouched by a replacement.
    pub fn insert(&mut self, key: EntryKey, payload: impl Into<Bytes>) -> Result<(), TrieError> {
        if self.is_frozen() {
            return Err(TrieError::Frozen);
        }
        let payload = payload.into();
        let replaced = match self.root.take() {
            None => {
                self.root = Some(TrieNode::leaf(key, 0, payload));
                false
            }
            Some(node) => {
                let (node, replaced) = Self::insert_at(node, key, payload);
                self.root = Some(node);
                replaced
            }
        };
        if !replaced {
            self.len += 1;
        }
        Ok(())
    }

    fn insert_at(
        mut node: Box<TrieNode>,
        key: EntryKey,
        payload: Bytes,
    ) -> (Box<TrieNode>, bool) {
        match node.find_common(&key) {
            None => {
                let end_bit = node.end_bit();
                match &mut node.kind {
                    // Identical across the whole span of a leaf: duplicate key,
                    // replace the payload in place.
                    NodeKind::Leaf(existing) => {
                        *existing = payload;
                        (node, true)
                    }
                    NodeKind::Branch(children) => {
                        let idx = usize::from(key.bit(end_bit));
                        let child = std::mem::replace(
                            &mut children[idx],
                            TrieNode::leaf(EntryKey::ZERO, 0, Bytes::new()),
                        );
                        let (child, replaced) = Self::insert_at(child, key, payload);
                        children[idx] = child;
                        (node, replaced)
                    }
                    // Proof tries are frozen before insert can reach a pruned
                    // subtree.
                    NodeKind::Pruned(_) => (node, true),
                }
            }
            Some(split_bit) => {
                // The edge diverges at split_bit: introduce a branch owning
                // the shared span, with the old subtree and a fresh leaf as
                // its two children.
                let offset_start = node.offset_start;
                node.offset_start = split_bit + 1;
                let new_leaf = TrieNode::leaf(key, split_bit + 1, payload);
                let (child0, child1) = if key.bit(split_bit) {
                    (node, new_leaf)
                } else {
                    (new_leaf, node)
                };
                (
                    TrieNode::branch(key, offset_start, split_bit, child0, child1),
                    false,
                )
            }
        }
    }

    /// Look up a record by repeatedly applying the prefix comparison and the
    /// routing bit.
    pub fn get(&self, key: &EntryKey) -> Option<&[u8]> {
        let mut node = self.root.as_deref()?;
        loop {
            if !node.compare(key) {
                return None;
            }
            match &node.kind {
                NodeKind::Leaf(payload) => return Some(payload),
                NodeKind::Pruned(_) => return None,
                NodeKind::Branch(children) => {
                    node = &children[usize::from(node.is_next_1(key))];
                }
            }
        }
    }

    /// True if the key is present.
    pub fn contains(&self, key: &EntryKey) -> bool {
        self.get(key).is_some()
    }

    /// The trie's content-addressed fingerprint.
    ///
    /// Deterministic over the key/payload set: insertion order never
    /// matters. The empty trie hashes to the zero sentinel.
    pub fn root_hash(&self) -> Hash256 {
        if let Some(hash) = self.frozen_root {
            return hash;
        }
        match &self.root {
            Some(node) => node.hash(),
            None => Hash256::ZERO,
        }
    }

    /// The minimal authentication path for `key`: the pruned siblings along
    /// the descent plus the target leaf's own claim.
    ///
    /// Feeding the returned entries to a [`TrieBuilder`](crate::TrieBuilder)
    /// together with [`root_hash`](Self::root_hash) reconstructs and
    /// verifies the claim. Returns `None` when the key is absent or the
    /// path crosses a pruned subtree.
    pub fn proof(&self, key: &EntryKey) -> Option<Vec<ProofEntry>> {
        let mut entries = Vec::new();
        let mut node = self.root.as_deref()?;
        loop {
            if !node.compare(key) {
                return None;
            }
            match &node.kind {
                NodeKind::Leaf(payload) => {
                    if &node.prefix != key {
                        return None;
                    }
                    entries.push(ProofEntry {
                        prefix: *key,
                        mask_bits: 128,
                        hash: TrieNode::leaf(*key, node.offset_start, payload.clone()).hash(),
                    });
                    return Some(entries);
                }
                NodeKind::Pruned(_) => return None,
                NodeKind::Branch(children) => {
                    let next = usize::from(node.is_next_1(key));
                    let sibling = &children[1 - next];
                    entries.push(ProofEntry {
                        prefix: sibling.prefix,
                        mask_bits: sibling.end_bit(),
                        hash: sibling.hash(),
                    });
                    node = &children[next];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(hi: u64, lo: u64) -> EntryKey {
        EntryKey::from_halves(hi, lo)
    }

    #[test]
    fn test_insert_and_get() {
        let mut trie = BinaryTrie::new();
        trie.insert(key(1, 1), b"a".as_slice()).unwrap();
        trie.insert(key(1, 2), b"b".as_slice()).unwrap();
        trie.insert(key(u64::MAX, 0), b"c".as_slice()).unwrap();

        assert_eq!(trie.len(), 3);
        assert_eq!(trie.get(&key(1, 1)), Some(b"a".as_ref()));
        assert_eq!(trie.get(&key(1, 2)), Some(b"b".as_ref()));
        assert_eq!(trie.get(&key(u64::MAX, 0)), Some(b"c".as_ref()));
        assert_eq!(trie.get(&key(2, 2)), None);
    }

    #[test]
    fn test_duplicate_replaces_payload_only() {
        let mut trie = BinaryTrie::new();
        trie.insert(key(1, 1), b"a".as_slice()).unwrap();
        trie.insert(key(1, 2), b"b".as_slice()).unwrap();
        let before = trie.root_hash();

        trie.insert(key(1, 1), b"a2".as_slice()).unwrap();
        assert_eq!(trie.len(), 2);
        assert_eq!(trie.get(&key(1, 1)), Some(b"a2".as_ref()));
        assert_eq!(trie.get(&key(1, 2)), Some(b"b".as_ref()));
        assert_ne!(trie.root_hash(), before);

        // Restoring the payload restores the exact root.
        trie.insert(key(1, 1), b"a".as_slice()).unwrap();
        assert_eq!(trie.root_hash(), before);
    }

    #[test]
    fn test_root_hash_is_order_independent() {
        let keys = [key(3, 9), key(0, 1), key(u64::MAX, u64::MAX), key(3, 8)];
        let mut forward = BinaryTrie::new();
        for k in keys {
            forward.insert(k, k.to_hex().into_bytes()).unwrap();
        }
        let mut backward = BinaryTrie::new();
        for k in keys.iter().rev() {
            backward.insert(*k, k.to_hex().into_bytes()).unwrap();
        }
        assert_eq!(forward.root_hash(), backward.root_hash());
    }

    #[test]
    fn test_root_hash_depends_on_content() {
        let mut a = BinaryTrie::new();
        a.insert(key(1, 1), b"x".as_slice()).unwrap();
        let mut b = BinaryTrie::new();
        b.insert(key(1, 2), b"x".as_slice()).unwrap();
        assert_ne!(a.root_hash(), b.root_hash());
        assert_ne!(a.root_hash(), Hash256::ZERO);
    }

    #[test]
    fn test_empty_trie() {
        let trie = BinaryTrie::new();
        assert!(trie.is_empty());
        assert_eq!(trie.root_hash(), Hash256::ZERO);
        assert_eq!(trie.get(&key(0, 0)), None);
    }

    #[test]
    fn test_adjacent_keys_split_at_last_bit() {
        // Keys differing only in bit 127 force the deepest split.
        let mut trie = BinaryTrie::new();
        trie.insert(key(0, 0), b"even".as_slice()).unwrap();
        trie.insert(key(0, 1), b"odd".as_slice()).unwrap();
        assert_eq!(trie.get(&key(0, 0)), Some(b"even".as_ref()));
        assert_eq!(trie.get(&key(0, 1)), Some(b"odd".as_ref()));
    }

    proptest! {
        #[test]
        fn prop_all_inserted_keys_reachable(
            entries in proptest::collection::btree_map(
                (any::<u64>(), any::<u64>()),
                proptest::collection::vec(any::<u8>(), 0..8),
                1..64,
            )
        ) {
            let mut trie = BinaryTrie::new();
            for ((hi, lo), payload) in &entries {
                trie.insert(key(*hi, *lo), payload.clone()).unwrap();
            }
            prop_assert_eq!(trie.len(), entries.len());
            for ((hi, lo), payload) in &entries {
                prop_assert_eq!(trie.get(&key(*hi, *lo)), Some(payload.as_slice()));
            }
        }

        #[test]
        fn prop_insertion_order_irrelevant(
            keys in proptest::collection::btree_set((any::<u64>(), any::<u64>()), 2..32)
        ) {
            let keys: Vec<_> = keys.iter().map(|(hi, lo)| key(*hi, *lo)).collect();
            let mut sorted = BinaryTrie::new();
            for k in &keys {
                sorted.insert(*k, k.as_bytes().to_vec()).unwrap();
            }
            let mut shuffled = BinaryTrie::new();
            for k in keys.iter().rev() {
                shuffled.insert(*k, k.as_bytes().to_vec()).unwrap();
            }
            prop_assert_eq!(sorted.root_hash(), shuffled.root_hash());
        }
    }
}
