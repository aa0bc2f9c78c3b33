//! Streaming digest primitives behind a name-keyed registry.
//!
//! Two algorithms are carried: Keccak-256 for content hashing and address
//! derivation, and SHA3-256 as the trie's historical hashing algorithm.

use serde::{Deserialize, Serialize};
use sha3::Digest as _;
use std::collections::HashMap;
use std::fmt;

use crate::error::CoreError;

/// Name under which Keccak-256 is registered.
pub const KECCAK_256: &str = "keccak-256";

/// Name under which SHA3-256 (the legacy trie algorithm) is registered.
pub const SHA3_256: &str = "sha3-256";

/// A 32-byte digest output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero hash (sentinel).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// One-shot Keccak-256.
pub fn keccak256(data: &[u8]) -> Hash256 {
    let mut hasher = sha3::Keccak256::new();
    hasher.update(data);
    Hash256(hasher.finalize().into())
}

/// One-shot SHA3-256.
pub fn sha3_256(data: &[u8]) -> Hash256 {
    let mut hasher = sha3::Sha3_256::new();
    hasher.update(data);
    Hash256(hasher.finalize().into())
}

/// A streaming digest.
pub trait Digest: Send {
    /// Feed bytes into the running digest.
    fn update(&mut self, data: &[u8]);

    /// Finalize and reset, returning the digest output.
    fn finish(&mut self) -> Vec<u8>;

    /// Output length in bytes.
    fn output_len(&self) -> usize;
}

/// Streaming Keccak-256.
#[derive(Default)]
pub struct Keccak256 {
    inner: sha3::Keccak256,
}

impl Keccak256 {
    /// Create a fresh digest state.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Digest for Keccak256 {
    fn update(&mut self, data: &[u8]) {
        sha3::Digest::update(&mut self.inner, data);
    }

    fn finish(&mut self) -> Vec<u8> {
        self.inner.finalize_reset().to_vec()
    }

    fn output_len(&self) -> usize {
        32
    }
}

/// Streaming SHA3-256.
#[derive(Default)]
pub struct Sha3_256 {
    inner: sha3::Sha3_256,
}

impl Sha3_256 {
    /// Create a fresh digest state.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Digest for Sha3_256 {
    fn update(&mut self, data: &[u8]) {
        sha3::Digest::update(&mut self.inner, data);
    }

    fn finish(&mut self) -> Vec<u8> {
        self.inner.finalize_reset().to_vec()
    }

    fn output_len(&self) -> usize {
        32
    }
}

type DigestFactory = fn() -> Box<dyn Digest>;

/// Registry of digest algorithms, keyed by name.
pub struct DigestRegistry {
    factories: HashMap<&'static str, DigestFactory>,
}

impl DigestRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the protocol's required algorithms.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(KECCAK_256, || Box::new(Keccak256::new()));
        registry.register(SHA3_256, || Box::new(Sha3_256::new()));
        registry
    }

    /// Register an algorithm under a name. Replaces any previous entry.
    pub fn register(&mut self, name: &'static str, factory: DigestFactory) {
        self.factories.insert(name, factory);
    }

    /// Create a fresh digest state for the named algorithm.
    pub fn create(&self, name: &str) -> Result<Box<dyn Digest>, CoreError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| CoreError::UnknownAlgorithm(name.to_string()))
    }
}

impl Default for DigestRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
