//! Streaming checksum primitives behind a name-keyed registry.
//!
//! CRC32 is the only algorithm the protocol requires; the registry exists so
//! a composition root can add others without touching this crate.

use std::collections::HashMap;

use crate::error::CoreError;

/// Name under which the CRC32 implementation is registered.
pub const CRC32: &str = "crc32";

/// A streaming 32-bit checksum.
pub trait Checksum: Send {
    /// Feed bytes into the running checksum.
    fn update(&mut self, data: &[u8]);

    /// The checksum over everything fed so far. Does not reset.
    fn value(&self) -> u32;

    /// Reset to the initial state.
    fn reset(&mut self);

    /// Snapshot the running state.
    fn snapshot(&self) -> Box<dyn Checksum>;
}

impl std::fmt::Debug for dyn Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Checksum")
    }
}

/// Standard (reflected) CRC32, as used by the packet header.
#[derive(Default, Clone)]
pub struct Crc32 {
    inner: crc32fast::Hasher,
}

impl Crc32 {
    /// Create a fresh CRC32 state.
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot CRC32 of a byte slice.
    pub fn checksum(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

impl Checksum for Crc32 {
    fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    fn value(&self) -> u32 {
        self.inner.clone().finalize()
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn snapshot(&self) -> Box<dyn Checksum> {
        Box::new(self.clone())
    }
}

type ChecksumFactory = fn() -> Box<dyn Checksum>;

/// Registry of checksum algorithms, keyed by name.
///
/// Constructed explicitly by the composition root; there is no ambient
/// discovery.
pub struct ChecksumRegistry {
    factories: HashMap<&'static str, ChecksumFactory>,
}

impl ChecksumRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the protocol's required algorithms (CRC32).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CRC32, || Box::new(Crc32::new()));
        registry
    }

    /// Register an algorithm under a name. Replaces any previous entry.
    pub fn register(&mut self, name: &'static str, factory: ChecksumFactory) {
        self.factories.insert(name, factory);
    }

    /// Create a fresh checksum state for the named algorithm.
    pub fn create(&self, name: &str) -> Result<Box<dyn Checksum>, CoreError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| CoreError::UnknownAlgorithm(name.to_string()))
    }

    /// Names of all registered algorithms.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}

impl Default for ChecksumRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_known_value() {
        // CRC32 of the packet-header golden vector's covered span.
        let covered = [0x00, 0x00, 0xFF, 0xFF, 0x00, 0x02, 0x00, 0x01];
        assert_eq!(Crc32::checksum(&covered), 0x3F01_57D1);
    }

    #[test]
    fn test_crc32_streaming_matches_oneshot() {
        let data = b"the quick brown fox";
        let mut streaming = Crc32::new();
        streaming.update(&data[..7]);
        streaming.update(&data[7..]);
        assert_eq!(streaming.value(), Crc32::checksum(data));
    }

    #[test]
    fn test_crc32_value_does_not_reset() {
        let mut c = Crc32::new();
        c.update(b"abc");
        let first = c.value();
        assert_eq!(c.value(), first);
        c.update(b"def");
        assert_eq!(c.value(), Crc32::checksum(b"abcdef"));
    }

    #[test]
    fn test_crc32_snapshot_is_independent() {
        let mut c = Crc32::new();
        c.update(b"abc");
        let snap = c.snapshot();
        c.update(b"def");
        assert_eq!(snap.value(), Crc32::checksum(b"abc"));
        assert_eq!(c.value(), Crc32::checksum(b"abcdef"));
    }

    #[test]
    fn test_crc32_reset() {
        let mut c = Crc32::new();
        c.update(b"garbage");
        c.reset();
        c.update(b"abc");
        assert_eq!(c.value(), Crc32::checksum(b"abc"));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = ChecksumRegistry::with_defaults();
        let mut c = registry.create(CRC32).unwrap();
        c.update(b"abc");
        assert_eq!(c.value(), Crc32::checksum(b"abc"));
    }

    #[test]
    fn test_registry_unknown_algorithm() {
        let registry = ChecksumRegistry::with_defaults();
        let err = registry.create("adler32").unwrap_err();
        assert_eq!(err, CoreError::UnknownAlgorithm("adler32".to_string()));
    }
}
