//! Strong type definitions shared across the CoolBase wire protocol.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Number of bits in an [`EntryKey`].
pub const ENTRY_KEY_BITS: u8 = 128;

/// A 128-bit record identifier: 16 raw bytes, two big-endian 64-bit halves.
///
/// Entry keys address records and partition ranges. Bit 0 is the most
/// significant bit of the high half.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey(pub [u8; 16]);

impl EntryKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create from two big-endian 64-bit halves.
    pub fn from_halves(hi: u64, lo: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&hi.to_be_bytes());
        bytes[8..].copy_from_slice(&lo.to_be_bytes());
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// The high 64-bit half.
    pub fn hi(&self) -> u64 {
        let mut half = [0u8; 8];
        half.copy_from_slice(&self.0[..8]);
        u64::from_be_bytes(half)
    }

    /// The low 64-bit half.
    pub fn lo(&self) -> u64 {
        let mut half = [0u8; 8];
        half.copy_from_slice(&self.0[8..]);
        u64::from_be_bytes(half)
    }

    /// Read bit `i` (0 = MSB of the high half, 127 = LSB of the low half).
    pub fn bit(&self, i: u8) -> bool {
        debug_assert!(i < ENTRY_KEY_BITS);
        let byte = self.0[(i / 8) as usize];
        (byte >> (7 - (i % 8))) & 1 == 1
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 16 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// The zero key (sentinel).
    pub const ZERO: Self = Self([0u8; 16]);
}

impl fmt::Debug for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryKey({})", self.to_hex())
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for EntryKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 16]> for EntryKey {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

/// Granularity at which two [`Version`]s are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionGranularity {
    /// Compare major only.
    Major,
    /// Compare major and minor.
    Minor,
    /// Compare the full triple.
    Full,
}

/// A protocol version triple. Wire form: 3×u16 big-endian, 6 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub maint: u16,
}

/// Encoded size of a version on the wire.
pub const VERSION_WIRE_LEN: usize = 6;

impl Version {
    /// Create a new version triple.
    pub const fn new(major: u16, minor: u16, maint: u16) -> Self {
        Self { major, minor, maint }
    }

    /// Encode as 6 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; VERSION_WIRE_LEN] {
        let mut out = [0u8; VERSION_WIRE_LEN];
        out[0..2].copy_from_slice(&self.major.to_be_bytes());
        out[2..4].copy_from_slice(&self.minor.to_be_bytes());
        out[4..6].copy_from_slice(&self.maint.to_be_bytes());
        out
    }

    /// Decode from 6 big-endian bytes.
    pub fn from_bytes(bytes: &[u8; VERSION_WIRE_LEN]) -> Self {
        Self {
            major: u16::from_be_bytes([bytes[0], bytes[1]]),
            minor: u16::from_be_bytes([bytes[2], bytes[3]]),
            maint: u16::from_be_bytes([bytes[4], bytes[5]]),
        }
    }

    /// Compare at the requested granularity.
    ///
    /// Coarser granularities are consistent with [`Ord`]: they never invert
    /// the full-triple ordering, only collapse distinctions.
    pub fn cmp_at(&self, other: &Self, granularity: VersionGranularity) -> Ordering {
        match granularity {
            VersionGranularity::Major => self.major.cmp(&other.major),
            VersionGranularity::Minor => self
                .major
                .cmp(&other.major)
                .then(self.minor.cmp(&other.minor)),
            VersionGranularity::Full => self.cmp(other),
        }
    }

    /// True if the versions are equal at the requested granularity.
    pub fn matches(&self, other: &Self, granularity: VersionGranularity) -> bool {
        self.cmp_at(other, granularity) == Ordering::Equal
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.maint.cmp(&other.maint))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.maint)
    }
}

/// Identifier of a storage node, as carried in cheque receipt lists.
///
/// Distinct from [`crate::Address`]: an address identifies a signer, a node
/// address identifies a storage replica.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress(pub [u8; 20]);

impl NodeAddress {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({})", self.to_hex())
    }
}

impl AsRef<[u8]> for NodeAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
