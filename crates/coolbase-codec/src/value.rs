//! Canonical leaf-value formats.
//!
//! Every leaf format is canonical: a value has exactly one encoding, so
//! digests over encoded values are stable across implementations.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Seconds between the Unix epoch and the date epoch (2001-01-01T00:00:00Z).
pub const DATE_EPOCH_OFFSET_SECS: i64 = 978_307_200;

/// Encode an unsigned integer as minimal-length big-endian bytes.
///
/// Zero encodes as the empty slice.
pub fn encode_unsigned(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[skip..].to_vec()
}

/// Decode a minimal big-endian unsigned integer.
///
/// The empty slice decodes to zero. Redundant leading zero bytes are
/// tolerated on decode but never produced on encode.
pub fn decode_unsigned(bytes: &[u8]) -> Result<u64, CodecError> {
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let rest = &bytes[skip..];
    if rest.len() > 8 {
        return Err(CodecError::IntegerOverflow);
    }
    let mut value = 0u64;
    for &byte in rest {
        value = (value << 8) | u64::from(byte);
    }
    Ok(value)
}

/// Encode a signed integer as minimal-length big-endian two's complement.
///
/// Zero encodes as the empty slice. A leading byte is redundant when it is
/// `0x00` before a clear sign bit or `0xFF` before a set one.
pub fn encode_signed(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start + 1 < bytes.len() {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Decode a big-endian two's-complement signed integer, sign-extending from
/// the shortest supplied byte count. The empty slice decodes to zero.
pub fn decode_signed(bytes: &[u8]) -> Result<i64, CodecError> {
    if bytes.len() > 8 {
        return Err(CodecError::IntegerOverflow);
    }
    let Some(&first) = bytes.first() else {
        return Ok(0);
    };
    let mut value: i64 = if first & 0x80 != 0 { -1 } else { 0 };
    for &byte in bytes {
        value = (value << 8) | i64::from(byte);
    }
    Ok(value)
}

/// Encode a string as raw UTF-8 bytes, no terminator.
pub fn encode_string(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

/// Decode a string from raw UTF-8 bytes.
pub fn decode_string(bytes: &[u8]) -> Result<String, CodecError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidString)
}

/// Encode a date: i64 nanoseconds relative to the 2001 epoch offset, encoded
/// exactly like a signed integer.
pub fn encode_date(nanos: i64) -> Vec<u8> {
    encode_signed(nanos)
}

/// Decode a date via the signed-integer parse.
pub fn decode_date(bytes: &[u8]) -> Result<i64, CodecError> {
    decode_signed(bytes)
}

/// Convert Unix nanoseconds to date nanoseconds.
pub fn date_from_unix_nanos(unix_nanos: i64) -> i64 {
    unix_nanos - DATE_EPOCH_OFFSET_SECS * 1_000_000_000
}

/// Convert date nanoseconds to Unix nanoseconds.
pub fn date_to_unix_nanos(date_nanos: i64) -> i64 {
    date_nanos + DATE_EPOCH_OFFSET_SECS * 1_000_000_000
}

/// The consistency requirement attached to a request.
///
/// Wire form is one two's-complement byte: `0` is quorum, `1..=100` is a
/// replica percentage (100 being the ALL sentinel), `-1..=-100` is an
/// absolute replica count (`-1` being ONE). Every other byte value is
/// invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    /// A majority of replicas must acknowledge.
    Quorum,
    /// A percentage (1..=100) of replicas must acknowledge.
    Percent(u8),
    /// An absolute number (1..=100) of replicas must acknowledge.
    Count(u8),
}

impl ConsistencyLevel {
    /// Exactly one replica.
    pub const ONE: Self = Self::Count(1);

    /// Every replica.
    pub const ALL: Self = Self::Percent(100);

    /// Decode from the wire byte.
    pub fn from_byte(byte: i8) -> Result<Self, CodecError> {
        match byte {
            0 => Ok(Self::Quorum),
            1..=100 => Ok(Self::Percent(byte as u8)),
            -100..=-1 => Ok(Self::Count(byte.unsigned_abs())),
            _ => Err(CodecError::InvalidConsistencyByte(byte)),
        }
    }

    /// Encode to the wire byte.
    pub fn to_byte(&self) -> i8 {
        match *self {
            Self::Quorum => 0,
            Self::Percent(p) => p as i8,
            Self::Count(c) => -(c as i8),
        }
    }

    /// Resolve to a required acknowledgement count for `replicas` replicas.
    ///
    /// ONE resolves to 1, quorum to `replicas/2 + 1`, ALL to `replicas`.
    /// Percentages round up and never drop below one acknowledgement;
    /// absolute counts are capped at the replica count.
    pub fn required_acks(&self, replicas: usize) -> usize {
        if replicas == 0 {
            return 0;
        }
        match *self {
            Self::Quorum => replicas / 2 + 1,
            Self::Percent(p) => {
                let acks = (replicas * usize::from(p)).div_ceil(100);
                acks.max(1)
            }
            Self::Count(c) => usize::from(c).min(replicas),
        }
    }
}
