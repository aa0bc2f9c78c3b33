//! Packet and message headers.
//!
//! Packet header wire layout, 16 bytes:
//!
//! ```text
//! 0        4        8        10            16
//! | magic  | CRC32  | reserved | version    |
//! ```
//!
//! The CRC32 (standard reflected polynomial, big-endian on the wire) covers
//! the eight bytes that follow it: reserved ‖ version. The magic is checked
//! first so a CRC error is only ever reported for a frame that is plausibly
//! ours; both failures are fatal for the conversation.

use coolbase_core::{ByteSource, Checksum, Crc32, Version, VERSION_WIRE_LEN};
use serde::{Deserialize, Serialize};

use crate::error::WireError;

/// The packet magic.
pub const PACKET_MAGIC: [u8; 4] = [0xC0, 0x01, 0xBA, 0x5E];

/// Encoded packet header length.
pub const PACKET_HEADER_LEN: usize = 16;

/// Encoded message header length.
pub const MESSAGE_HEADER_LEN: usize = VERSION_WIRE_LEN;

/// The fixed leading header of every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketHeader {
    /// Protocol version of the sender.
    pub version: Version,
}

impl PacketHeader {
    /// Create a header for the given version.
    pub const fn new(version: Version) -> Self {
        Self { version }
    }

    /// Encode to the 16-byte wire form.
    pub fn encode(&self) -> [u8; PACKET_HEADER_LEN] {
        let mut out = [0u8; PACKET_HEADER_LEN];
        out[..4].copy_from_slice(&PACKET_MAGIC);
        // bytes 8..10 stay zero (reserved)
        out[10..16].copy_from_slice(&self.version.to_bytes());

        let mut crc = Crc32::new();
        crc.update(&out[8..16]);
        out[4..8].copy_from_slice(&crc.value().to_be_bytes());
        out
    }

    /// Decode and validate the 16-byte wire form.
    pub fn decode(buf: &[u8; PACKET_HEADER_LEN]) -> Result<Self, WireError> {
        if buf[..4] != PACKET_MAGIC {
            let got = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
            return Err(WireError::BadMagic(got));
        }

        let stored = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let mut crc = Crc32::new();
        crc.update(&buf[8..16]);
        let computed = crc.value();
        if computed != stored {
            return Err(WireError::ChecksumMismatch { computed, stored });
        }

        let mut version_bytes = [0u8; VERSION_WIRE_LEN];
        version_bytes.copy_from_slice(&buf[10..16]);
        Ok(Self {
            version: Version::from_bytes(&version_bytes),
        })
    }

    /// Read and validate a header from a byte source, consuming 16 bytes.
    pub fn read(source: &mut dyn ByteSource) -> Result<Self, WireError> {
        let mut buf = [0u8; PACKET_HEADER_LEN];
        source.read(&mut buf)?;
        Ok(Self::decode(&buf)?)
    }

    /// Read and validate a header under a peek scope, consuming nothing.
    ///
    /// Used by version negotiation to sniff the same leading bytes with
    /// several protocol candidates.
    pub fn peek(source: &mut dyn ByteSource) -> Result<Self, WireError> {
        source.peek_start();
        let mut buf = [0u8; PACKET_HEADER_LEN];
        let read = source.read(&mut buf);
        let rewound = source.peek_rewind();
        read?;
        rewound?;
        Self::decode(&buf)
    }
}

/// The header of a message: the sender's version for this message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub version: Version,
}

impl MessageHeader {
    /// Create a header for the given version.
    pub const fn new(version: Version) -> Self {
        Self { version }
    }

    /// Encode to the 6-byte wire form.
    pub fn encode(&self) -> [u8; MESSAGE_HEADER_LEN] {
        self.version.to_bytes()
    }

    /// Read a message header from a byte source.
    pub fn read(source: &mut dyn ByteSource) -> Result<Self, WireError> {
        let mut buf = [0u8; MESSAGE_HEADER_LEN];
        source.read(&mut buf)?;
        Ok(Self {
            version: Version::from_bytes(&buf),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coolbase_core::BufferSource;

    /// The golden header: Version(65535, 2, 1).
    pub const GOLDEN: [u8; 16] = [
        0xC0, 0x01, 0xBA, 0x5E, 0x3F, 0x01, 0x57, 0xD1, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x02, 0x00,
        0x01,
    ];

    #[test]
    fn test_golden_vector_decodes() {
        let header = PacketHeader::decode(&GOLDEN).unwrap();
        assert_eq!(header.version, Version::new(65535, 2, 1));
    }

    #[test]
    fn test_encode_matches_golden() {
        let header = PacketHeader::new(Version::new(65535, 2, 1));
        assert_eq!(header.encode(), GOLDEN);
    }

    #[test]
    fn test_roundtrip() {
        let header = PacketHeader::new(Version::new(1, 0, 7));
        assert_eq!(PacketHeader::decode(&header.encode()).unwrap(), header);
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = GOLDEN;
        buf[0] = 0xC1;
        assert!(matches!(
            PacketHeader::decode(&buf).unwrap_err(),
            WireError::BadMagic(_)
        ));
    }

    #[test]
    fn test_corrupting_any_covered_byte_is_detected() {
        // One flip per byte position over the whole 16-byte header.
        for pos in 0..PACKET_HEADER_LEN {
            let mut buf = GOLDEN;
            buf[pos] ^= 0x01;
            let err = PacketHeader::decode(&buf).unwrap_err();
            match pos {
                0..=3 => assert!(matches!(err, WireError::BadMagic(_))),
                _ => assert!(matches!(err, WireError::ChecksumMismatch { .. })),
            }
        }
    }

    #[test]
    fn test_peek_consumes_nothing() {
        let mut source = BufferSource::new(GOLDEN.to_vec());
        let peeked = PacketHeader::peek(&mut source).unwrap();
        assert_eq!(peeked.version, Version::new(65535, 2, 1));
        assert_eq!(source.remaining(), 16);
        // A real read still succeeds afterwards.
        assert_eq!(PacketHeader::read(&mut source).unwrap(), peeked);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_peek_rewinds_on_error() {
        let mut buf = GOLDEN;
        buf[6] ^= 0xFF;
        let mut source = BufferSource::new(buf.to_vec());
        assert!(PacketHeader::peek(&mut source).is_err());
        assert_eq!(source.remaining(), 16);
        assert!(!source.is_peeking());
    }

    #[test]
    fn test_message_header_roundtrip() {
        let header = MessageHeader::new(Version::new(3, 1, 4));
        let mut source = BufferSource::new(header.encode().to_vec());
        assert_eq!(MessageHeader::read(&mut source).unwrap(), header);
    }
}
