//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the wire layout: any implementation framing the same
//! versions and elements must produce byte-identical output.

use coolbase_codec::{encode_element, encode_unsigned, Tag};
use coolbase_core::Version;
use coolbase_wire::PacketHeader;

/// A golden packet header vector.
#[derive(Debug, Clone, Copy)]
pub struct HeaderVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The version the header carries.
    pub version: Version,
    /// Expected 16-byte encoding, hex.
    pub expected_hex: &'static str,
}

/// All golden packet header vectors.
pub fn header_vectors() -> Vec<HeaderVector> {
    vec![
        HeaderVector {
            name: "reference header",
            version: Version::new(65535, 2, 1),
            expected_hex: "c001ba5e3f0157d10000ffff00020001",
        },
        HeaderVector {
            name: "version 1.0.0",
            version: Version::new(1, 0, 0),
            expected_hex: "c001ba5e5842f6d90000000100000000",
        },
        HeaderVector {
            name: "version 2.1.9",
            version: Version::new(2, 1, 9),
            expected_hex: "c001ba5e67fc5e9a0000000200010009",
        },
        HeaderVector {
            name: "zero version",
            version: Version::new(0, 0, 0),
            expected_hex: "c001ba5e6522df690000000000000000",
        },
    ]
}

/// A golden element-layout vector.
#[derive(Debug, Clone, Copy)]
pub struct ElementVector {
    pub name: &'static str,
    pub tag: Tag,
    pub value: &'static [u8],
    /// Expected full element encoding, hex.
    pub expected_hex: &'static str,
}

/// All golden element vectors.
pub fn element_vectors() -> Vec<ElementVector> {
    vec![
        ElementVector {
            name: "empty value",
            tag: Tag(0x22),
            value: b"",
            expected_hex: "2200",
        },
        ElementVector {
            name: "short string",
            tag: Tag(0x23),
            value: b"orders",
            expected_hex: "2301066f7264657273",
        },
        ElementVector {
            name: "two-byte integer",
            tag: Tag(0x24),
            value: &[0x12, 0x34],
            expected_hex: "2401021234",
        },
    ]
}

/// Check every golden vector against the current encoders.
///
/// Returns the names of failing vectors; empty means all pass.
pub fn verify_all_vectors() -> Vec<&'static str> {
    let mut failures = Vec::new();
    for vector in header_vectors() {
        let encoded = PacketHeader::new(vector.version).encode();
        if hex::encode(encoded) != vector.expected_hex {
            failures.push(vector.name);
        }
    }
    for vector in element_vectors() {
        let mut out = Vec::new();
        encode_element(vector.tag, vector.value, &mut out);
        if hex::encode(&out) != vector.expected_hex {
            failures.push(vector.name);
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_pass() {
        assert_eq!(verify_all_vectors(), Vec::<&str>::new());
    }

    #[test]
    fn test_header_vectors_decode_back() {
        for vector in header_vectors() {
            let bytes: [u8; 16] = hex::decode(vector.expected_hex)
                .unwrap()
                .try_into()
                .unwrap();
            let header = PacketHeader::decode(&bytes).unwrap();
            assert_eq!(header.version, vector.version, "{}", vector.name);
        }
    }

    #[test]
    fn test_minimal_integer_layout() {
        // The two-byte vector is what ENTRY_VERSION 0x1234 encodes to.
        assert_eq!(encode_unsigned(0x1234), [0x12, 0x34]);
    }
}
