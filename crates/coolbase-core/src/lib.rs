//! # CoolBase Core
//!
//! Leaf primitives for the CoolBase wire protocol.
//!
//! This crate contains no framing and no element encoding. It provides the
//! pieces everything else is built from:
//!
//! - [`EntryKey`] - 128-bit record identifier (two big-endian 64-bit halves)
//! - [`Version`] - protocol version triple with granular comparison
//! - [`Checksum`] / [`Digest`] - streaming integrity and hashing primitives
//!   behind name-keyed registries
//! - [`Keypair`] / [`RecoverableSignature`] - secp256k1 ECDSA over pre-hashed
//!   payloads, with Keccak-derived [`Address`]es
//! - [`ByteSource`] / [`ByteSink`] - the byte-channel collaborator interfaces,
//!   with peek/cache marks for speculative reads and deferred writes

pub mod checksum;
pub mod digest;
pub mod error;
pub mod io;
pub mod signature;
pub mod types;

pub use checksum::{Checksum, ChecksumRegistry, Crc32};
pub use digest::{keccak256, sha3_256, Digest, DigestRegistry, Hash256};
pub use error::CoreError;
pub use io::{BufferSink, BufferSource, ByteSink, ByteSource, SharedSource};
pub use signature::{Address, Keypair, PublicKey, RecoverableSignature, SIGNATURE_WIRE_LEN};
pub use types::{EntryKey, NodeAddress, Version, VersionGranularity, VERSION_WIRE_LEN};
