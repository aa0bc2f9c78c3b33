//! secp256k1 ECDSA over pre-hashed payloads.
//!
//! Signing never hashes: callers digest the entry/cheque bytes first and the
//! exact byte layout fed into that digest must be identical between signer
//! and verifier. Signatures carry a recovery id so verification recovers the
//! signer's public key instead of requiring it on the wire.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::digest::{keccak256, Hash256};
use crate::error::CoreError;

/// Wire length of a recoverable signature: r (32) + s (32) + recovery id (1).
pub const SIGNATURE_WIRE_LEN: usize = 65;

/// A 20-byte signer address: the low-order 20 bytes of
/// `Keccak256(uncompressed public key without the 0x04 prefix)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
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

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 20 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An uncompressed secp256k1 public key (65 bytes, leading 0x04).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub [u8; 65]);

impl PublicKey {
    fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let mut bytes = [0u8; 65];
        bytes.copy_from_slice(point.as_bytes());
        Self(bytes)
    }

    /// Get the raw uncompressed bytes.
    pub const fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    /// Derive the 20-byte address.
    pub fn address(&self) -> Address {
        let hash = keccak256(&self.0[1..]);
        let mut addr = [0u8; 20];
        addr.copy_from_slice(&hash.as_bytes()[12..]);
        Address(addr)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.address())
    }
}

/// A recoverable ECDSA signature. Wire form: `r ‖ s ‖ v`, 65 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl RecoverableSignature {
    /// Encode as 65 wire bytes.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_WIRE_LEN] {
        let mut out = [0u8; SIGNATURE_WIRE_LEN];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.recovery_id;
        out
    }

    /// Decode from 65 wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() != SIGNATURE_WIRE_LEN {
            return Err(CoreError::InvalidSignature);
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self {
            r,
            s,
            recovery_id: bytes[64],
        })
    }

    /// Recover the public key that produced this signature over `hash`.
    pub fn recover(&self, hash: &Hash256) -> Result<PublicKey, CoreError> {
        let mut sig_bytes = [0u8; 64];
        sig_bytes[..32].copy_from_slice(&self.r);
        sig_bytes[32..].copy_from_slice(&self.s);
        let signature = EcdsaSignature::from_slice(&sig_bytes)
            .map_err(|_| CoreError::InvalidSignature)?;
        let recovery_id =
            RecoveryId::from_byte(self.recovery_id).ok_or(CoreError::InvalidSignature)?;
        let key = VerifyingKey::recover_from_prehash(hash.as_bytes(), &signature, recovery_id)
            .map_err(|_| CoreError::RecoveryFailed)?;
        Ok(PublicKey::from_verifying_key(&key))
    }

    /// Recover the signer's address directly.
    pub fn recover_address(&self, hash: &Hash256) -> Result<Address, CoreError> {
        Ok(self.recover(hash)?.address())
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RecoverableSignature(r={}, s={}, v={})",
            &hex::encode(self.r)[..8],
            &hex::encode(self.s)[..8],
            self.recovery_id
        )
    }
}

/// A secp256k1 signing keypair.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a random keypair.
    pub fn generate() -> Self {
        loop {
            let seed: [u8; 32] = rand::random();
            if let Ok(keypair) = Self::from_seed(&seed) {
                return keypair;
            }
        }
    }

    /// Create a deterministic keypair from a 32-byte seed.
    ///
    /// Fails for the zero seed and seeds at or above the curve order.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, CoreError> {
        let signing_key =
            SigningKey::from_bytes(seed.into()).map_err(|_| CoreError::InvalidSecretKey)?;
        Ok(Self { signing_key })
    }

    /// The uncompressed public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// The signer address.
    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    /// Sign an already-hashed payload.
    pub fn sign_hash(&self, hash: &Hash256) -> Result<RecoverableSignature, CoreError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash.as_bytes())
            .map_err(|_| CoreError::InvalidSecretKey)?;
        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(RecoverableSignature {
            r,
            s,
            recovery_id: recovery_id.to_byte(),
        })
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({})", self.address())
    }
}
