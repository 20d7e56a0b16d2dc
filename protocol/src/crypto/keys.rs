//! # Key Management
//!
//! Ed25519 payment keys: generation, the text and CBOR forms wallets use to
//! hand them around, and raw signing.
//!
//! Two external formats are supported for secret keys, matching what node
//! tooling emits:
//!
//! - bech32 with the `addr_sk` prefix over the 32-byte seed;
//! - a CBOR byte string holding the seed (`5820…`), the payload of a
//!   text-envelope `.skey` file.
//!
//! Key bytes are never logged.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

use crate::address::text::{decode_text, encode_text};
use crate::address::AddressError;
use crate::codec::{self, CodecError};
use crate::config::{
    SIGNATURE_LENGTH, SIGNING_KEY_HRP, SIGNING_KEY_LENGTH, VERIFICATION_KEY_HRP,
    VERIFICATION_KEY_LENGTH,
};

/// Errors that can occur while loading key material.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key: expected 32 bytes, got {0}")]
    InvalidSecretKey(usize),

    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid key text: {0}")]
    Text(#[from] AddressError),

    #[error("invalid key cbor: {0}")]
    Cbor(#[from] CodecError),

    #[error("invalid key hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

/// An Ed25519 payment keypair.
///
/// Deliberately not `Serialize`: exporting a secret goes through
/// [`to_bech32`](Self::to_bech32) or [`to_cbor`](Self::to_cbor).
pub struct PaymentKeypair {
    signing_key: SigningKey,
}

/// The 32-byte public half of a payment key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerificationKey([u8; VERIFICATION_KEY_LENGTH]);

/// A raw 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

impl PaymentKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Keypair from a 32-byte seed. The seed *is* the Ed25519 secret key.
    pub fn from_seed(seed: &[u8; SIGNING_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Keypair from a seed slice of unchecked length.
    pub fn from_seed_slice(seed: &[u8]) -> Result<Self, KeyError> {
        let seed: [u8; SIGNING_KEY_LENGTH] = seed
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey(seed.len()))?;
        Ok(Self::from_seed(&seed))
    }

    /// Keypair from a hex-encoded seed.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        Self::from_seed_slice(&hex::decode(hex_str)?)
    }

    /// Parse an `addr_sk1…` string.
    pub fn from_bech32(text: &str) -> Result<Self, KeyError> {
        let seed = decode_text(text, SIGNING_KEY_HRP)?;
        Self::from_seed_slice(&seed)
    }

    /// Parse the CBOR byte string wrapping a seed.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, KeyError> {
        let seed: Vec<u8> = codec::decode(bytes)?;
        Self::from_seed_slice(&seed)
    }

    /// Export the seed as `addr_sk1…`.
    pub fn to_bech32(&self) -> Result<String, KeyError> {
        Ok(encode_text(SIGNING_KEY_HRP, &self.seed())?)
    }

    /// Export the seed as a CBOR byte string.
    pub fn to_cbor(&self) -> Result<Vec<u8>, KeyError> {
        Ok(codec::encode(&self.seed().to_vec())?)
    }

    /// Raw seed bytes. Handle with care.
    pub fn seed(&self) -> [u8; SIGNING_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign `message` as-is. Ed25519 hashes internally; callers pass the
    /// exact payload the ledger expects (for transactions: the 32-byte
    /// body hash) with no extra pre-hashing.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl Clone for PaymentKeypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for PaymentKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PaymentKeypair(vk={})", self.verification_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// VerificationKey
// ---------------------------------------------------------------------------

impl VerificationKey {
    pub fn from_bytes(bytes: [u8; VERIFICATION_KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Length-checked and curve-checked construction.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; VERIFICATION_KEY_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Parse an `addr_vk1…` string.
    pub fn from_bech32(text: &str) -> Result<Self, KeyError> {
        Self::try_from_slice(&decode_text(text, VERIFICATION_KEY_HRP)?)
    }

    pub fn to_bech32(&self) -> Result<String, KeyError> {
        Ok(encode_text(VERIFICATION_KEY_HRP, &self.0)?)
    }

    pub fn as_bytes(&self) -> &[u8; VERIFICATION_KEY_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Strict Ed25519 verification of `signature` over `message`. Small-order
    /// keys and nonces are rejected, so zero-filled placeholders never pass.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.0) else {
            return false;
        };
        key.verify_strict(message, &DalekSignature::from_bytes(&signature.0))
            .is_ok()
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerificationKey({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let kp = PaymentKeypair::generate();
        let sig = kp.sign(b"body hash");
        assert!(kp.verification_key().verify(b"body hash", &sig));
        assert!(!kp.verification_key().verify(b"other hash", &sig));
    }

    #[test]
    fn signatures_are_deterministic() {
        let kp = PaymentKeypair::from_seed(&[7u8; 32]);
        assert_eq!(kp.sign(b"m"), kp.sign(b"m"));
    }

    #[test]
    fn bech32_secret_roundtrip() {
        let kp = PaymentKeypair::generate();
        let text = kp.to_bech32().unwrap();
        assert!(text.starts_with("addr_sk1"));
        let restored = PaymentKeypair::from_bech32(&text).unwrap();
        assert_eq!(kp.verification_key(), restored.verification_key());
    }

    #[test]
    fn secret_key_rejects_verification_prefix() {
        let kp = PaymentKeypair::generate();
        let vk_text = kp.verification_key().to_bech32().unwrap();
        assert!(matches!(
            PaymentKeypair::from_bech32(&vk_text),
            Err(KeyError::Text(AddressError::InvalidPrefix { .. }))
        ));
    }

    #[test]
    fn cbor_seed_roundtrip() {
        let kp = PaymentKeypair::from_seed(&[3u8; 32]);
        let cbor = kp.to_cbor().unwrap();
        assert_eq!(&cbor[..2], &[0x58, 0x20]);
        let restored = PaymentKeypair::from_cbor(&cbor).unwrap();
        assert_eq!(kp.seed(), restored.seed());
    }

    #[test]
    fn short_seed_is_rejected() {
        assert!(matches!(
            PaymentKeypair::from_hex("deadbeef"),
            Err(KeyError::InvalidSecretKey(4))
        ));
        assert!(PaymentKeypair::from_hex("not-hex").is_err());
    }

    #[test]
    fn verification_key_rejects_wrong_length() {
        assert!(VerificationKey::try_from_slice(&[0u8; 16]).is_err());
    }

    #[test]
    fn debug_does_not_leak_seed() {
        let kp = PaymentKeypair::from_seed(&[9u8; 32]);
        let debug = format!("{:?}", kp);
        assert!(debug.starts_with("PaymentKeypair(vk="));
        assert!(!debug.contains(&hex::encode([9u8; 32])));
    }
}
