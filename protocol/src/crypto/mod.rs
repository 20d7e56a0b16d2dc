//! # Cryptographic Primitives
//!
//! Thin, typed wrappers around audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for payment keys and witnesses.
//! - **Blake2b** (`blake2b_simd`) at 224 bits for address key hashes and at
//!   256 bits for transaction ids and auxiliary data hashes.

pub mod hash;
pub mod keys;

pub use hash::{blake2b, blake2b_224, blake2b_256, HashError};
pub use keys::{KeyError, PaymentKeypair, Signature, VerificationKey};
