//! # Hashing Utilities
//!
//! The ledger uses one hash family, Blake2b, at two output sizes:
//!
//! - **Blake2b-224** for key hashes inside addresses (28 bytes).
//! - **Blake2b-256** for transaction ids and auxiliary data hashes (32 bytes).
//!
//! Blake2b takes its output length as a parameter of the compression
//! function, so a 28-byte digest is *not* a truncated 32-byte digest. Both
//! sizes go through [`blake2b`], which validates the requested length
//! before initializing the state.

use blake2b_simd::Params;
use thiserror::Error;

use crate::config::{HASH_LENGTH, KEY_HASH_LENGTH};

/// Largest digest Blake2b can be configured for.
pub const BLAKE2B_MAX_LENGTH: usize = 64;

/// Errors raised while setting up a hash primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    #[error("blake2b cannot be initialized with a {0}-byte output")]
    InvalidLength(usize),
}

/// Blake2b configured for an `out_len`-byte digest.
///
/// Fails instead of panicking when `out_len` is outside `1..=64`.
pub fn blake2b(data: &[u8], out_len: usize) -> Result<Vec<u8>, HashError> {
    if out_len == 0 || out_len > BLAKE2B_MAX_LENGTH {
        return Err(HashError::InvalidLength(out_len));
    }
    Ok(Params::new()
        .hash_length(out_len)
        .hash(data)
        .as_bytes()
        .to_vec())
}

/// Blake2b-224, the address key-hash function.
pub fn blake2b_224(data: &[u8]) -> Result<[u8; KEY_HASH_LENGTH], HashError> {
    let digest = blake2b(data, KEY_HASH_LENGTH)?;
    let mut out = [0u8; KEY_HASH_LENGTH];
    out.copy_from_slice(&digest);
    Ok(out)
}

/// Blake2b-256, the transaction id function.
pub fn blake2b_256(data: &[u8]) -> [u8; HASH_LENGTH] {
    let digest = Params::new().hash_length(HASH_LENGTH).hash(data);
    let mut out = [0u8; HASH_LENGTH];
    out.copy_from_slice(digest.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_empty_vector() {
        assert_eq!(
            hex::encode(blake2b_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn blake2b_224_is_not_truncated_256() {
        let short = blake2b_224(b"abc").unwrap();
        assert_eq!(
            hex::encode(short),
            "9bd237b02a29e43bdd6738afa5b53ff0eee178d6210b618e4511aec8"
        );
        assert_ne!(&short[..], &blake2b_256(b"abc")[..KEY_HASH_LENGTH]);
    }

    #[test]
    fn generic_matches_fixed_size_helpers() {
        assert_eq!(blake2b(b"abc", 32).unwrap(), blake2b_256(b"abc").to_vec());
        assert_eq!(blake2b(b"abc", 28).unwrap(), blake2b_224(b"abc").unwrap().to_vec());
    }

    #[test]
    fn rejects_unsupported_lengths() {
        assert_eq!(blake2b(b"x", 0), Err(HashError::InvalidLength(0)));
        assert_eq!(blake2b(b"x", 65), Err(HashError::InvalidLength(65)));
        assert_eq!(blake2b(b"x", 64).unwrap().len(), 64);
    }
}
