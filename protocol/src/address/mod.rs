//! # Addresses
//!
//! Enterprise payment addresses: a one-byte header followed by the
//! Blake2b-224 hash of the payment verification key.
//!
//! ```text
//! header = (kind << 4) | network_id      kind = 0b0110 (key hash, no stake)
//! bytes  = header || blake2b_224(vk)     29 bytes total
//! text   = bech32("addr" | "addr_test", bytes)
//! ```
//!
//! Addresses of other kinds are accepted as opaque bytes when parsed from
//! text, so outputs can pay to script or base addresses even though this
//! crate only derives the payment-key kind.

pub mod text;

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::codec::{CodecConfig, CodecError, FromCbor, ToCbor, Value};
use crate::config::{
    DEVNET_MAGIC, KEY_HASH_LENGTH, MAINNET_ADDRESS_HRP, MAINNET_MAGIC, MAINNET_NETWORK_ID,
    PAYMENT_KEY_ADDRESS_KIND, PREPROD_MAGIC, PREVIEW_MAGIC, TESTNET_ADDRESS_HRP,
    TESTNET_NETWORK_ID,
};
use crate::crypto::hash::{blake2b_224, HashError};
use crate::crypto::keys::VerificationKey;

/// Errors produced while deriving, parsing or validating an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("unexpected prefix: expected {expected}, got {got}")]
    InvalidPrefix { expected: String, got: String },

    #[error("checksum mismatch: {0}")]
    InvalidChecksum(String),

    #[error("malformed bech32: {0}")]
    InvalidEncoding(String),

    #[error("non-zero or excess padding bits")]
    InvalidPadding,

    #[error("address is for {got} but {expected} was expected")]
    NetworkMismatch { expected: Network, got: Network },

    #[error("key hash unavailable: {0}")]
    HashInit(#[from] HashError),

    #[error("address has no bytes")]
    Empty,

    #[error("unknown network magic {0}")]
    UnknownNetworkMagic(u32),
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Which ledger an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Map a node network magic to a network. Public testnets and the
    /// local devnet all share the testnet address format.
    pub fn from_magic(magic: u32) -> Result<Self, AddressError> {
        match magic {
            MAINNET_MAGIC => Ok(Self::Mainnet),
            PREPROD_MAGIC | PREVIEW_MAGIC | DEVNET_MAGIC => Ok(Self::Testnet),
            other => Err(AddressError::UnknownNetworkMagic(other)),
        }
    }

    /// Low nibble of the address header.
    pub fn network_id(self) -> u8 {
        match self {
            Self::Mainnet => MAINNET_NETWORK_ID,
            Self::Testnet => TESTNET_NETWORK_ID,
        }
    }

    pub fn hrp(self) -> &'static str {
        match self {
            Self::Mainnet => MAINNET_ADDRESS_HRP,
            Self::Testnet => TESTNET_ADDRESS_HRP,
        }
    }

    /// Header byte of a payment-key address on this network.
    pub fn payment_header(self) -> u8 {
        (PAYMENT_KEY_ADDRESS_KIND << 4) | self.network_id()
    }

    fn from_hrp(hrp: &str) -> Option<Self> {
        match hrp {
            MAINNET_ADDRESS_HRP => Some(Self::Mainnet),
            TESTNET_ADDRESS_HRP => Some(Self::Testnet),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => f.write_str("mainnet"),
            Self::Testnet => f.write_str("testnet"),
        }
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A ledger address in its binary form. Never empty: every constructor,
/// including deserialization, goes through the emptiness check.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Address(#[serde(with = "hex")] Vec<u8>);

impl Address {
    /// `header || blake2b_224(vk)`.
    pub fn derive(vk: &VerificationKey, header: u8) -> Result<Self, AddressError> {
        let key_hash = blake2b_224(vk.as_bytes())?;
        let mut bytes = Vec::with_capacity(1 + KEY_HASH_LENGTH);
        bytes.push(header);
        bytes.extend_from_slice(&key_hash);
        Ok(Self(bytes))
    }

    /// Enterprise payment address for `vk` on `network`.
    pub fn payment(network: Network, vk: &VerificationKey) -> Result<Self, AddressError> {
        Self::derive(vk, network.payment_header())
    }

    /// Wrap raw address bytes. Only emptiness is checked.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, AddressError> {
        if bytes.is_empty() {
            return Err(AddressError::Empty);
        }
        Ok(Self(bytes))
    }

    /// Parse `addr1…` or `addr_test1…`, cross-checking the header's network
    /// nibble against the prefix.
    pub fn from_bech32(s: &str) -> Result<Self, AddressError> {
        let (hrp, bytes) = text::decode_any(s)?;
        let Some(network) = Network::from_hrp(&hrp) else {
            return Err(AddressError::InvalidPrefix {
                expected: format!("{MAINNET_ADDRESS_HRP} or {TESTNET_ADDRESS_HRP}"),
                got: hrp,
            });
        };
        let address = Self::from_bytes(bytes)?;
        let got = address.network();
        if got != network {
            return Err(AddressError::NetworkMismatch {
                expected: network,
                got,
            });
        }
        Ok(address)
    }

    pub fn to_bech32(&self) -> Result<String, AddressError> {
        text::encode_text(self.network().hrp(), &self.0)
    }

    pub fn header(&self) -> u8 {
        self.0.first().copied().unwrap_or_default()
    }

    /// Network encoded in the header's low nibble. Any non-zero id counts
    /// as mainnet.
    pub fn network(&self) -> Network {
        if self.header() & 0x0f == TESTNET_NETWORK_ID {
            Network::Testnet
        } else {
            Network::Mainnet
        }
    }

    /// Fails with [`AddressError::NetworkMismatch`] unless the address
    /// belongs to `expected`.
    pub fn ensure_network(&self, expected: Network) -> Result<(), AddressError> {
        let got = self.network();
        if got != expected {
            return Err(AddressError::NetworkMismatch { expected, got });
        }
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_bech32() {
            Ok(text) => f.write_str(&text),
            Err(_) => f.write_str(&self.to_hex()),
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = hex::serde::deserialize(deserializer)?;
        Self::from_bytes(bytes).map_err(de::Error::custom)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bech32(s)
    }
}

impl ToCbor for Address {
    fn to_cbor(&self, _cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(Value::Bytes(self.0.clone()))
    }
}

impl FromCbor for Address {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let bytes = Vec::<u8>::from_cbor(value, cfg)?;
        Self::from_bytes(bytes).map_err(|e| CodecError::Semantic(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::PaymentKeypair;

    const SEED: &str = "0fb7a1cda69be0f2f853aa3ba51dabde85db64273694c4cff3d865161539c92b";

    fn fixture_key() -> VerificationKey {
        PaymentKeypair::from_hex(SEED).unwrap().verification_key()
    }

    #[test]
    fn derives_known_mainnet_address() {
        let addr = Address::payment(Network::Mainnet, &fixture_key()).unwrap();
        assert_eq!(addr.header(), 0x61);
        assert_eq!(addr.as_bytes().len(), 29);
        assert_eq!(
            addr.to_bech32().unwrap(),
            "addr1vx64czye08j6pkysk3fyfm90jz2tyft5tzjktz5h22wkn2gqhw2sa"
        );
    }

    #[test]
    fn derives_known_testnet_address() {
        let addr = Address::payment(Network::Testnet, &fixture_key()).unwrap();
        assert_eq!(addr.header(), 0x60);
        assert_eq!(
            addr.to_string(),
            "addr_test1vz64czye08j6pkysk3fyfm90jz2tyft5tzjktz5h22wkn2gml6klc"
        );
    }

    #[test]
    fn parses_external_address() {
        let addr: Address = "addr1v9f785wjgm4w0ky6lrjp4ecfj7dunzhql83ratqlpenqn2ssnlkjz"
            .parse()
            .unwrap();
        assert_eq!(
            addr.to_hex(),
            "6153e3d1d246eae7d89af8e41ae709979bc98ae0f9e23eac1f0e6609aa"
        );
        assert_eq!(addr.network(), Network::Mainnet);
    }

    #[test]
    fn network_from_magic() {
        assert_eq!(Network::from_magic(764_824_073).unwrap(), Network::Mainnet);
        for magic in [1, 2, 42] {
            assert_eq!(Network::from_magic(magic).unwrap(), Network::Testnet);
        }
        assert_eq!(
            Network::from_magic(7),
            Err(AddressError::UnknownNetworkMagic(7))
        );
    }

    #[test]
    fn prefix_must_agree_with_header() {
        let mut bytes = Address::payment(Network::Mainnet, &fixture_key())
            .unwrap()
            .as_bytes()
            .to_vec();
        bytes[0] = Network::Testnet.payment_header();
        // Testnet header under the mainnet prefix.
        let text = text::encode_text("addr", &bytes).unwrap();
        assert!(matches!(
            Address::from_bech32(&text),
            Err(AddressError::NetworkMismatch { .. })
        ));
    }

    #[test]
    fn key_prefixes_are_not_addresses() {
        let vk_text = fixture_key().to_bech32().unwrap();
        assert!(matches!(
            Address::from_bech32(&vk_text),
            Err(AddressError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn empty_address_is_rejected() {
        assert_eq!(Address::from_bytes(Vec::new()), Err(AddressError::Empty));
    }

    #[test]
    fn serde_uses_hex() {
        let addr = Address::payment(Network::Testnet, &fixture_key()).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn serde_rejects_empty_address() {
        let err = serde_json::from_str::<Address>("\"\"").unwrap_err();
        assert!(err.to_string().contains("no bytes"), "{err}");
    }
}
