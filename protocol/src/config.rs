//! # Protocol Configuration & Constants
//!
//! Every magic number the builder depends on lives here. Most of them are
//! dictated by the ledger's binary format, so changing one is a wire-format
//! change, not a tuning knob.

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// Mainnet network magic, as used in the node handshake.
pub const MAINNET_MAGIC: u32 = 764_824_073;

/// Pre-production testnet magic.
pub const PREPROD_MAGIC: u32 = 1;

/// Preview testnet magic.
pub const PREVIEW_MAGIC: u32 = 2;

/// Magic of a locally spun-up devnet. Matches the default of the common
/// local-cluster tooling.
pub const DEVNET_MAGIC: u32 = 42;

/// Network id carried in the low nibble of a mainnet address header.
pub const MAINNET_NETWORK_ID: u8 = 0b0001;

/// Network id carried in the low nibble of a testnet address header.
pub const TESTNET_NETWORK_ID: u8 = 0b0000;

/// Bech32 human-readable prefixes.
pub const MAINNET_ADDRESS_HRP: &str = "addr";
pub const TESTNET_ADDRESS_HRP: &str = "addr_test";
pub const SIGNING_KEY_HRP: &str = "addr_sk";
pub const VERIFICATION_KEY_HRP: &str = "addr_vk";

// ---------------------------------------------------------------------------
// Address Layout
// ---------------------------------------------------------------------------

/// Address kind (high header nibble) of an enterprise, payment-key-only
/// address: no staking part, payment credential is a key hash.
pub const PAYMENT_KEY_ADDRESS_KIND: u8 = 0b0110;

/// Length of the payment key hash that follows the header byte.
pub const KEY_HASH_LENGTH: usize = 28;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 seed length.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Ed25519 public key length.
pub const VERIFICATION_KEY_LENGTH: usize = 32;

/// Ed25519 signature length.
pub const SIGNATURE_LENGTH: usize = 64;

/// Blake2b-256 output, used for transaction ids and auxiliary data hashes.
pub const HASH_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Canonical Encoding
// ---------------------------------------------------------------------------

/// CBOR tag marking a mathematical set (as opposed to a sequence).
pub const SET_TAG: u64 = 258;

/// Maximum nesting accepted by the decoder. Real-world metadata has been
/// observed beyond 64 levels, so the ceiling sits well above that.
pub const MAX_NESTING_DEPTH: usize = 256;

// ---------------------------------------------------------------------------
// Transaction Metadata
// ---------------------------------------------------------------------------

/// Metadata label reserved for CIP-20 transaction messages.
pub const MEMO_LABEL: u64 = 674;

/// Key inside the CIP-20 envelope that holds the message chunks.
pub const MEMO_KEY: &str = "msg";

/// Maximum byte length of a single metadata string, and therefore of a
/// memo chunk.
pub const MEMO_CHUNK_BYTES: usize = 64;

// ---------------------------------------------------------------------------
// Fees & Validity
// ---------------------------------------------------------------------------

/// Mainnet `min_fee_a` (lovelace per byte).
pub const DEFAULT_MIN_FEE_COEFFICIENT: u64 = 44;

/// Mainnet `min_fee_b` (fixed lovelace per transaction).
pub const DEFAULT_MIN_FEE_CONSTANT: u64 = 155_381;

/// Fee assumed while selecting inputs, before the real fee is known.
/// Roughly a one-input, two-output payment with a memo.
pub const DEFAULT_FEE_ESTIMATE: u64 = 167_217;

/// Default validity window, in slots past the current tip.
pub const DEFAULT_TTL_SLOTS: u64 = 300;

/// Upper bound on fee fixed-point iterations. The loop settles in two or
/// three rounds in practice; hitting the bound is reported as an error.
pub const MAX_FEE_ITERATIONS: usize = 8;
