//! # Transaction Module
//!
//! Construction, fee balancing and signing of payment transactions.
//!
//! ## Architecture
//!
//! ```text
//! types.rs     - Tx, body, inputs/outputs, witnesses, metadata + encoding
//! fee.rs       - ProtocolParams and the linear fee rule
//! selection.rs - greedy smallest-first input selection
//! memo.rs      - CIP-20 message chunking and decoding
//! signing.rs   - witness creation and verification
//! builder.rs   - TxBuilder: draft -> balanced, signed, encoded transaction
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Draft**: add inputs and outputs to a [`TxBuilder`], or let it
//!    [`select_inputs`](TxBuilder::select_inputs) from candidate UTxOs.
//! 2. **Annotate**: optional TTL and memo.
//! 3. **Build**: [`TxBuilder::build`] copies the draft, sizes the fee with
//!    placeholder witnesses, appends change, signs the body hash and
//!    returns the final bytes and id as a [`SignedTx`].
//!
//! Fee and change are only ever computed inside `build`, so a draft can be
//! edited freely without leaving a stale fee behind.

pub mod builder;
pub mod fee;
pub mod memo;
pub mod selection;
pub mod signing;
pub mod types;

use thiserror::Error;

use crate::address::AddressError;
use crate::codec::CodecError;
use crate::crypto::hash::HashError;

pub use builder::{SignedTx, TxBuilder};
pub use fee::{fee_at_size, ProtocolParams};
pub use memo::{chunk_memo, decode_memo};
pub use selection::select_greedy;
pub use signing::{sign_hash, verify_witnesses};
pub use types::{Metadata, Tx, TxBody, TxHash, TxInput, TxOutput, VKeyWitness, WitnessSet};

/// Errors surfaced by transaction construction and inspection.
///
/// None of these are retried internally. A failed [`TxBuilder::build`]
/// leaves the draft untouched.
#[derive(Debug, Error)]
pub enum TxError {
    #[error("insufficient funds: short by {shortfall} lovelace")]
    InsufficientFunds { shortfall: u64 },

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("memo already set")]
    MemoAlreadySet,

    #[error("memo chunk is {length} bytes, the limit is 64")]
    MemoTooLong { length: usize },

    #[error("encoding error: {0}")]
    Encoding(#[from] CodecError),

    #[error("hash initialization failed: {0}")]
    HashInit(#[from] HashError),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("fee did not settle after {iterations} iterations")]
    FeeDidNotConverge { iterations: usize },
}
