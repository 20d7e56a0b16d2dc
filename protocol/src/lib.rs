// Copyright (c) 2026 Lovelace Contributors. MIT License.
// See LICENSE for details.

//! # Lovelace Protocol: Core Library
//!
//! Offline construction of Cardano-style payment transactions: everything
//! between "here are my UTxOs and protocol parameters" and "here are the
//! bytes to submit".
//!
//! ## Architecture
//!
//! - **codec**: deterministic CBOR. One byte sequence per value, shortest
//!   integer heads, sorted maps, tag 258 for sets, bounded nesting.
//! - **address**: enterprise payment addresses and the bech32 text form
//!   shared with key material (`addr`, `addr_test`, `addr_sk`, `addr_vk`).
//! - **crypto**: Blake2b at 224 and 256 bits, Ed25519 payment keys.
//! - **transaction**: the data model, the linear fee rule, greedy input
//!   selection, CIP-20 memos and the [`TxBuilder`](transaction::TxBuilder).
//! - **config**: protocol constants.
//!
//! ## Guarantees
//!
//! 1. Encoding is a pure function of the value. Two builders fed the same
//!    inputs produce the same bytes and the same transaction id.
//! 2. A built transaction pays at least the fee its own encoding requires,
//!    and inputs equal outputs plus fee to the lovelace.
//! 3. Nothing here does I/O. Chain access belongs to the caller.

pub mod address;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod transaction;
