//! # CLI Interface
//!
//! Argument structure for the `lovelace` binary, using `clap` derive.
//! Every command is offline: chain state (UTxOs, tip slot, protocol
//! parameters) is passed in by the caller.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use lovelace_protocol::config::{
    DEFAULT_FEE_ESTIMATE, DEFAULT_MIN_FEE_COEFFICIENT, DEFAULT_MIN_FEE_CONSTANT, DEFAULT_TTL_SLOTS,
    DEVNET_MAGIC,
};

/// Offline Cardano payment tooling.
///
/// Derives keys and addresses, builds and signs payment transactions from a
/// list of UTxOs, and decodes transactions for inspection.
#[derive(Parser, Debug)]
#[command(
    name = "lovelace",
    about = "Offline Cardano key, build and inspect commands",
    version,
    propagate_version = true
)]
pub struct LovelaceCli {
    /// Log output format. Logs go to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormatArg::Pretty, env = "LOVELACE_LOG_FORMAT")]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive a payment key pair and its address from a 32-byte seed.
    KeyPair(KeyPairArgs),
    /// Select inputs, balance, sign and encode a payment.
    BuildTx(BuildTxArgs),
    /// Decode a transaction and print its contents, id and memo.
    InspectTx(InspectTxArgs),
}

/// Arguments for `key-pair`.
#[derive(Args, Debug)]
pub struct KeyPairArgs {
    /// Hex-encoded 32-byte Ed25519 seed.
    #[arg(long)]
    pub seed: String,

    /// Network magic: 764824073 (mainnet), 1, 2 or 42 (testnets).
    #[arg(long, default_value_t = DEVNET_MAGIC)]
    pub magic: u32,
}

/// Arguments for `build-tx`.
///
/// The signing key is read from `CARDANO_SIGNING_KEY_BECH32` (`addr_sk1…`)
/// or, failing that, `CARDANO_SIGNING_KEY_CBOR` (hex CBOR byte string).
#[derive(Args, Debug)]
pub struct BuildTxArgs {
    /// JSON file holding an array of `{"tx_hash", "index", "amount"}` UTxOs
    /// owned by the signing key.
    #[arg(long)]
    pub utxos: PathBuf,

    /// Bech32 address to pay.
    #[arg(long)]
    pub receiver: String,

    /// Amount to send, in lovelace.
    #[arg(long)]
    pub amount: u64,

    /// Optional CIP-20 message.
    #[arg(long)]
    pub memo: Option<String>,

    /// Last valid slot. Omitted (with no `--tip`) means no TTL.
    #[arg(long, conflicts_with = "tip")]
    pub ttl: Option<u64>,

    /// Current tip slot; the TTL becomes tip + 300.
    #[arg(long)]
    pub tip: Option<u64>,

    /// Fee assumed while selecting inputs.
    #[arg(long, default_value_t = DEFAULT_FEE_ESTIMATE)]
    pub fee_estimate: u64,

    /// Protocol parameter `min_fee_a`.
    #[arg(long, default_value_t = DEFAULT_MIN_FEE_COEFFICIENT)]
    pub fee_coefficient: u64,

    /// Protocol parameter `min_fee_b`.
    #[arg(long, default_value_t = DEFAULT_MIN_FEE_CONSTANT)]
    pub fee_constant: u64,

    #[arg(long, default_value_t = DEVNET_MAGIC)]
    pub magic: u32,

    #[arg(long, env = "CARDANO_SIGNING_KEY_BECH32", hide_env_values = true)]
    pub signing_key_bech32: Option<String>,

    #[arg(long, env = "CARDANO_SIGNING_KEY_CBOR", hide_env_values = true)]
    pub signing_key_cbor: Option<String>,
}

impl BuildTxArgs {
    /// Explicit `--ttl`, else `--tip` plus the default window.
    pub fn validity_slot(&self) -> Option<u64> {
        self.ttl
            .or_else(|| self.tip.map(|tip| tip.saturating_add(DEFAULT_TTL_SLOTS)))
    }
}

/// Arguments for `inspect-tx`.
#[derive(Args, Debug)]
pub struct InspectTxArgs {
    /// Hex-encoded transaction CBOR.
    #[arg(long)]
    pub hex: String,
}
