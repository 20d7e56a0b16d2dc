// Copyright (c) 2026 Lovelace Contributors. MIT License.
// See LICENSE for details.

//! # Lovelace CLI
//!
//! Entry point for the `lovelace` binary.
//!
//! - `key-pair`   derive keys and an address from a seed
//! - `build-tx`   build and sign a payment from a UTxO list
//! - `inspect-tx` decode a transaction
//!
//! Results go to stdout as JSON; logs go to stderr.

mod cli;
mod logging;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;

use lovelace_protocol::address::{Address, Network};
use lovelace_protocol::crypto::PaymentKeypair;
use lovelace_protocol::transaction::{
    decode_memo, ProtocolParams, Tx, TxBuilder, TxInput, TxOutput,
};

use cli::{BuildTxArgs, Commands, InspectTxArgs, KeyPairArgs, LovelaceCli};

fn main() -> Result<()> {
    let cli = LovelaceCli::parse();
    logging::init_logging(
        "lovelace=info,lovelace_protocol=info",
        cli.log_format.into(),
    );

    match cli.command {
        Commands::KeyPair(args) => key_pair(args),
        Commands::BuildTx(args) => build_tx(args),
        Commands::InspectTx(args) => inspect_tx(args),
    }
}

fn key_pair(args: KeyPairArgs) -> Result<()> {
    let network = Network::from_magic(args.magic)?;
    let key = PaymentKeypair::from_hex(args.seed.trim()).context("invalid seed")?;
    let vk = key.verification_key();
    let address = Address::payment(network, &vk)?;

    tracing::info!(%network, "derived key pair");
    print_json(&json!({
        "network": network,
        "address": address.to_bech32()?,
        "verification_key": vk.to_bech32()?,
        "signing_key": key.to_bech32()?,
    }))
}

fn build_tx(args: BuildTxArgs) -> Result<()> {
    let network = Network::from_magic(args.magic)?;
    let key = signing_key(&args)?;
    let own = Address::payment(network, &key.verification_key())?;

    let receiver: Address = args
        .receiver
        .parse()
        .with_context(|| format!("invalid receiver address {}", args.receiver))?;
    receiver
        .ensure_network(network)
        .context("receiver is on a different network")?;

    let raw = std::fs::read_to_string(&args.utxos)
        .with_context(|| format!("failed to read {}", args.utxos.display()))?;
    let utxos: Vec<TxInput> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse UTxOs from {}", args.utxos.display()))?;
    tracing::info!(count = utxos.len(), source = %own, "loaded UTxOs");

    let Some(target) = args.amount.checked_add(args.fee_estimate) else {
        bail!("amount plus fee estimate overflows");
    };

    let params = ProtocolParams::new(args.fee_coefficient, args.fee_constant);
    let mut builder = TxBuilder::new(params, own);
    builder.add_outputs([TxOutput::new(receiver, args.amount)]);
    builder
        .select_inputs(&utxos, target)
        .context("input selection failed")?;
    if let Some(slot) = args.validity_slot() {
        builder.set_ttl(slot);
    }
    if let Some(memo) = &args.memo {
        builder.set_memo(memo).context("failed to set memo")?;
    }

    let signed = builder
        .build(&[key])
        .context("failed to build transaction")?;
    print_json(&signed)
}

fn inspect_tx(args: InspectTxArgs) -> Result<()> {
    let bytes = hex::decode(args.hex.trim()).context("transaction is not valid hex")?;
    let tx = Tx::from_bytes(&bytes).context("failed to decode transaction")?;
    // The hash covers the canonical re-encoding of the body.
    let hash = tx.body_hash()?;
    let canonical = tx.to_bytes()? == bytes;
    if !canonical {
        tracing::warn!("input is not canonically encoded; hash is of the canonical form");
    }
    let memo = decode_memo(&tx.metadata).context("malformed memo")?;

    print_json(&json!({
        "hash": hex::encode(hash),
        "canonical": canonical,
        "size": bytes.len(),
        "memo": memo,
        "tx": tx,
    }))
}

/// Bech32 takes precedence over CBOR when both are set.
fn signing_key(args: &BuildTxArgs) -> Result<PaymentKeypair> {
    if let Some(text) = args.signing_key_bech32.as_deref().filter(|s| !s.is_empty()) {
        return PaymentKeypair::from_bech32(text.trim())
            .context("invalid CARDANO_SIGNING_KEY_BECH32");
    }
    if let Some(cbor_hex) = args.signing_key_cbor.as_deref().filter(|s| !s.is_empty()) {
        let cbor = hex::decode(cbor_hex.trim()).context("CARDANO_SIGNING_KEY_CBOR is not hex")?;
        return PaymentKeypair::from_cbor(&cbor).context("invalid CARDANO_SIGNING_KEY_CBOR");
    }
    bail!("either CARDANO_SIGNING_KEY_BECH32 or CARDANO_SIGNING_KEY_CBOR must be set")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}
