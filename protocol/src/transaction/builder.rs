//! Transaction construction.
//!
//! The [`TxBuilder`] holds a draft [`Tx`] that callers shape freely: inputs,
//! outputs, TTL, memo. Nothing about the fee is decided until
//! [`TxBuilder::build`], which works on a copy of the draft and runs the
//! finishing steps in a fixed order:
//!
//! 1. install one zero-filled witness per signer so the encoded size already
//!    matches the signed transaction;
//! 2. iterate the fee to a fixed point, re-deriving change each round;
//! 3. hash the body, sign it, swap the placeholders for real witnesses;
//! 4. encode.
//!
//! ## Fee fixed point
//!
//! The fee depends on the encoded size, and the size depends on the fee
//! (and on the change amount it implies) through the CBOR integer widths.
//! Starting from zero, each round sets the fee to what the current
//! encoding requires. The fee never decreases, widths are bounded, so the
//! sequence settles within a few rounds; [`MAX_FEE_ITERATIONS`] caps it.
//!
//! When the surplus is too small to pay for its own change output, the
//! output is dropped and the surplus becomes the fee.

use serde::Serialize;
use tracing::{debug, info};

use super::fee::{fee_at_size, ProtocolParams};
use super::memo::{chunk_memo, memo_envelope};
use super::selection::select_greedy;
use super::signing::sign_hash;
use super::types::{Tx, TxHash, TxInput, TxOutput, WitnessSet};
use super::TxError;
use crate::address::{Address, Network};
use crate::codec::CodecError;
use crate::config::{MAX_FEE_ITERATIONS, MEMO_LABEL};
use crate::crypto::keys::PaymentKeypair;

// ---------------------------------------------------------------------------
// SignedTx
// ---------------------------------------------------------------------------

/// A finalized transaction with its canonical bytes and id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTx {
    pub tx: Tx,
    #[serde(with = "hex")]
    pub bytes: Vec<u8>,
    #[serde(with = "hex")]
    pub hash: TxHash,
}

impl SignedTx {
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub fn fee(&self) -> u64 {
        self.tx.body.fee
    }
}

// ---------------------------------------------------------------------------
// TxBuilder
// ---------------------------------------------------------------------------

/// Builder for single-signer (or few-signer) payment transactions.
///
/// # Usage
///
/// ```rust,no_run
/// use lovelace_protocol::address::{Address, Network};
/// use lovelace_protocol::crypto::PaymentKeypair;
/// use lovelace_protocol::transaction::{ProtocolParams, TxBuilder, TxInput, TxOutput};
///
/// let key = PaymentKeypair::generate();
/// let change = Address::payment(Network::Testnet, &key.verification_key()).unwrap();
/// let receiver: Address = "addr_test1vz64czye08j6pkysk3fyfm90jz2tyft5tzjktz5h22wkn2gml6klc"
///     .parse()
///     .unwrap();
///
/// let utxos = [TxInput::new([7u8; 32], 0, 5_000_000)];
///
/// let mut builder = TxBuilder::new(ProtocolParams::default(), change);
/// builder.add_outputs([TxOutput::new(receiver, 2_000_000)]);
/// builder.select_inputs(&utxos, 2_000_000 + 167_217).unwrap();
/// builder.set_memo("thanks for lunch").unwrap();
///
/// let signed = builder.build(&[key]).unwrap();
/// println!("{} ({} bytes)", signed.hash_hex(), signed.bytes.len());
/// ```
#[derive(Debug, Clone)]
pub struct TxBuilder {
    draft: Tx,
    params: ProtocolParams,
    change_address: Address,
    witness_count: usize,
}

impl TxBuilder {
    /// Start an empty draft. `change_address` receives any surplus and fixes
    /// the network every output must belong to.
    pub fn new(params: ProtocolParams, change_address: Address) -> Self {
        Self {
            draft: Tx::new(),
            params,
            change_address,
            witness_count: 1,
        }
    }

    /// Number of signers assumed by [`estimate_fee`](Self::estimate_fee).
    /// `build` always sizes for the keys it is given.
    pub fn with_witness_count(mut self, count: usize) -> Self {
        self.witness_count = count;
        self
    }

    /// Add `margin` lovelace on top of the ledger minimum fee.
    pub fn with_fee_margin(mut self, margin: u64) -> Self {
        self.params.fee_margin = margin;
        self
    }

    pub fn network(&self) -> Network {
        self.change_address.network()
    }

    /// The draft as it stands. Fee and change are not part of it.
    pub fn draft(&self) -> &Tx {
        &self.draft
    }

    /// Append inputs, skipping any already referenced by the draft.
    pub fn add_inputs(&mut self, inputs: impl IntoIterator<Item = TxInput>) -> &mut Self {
        for input in inputs {
            if self.draft.body.inputs.contains(&input) {
                debug!(index = input.index, "skipping duplicate input");
                continue;
            }
            self.draft.body.inputs.push(input);
        }
        self
    }

    pub fn add_outputs(&mut self, outputs: impl IntoIterator<Item = TxOutput>) -> &mut Self {
        self.draft.body.outputs.extend(outputs);
        self
    }

    /// Pick inputs from `candidates` covering `target` and add them to the
    /// draft. Candidates already in the draft are not counted. On failure
    /// the draft is left unchanged.
    pub fn select_inputs(
        &mut self,
        candidates: &[TxInput],
        target: u64,
    ) -> Result<Vec<TxInput>, TxError> {
        let fresh: Vec<TxInput> = candidates
            .iter()
            .filter(|c| !self.draft.body.inputs.contains(c))
            .cloned()
            .collect();
        let selected = select_greedy(&fresh, target)?;
        self.add_inputs(selected.iter().cloned());
        Ok(selected)
    }

    /// Last slot at which the transaction is valid.
    pub fn set_ttl(&mut self, slot: u64) -> &mut Self {
        self.draft.body.ttl = Some(slot);
        self
    }

    /// Attach a CIP-20 memo, split into 64-byte chunks. An empty memo is a
    /// no-op; a second memo is rejected and the first one kept.
    pub fn set_memo(&mut self, text: &str) -> Result<(), TxError> {
        if text.is_empty() {
            return Ok(());
        }
        self.set_memo_chunks(&chunk_memo(text))
    }

    /// Attach a memo from caller-chosen chunks, each at most 64 bytes.
    pub fn set_memo_chunks(&mut self, chunks: &[String]) -> Result<(), TxError> {
        if chunks.is_empty() {
            return Ok(());
        }
        if self.draft.metadata.contains_key(&MEMO_LABEL) {
            return Err(TxError::MemoAlreadySet);
        }
        let envelope = memo_envelope(chunks)?;
        self.draft.metadata.insert(MEMO_LABEL, envelope);
        debug!(chunks = chunks.len(), "memo attached");
        Ok(())
    }

    /// Fee the draft would pay with `with_witness_count` signers.
    pub fn estimate_fee(&self) -> Result<u64, TxError> {
        let mut tx = self.draft.clone();
        self.balance(&mut tx, self.witness_count)
    }

    /// Finalize a copy of the draft: balance, add change, sign with `keys`
    /// in order, encode.
    pub fn build(&self, keys: &[PaymentKeypair]) -> Result<SignedTx, TxError> {
        if keys.is_empty() {
            return Err(TxError::Signing("no signing keys supplied".into()));
        }
        let network = self.network();
        for output in &self.draft.body.outputs {
            output.address.ensure_network(network)?;
        }

        let mut tx = self.draft.clone();
        self.balance(&mut tx, keys.len())?;

        let hash = tx.hash()?;
        tx.witness_set = sign_hash(&hash, keys);
        let bytes = tx.to_bytes()?;

        info!(
            tx_hash = %hex::encode(hash),
            size = bytes.len(),
            fee = tx.body.fee,
            inputs = tx.body.inputs.len(),
            outputs = tx.body.outputs.len(),
            "transaction built"
        );
        Ok(SignedTx { tx, bytes, hash })
    }

    /// Settle fee and change on `tx`, sized for `witnesses` signers.
    /// Returns the final fee.
    fn balance(&self, tx: &mut Tx, witnesses: usize) -> Result<u64, TxError> {
        tx.witness_set = WitnessSet::placeholders(witnesses);
        tx.refresh_auxiliary_data_hash()?;

        let base_outputs = tx.body.outputs.len();
        let total_in = i128::try_from(tx.total_input()).map_err(|_| overflow())?;
        let total_out = i128::try_from(tx.total_output()).map_err(|_| overflow())?;

        let mut fee: u64 = 0;
        for iteration in 1..=MAX_FEE_ITERATIONS {
            tx.body.outputs.truncate(base_outputs);
            tx.body.fee = fee;

            let change = total_in - total_out - i128::from(fee);
            if change > 0 {
                let amount = u64::try_from(change).map_err(|_| overflow())?;
                tx.body
                    .outputs
                    .push(TxOutput::new(self.change_address.clone(), amount));
            }

            let size = tx.to_bytes()?.len();
            let required = fee_at_size(&self.params, size);
            debug!(iteration, fee, required, size, change = %change, "fee round");

            if required <= fee {
                if change >= 0 {
                    return Ok(fee);
                }
                return self.absorb_surplus(tx, total_in - total_out, required);
            }
            fee = required;
        }

        Err(TxError::FeeDidNotConverge {
            iterations: MAX_FEE_ITERATIONS,
        })
    }

    /// The change output no longer fits at the settled fee. Without it the
    /// whole surplus may still pay for the smaller transaction, in which
    /// case it all goes to the fee.
    fn absorb_surplus(&self, tx: &mut Tx, surplus: i128, required: u64) -> Result<u64, TxError> {
        if surplus < i128::from(required) {
            let shortfall = u64::try_from(i128::from(required) - surplus).unwrap_or(u64::MAX);
            return Err(TxError::InsufficientFunds { shortfall });
        }
        let fee = u64::try_from(surplus).map_err(|_| overflow())?;
        tx.body.fee = fee;
        // A smaller fee never widens the encoding, so `required` still holds.
        let required = fee_at_size(&self.params, tx.to_bytes()?.len());
        if required > fee {
            return Err(TxError::InsufficientFunds {
                shortfall: required - fee,
            });
        }
        debug!(fee, "surplus below change cost, paid as fee");
        Ok(fee)
    }
}

fn overflow() -> TxError {
    TxError::Encoding(CodecError::IntegerOutOfRange { context: "lovelace total" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::transaction::memo::decode_memo;
    use crate::transaction::signing::verify_witnesses;

    fn key() -> PaymentKeypair {
        PaymentKeypair::from_seed(&[42u8; 32])
    }

    fn own_address(network: Network) -> Address {
        Address::payment(network, &key().verification_key()).unwrap()
    }

    fn receiver(network: Network) -> Address {
        let other = PaymentKeypair::from_seed(&[7u8; 32]);
        Address::payment(network, &other.verification_key()).unwrap()
    }

    fn funded_builder(amounts: &[u64]) -> TxBuilder {
        let mut builder = TxBuilder::new(ProtocolParams::default(), own_address(Network::Testnet));
        builder.add_inputs(
            amounts
                .iter()
                .enumerate()
                .map(|(i, &a)| TxInput::new([i as u8 + 1; 32], 0, a)),
        );
        builder
    }

    #[test]
    fn change_balances_exactly() {
        let mut builder = funded_builder(&[5_000_000]);
        builder.add_outputs([TxOutput::new(receiver(Network::Testnet), 2_000_000)]);
        let signed = builder.build(&[key()]).unwrap();

        let tx = &signed.tx;
        assert_eq!(tx.body.outputs.len(), 2);
        assert_eq!(tx.body.outputs[1].address, own_address(Network::Testnet));
        assert_eq!(
            tx.total_input(),
            tx.total_output() + u128::from(tx.body.fee)
        );
    }

    #[test]
    fn fee_covers_final_size() {
        let mut builder = funded_builder(&[5_000_000]);
        builder.add_outputs([TxOutput::new(receiver(Network::Testnet), 2_000_000)]);
        builder.set_memo(&"m".repeat(100)).unwrap();
        let signed = builder.build(&[key()]).unwrap();

        let params = ProtocolParams::default();
        assert!(signed.fee() >= fee_at_size(&params, signed.bytes.len()));
        // Overpayment is bounded by a few bytes of shrinking integer heads.
        assert!(
            signed.fee() - fee_at_size(&params, signed.bytes.len())
                <= params.min_fee_coefficient * 8
        );
    }

    #[test]
    fn signed_bytes_decode_and_verify() {
        let mut builder = funded_builder(&[3_000_000, 1_000_000]);
        builder.add_outputs([TxOutput::new(receiver(Network::Testnet), 1_500_000)]);
        builder.set_ttl(12_345);
        let signed = builder.build(&[key()]).unwrap();

        let decoded = Tx::from_bytes(&signed.bytes).unwrap();
        // Input equality ignores the amounts the wire does not carry.
        assert_eq!(decoded.body, signed.tx.body);
        assert_eq!(decoded.body_hash().unwrap(), signed.hash);
        verify_witnesses(&decoded).unwrap();
    }

    #[test]
    fn build_leaves_draft_untouched() {
        let mut builder = funded_builder(&[5_000_000]);
        builder.add_outputs([TxOutput::new(receiver(Network::Testnet), 2_000_000)]);
        let before = builder.draft().clone();
        let first = builder.build(&[key()]).unwrap();
        assert_eq!(builder.draft(), &before);
        assert_eq!(builder.draft().body.fee, 0);

        let second = builder.build(&[key()]).unwrap();
        assert_eq!(first.bytes, second.bytes);
    }

    /// Fee of `builder`'s draft with one signer and no change output,
    /// sized at a fee of the same head width as the real one.
    fn no_change_fee(builder: &TxBuilder) -> u64 {
        let mut sized = builder.draft().clone();
        sized.witness_set = WitnessSet::placeholders(1);
        sized.body.fee = 200_000;
        fee_at_size(&ProtocolParams::default(), sized.to_bytes().unwrap().len())
    }

    #[test]
    fn exact_spend_has_no_change_output() {
        let mut builder = TxBuilder::new(ProtocolParams::default(), own_address(Network::Testnet));
        builder.add_outputs([TxOutput::new(receiver(Network::Testnet), 1_000_000)]);
        builder.add_inputs([TxInput::new([9u8; 32], 0, 0)]);
        let fee = no_change_fee(&builder);
        builder.draft.body.inputs[0].amount = 1_000_000 + fee;

        let signed = builder.build(&[key()]).unwrap();
        assert_eq!(signed.tx.body.outputs.len(), 1);
        assert_eq!(signed.fee(), fee);
        assert_eq!(
            signed.tx.total_input(),
            signed.tx.total_output() + u128::from(signed.fee())
        );
    }

    #[test]
    fn dust_surplus_goes_to_fee() {
        let mut builder = TxBuilder::new(ProtocolParams::default(), own_address(Network::Testnet));
        builder.add_outputs([TxOutput::new(receiver(Network::Testnet), 1_000_000)]);
        builder.add_inputs([TxInput::new([9u8; 32], 0, 0)]);
        let fee = no_change_fee(&builder);
        // Too little left over to pay for a change output.
        builder.draft.body.inputs[0].amount = 1_000_000 + fee + 100;

        let signed = builder.build(&[key()]).unwrap();
        assert_eq!(signed.tx.body.outputs.len(), 1);
        assert_eq!(signed.fee(), fee + 100);
    }

    #[test]
    fn underfunded_build_reports_shortfall() {
        let mut builder = funded_builder(&[1_000_000]);
        builder.add_outputs([TxOutput::new(receiver(Network::Testnet), 1_000_000)]);
        let expected = no_change_fee(&builder);
        match builder.build(&[key()]) {
            Err(TxError::InsufficientFunds { shortfall }) => assert_eq!(shortfall, expected),
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn select_inputs_adds_to_draft() {
        let mut builder = TxBuilder::new(ProtocolParams::default(), own_address(Network::Testnet));
        let candidates = [
            TxInput::new([1u8; 32], 0, 4_000_000),
            TxInput::new([2u8; 32], 1, 1_000_000),
        ];
        let selected = builder.select_inputs(&candidates, 1_500_000).unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(builder.draft().body.inputs[0].amount, 1_000_000);

        let err = builder.select_inputs(&candidates, 10_000_000).unwrap_err();
        assert!(matches!(err, TxError::InsufficientFunds { shortfall: 5_000_000 }));
        assert_eq!(builder.draft().body.inputs.len(), 2);
    }

    #[test]
    fn selection_skips_inputs_already_in_draft() {
        let mut builder = funded_builder(&[1_000_000]);
        let candidates = [
            TxInput::new([1u8; 32], 0, 1_000_000),
            TxInput::new([2u8; 32], 0, 3_000_000),
        ];
        let selected = builder.select_inputs(&candidates, 500_000).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].tx_hash, [2u8; 32]);
        assert_eq!(builder.draft().body.inputs.len(), 2);
    }

    #[test]
    fn duplicate_inputs_are_ignored() {
        let mut builder = funded_builder(&[1_000]);
        builder.add_inputs([TxInput::new([1u8; 32], 0, 999)]);
        assert_eq!(builder.draft().body.inputs.len(), 1);
    }

    #[test]
    fn second_memo_is_rejected() {
        let mut builder = funded_builder(&[1_000]);
        builder.set_memo("first").unwrap();
        assert!(matches!(
            builder.set_memo("second"),
            Err(TxError::MemoAlreadySet)
        ));
        assert_eq!(
            decode_memo(&builder.draft().metadata).unwrap().as_deref(),
            Some("first")
        );
    }

    #[test]
    fn memo_sets_aux_hash_in_signed_body() {
        let mut builder = funded_builder(&[5_000_000]);
        builder.set_memo("hello").unwrap();
        let signed = builder.build(&[key()]).unwrap();
        let expected = crate::crypto::hash::blake2b_256(
            &codec::encode(&signed.tx.metadata).unwrap(),
        );
        assert_eq!(signed.tx.body.auxiliary_data_hash, Some(expected));
    }

    #[test]
    fn mainnet_output_on_testnet_builder_is_rejected() {
        let mut builder = funded_builder(&[5_000_000]);
        builder.add_outputs([TxOutput::new(receiver(Network::Mainnet), 1_000_000)]);
        assert!(matches!(
            builder.build(&[key()]),
            Err(TxError::InvalidAddress(_))
        ));
    }

    #[test]
    fn build_requires_keys() {
        let builder = funded_builder(&[5_000_000]);
        assert!(matches!(builder.build(&[]), Err(TxError::Signing(_))));
    }

    #[test]
    fn more_signers_cost_more() {
        let mut builder = funded_builder(&[5_000_000]);
        builder.add_outputs([TxOutput::new(receiver(Network::Testnet), 1_000_000)]);
        let one = builder.clone().with_witness_count(1).estimate_fee().unwrap();
        let two = builder.with_witness_count(2).estimate_fee().unwrap();
        assert!(two > one);
    }

    #[test]
    fn fee_margin_is_paid() {
        let mut builder = funded_builder(&[5_000_000]);
        builder.add_outputs([TxOutput::new(receiver(Network::Testnet), 1_000_000)]);
        let plain = builder.estimate_fee().unwrap();
        let padded = builder.with_fee_margin(10_000).estimate_fee().unwrap();
        assert_eq!(padded, plain + 10_000);
    }
}
