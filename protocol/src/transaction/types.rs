//! Ledger transaction structures and their canonical encoding.
//!
//! ```text
//! Tx          = [ body, witness_set, true, metadata / null ]
//! body        = { 0: #6.258([* input]), 1: [* output], 2: fee,
//!                 ? 3: ttl, ? 7: auxiliary_data_hash }
//! input       = [ tx_hash, index ]
//! output      = [ address, amount ]
//! witness_set = { ? 0: #6.258([* [vkey, signature]]) }
//! metadata    = { * label => metadatum }
//! ```

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::fee::{fee_at_size, ProtocolParams};
use super::TxError;
use crate::address::Address;
use crate::codec::{
    self, set_items, tagged_set, tuple, uint, CodecConfig, CodecError, FieldMap, FromCbor,
    Metadatum, ToCbor, Value,
};
use crate::config::{HASH_LENGTH, SIGNATURE_LENGTH, VERIFICATION_KEY_LENGTH};
use crate::crypto::hash::blake2b_256;

/// 32-byte Blake2b-256 digest identifying a transaction.
pub type TxHash = [u8; HASH_LENGTH];

/// Label-keyed transaction metadata.
pub type Metadata = BTreeMap<u64, Metadatum>;

const BODY_INPUTS: u64 = 0;
const BODY_OUTPUTS: u64 = 1;
const BODY_FEE: u64 = 2;
const BODY_TTL: u64 = 3;
const BODY_AUX_HASH: u64 = 7;
const WITNESS_VKEYS: u64 = 0;

// ---------------------------------------------------------------------------
// TxInput
// ---------------------------------------------------------------------------

/// Reference to an unspent output.
///
/// `amount` is the value of the referenced output. It never reaches the wire
/// and does not take part in equality: an input is identified by
/// `(tx_hash, index)` alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxInput {
    #[serde(with = "hex")]
    pub tx_hash: TxHash,
    pub index: u16,
    pub amount: u64,
}

impl TxInput {
    pub fn new(tx_hash: TxHash, index: u16, amount: u64) -> Self {
        Self {
            tx_hash,
            index,
            amount,
        }
    }

    /// Input from a hex transaction id.
    pub fn from_hex(tx_hash: &str, index: u16, amount: u64) -> Result<Self, TxError> {
        let tx_hash = <TxHash as hex::FromHex>::from_hex(tx_hash).map_err(|_| {
            TxError::Encoding(CodecError::InvalidLength {
                context: "input tx hash",
                expected: HASH_LENGTH * 2,
                got: tx_hash.len(),
            })
        })?;
        Ok(Self::new(tx_hash, index, amount))
    }
}

impl PartialEq for TxInput {
    fn eq(&self, other: &Self) -> bool {
        self.tx_hash == other.tx_hash && self.index == other.index
    }
}

impl Eq for TxInput {}

impl Hash for TxInput {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tx_hash.hash(state);
        self.index.hash(state);
    }
}

impl ToCbor for TxInput {
    fn to_cbor(&self, cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(Value::Array(vec![
            self.tx_hash.to_cbor(cfg)?,
            self.index.to_cbor(cfg)?,
        ]))
    }
}

impl FromCbor for TxInput {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let [tx_hash, index] = tuple(value, "input")?;
        Ok(Self::new(
            FromCbor::from_cbor(tx_hash, cfg)?,
            u16::from_cbor(index, cfg)?,
            0,
        ))
    }
}

// ---------------------------------------------------------------------------
// TxOutput
// ---------------------------------------------------------------------------

/// Lovelace paid to an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub amount: u64,
}

impl TxOutput {
    pub fn new(address: Address, amount: u64) -> Self {
        Self { address, amount }
    }
}

impl ToCbor for TxOutput {
    fn to_cbor(&self, cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(Value::Array(vec![
            self.address.to_cbor(cfg)?,
            self.amount.to_cbor(cfg)?,
        ]))
    }
}

impl FromCbor for TxOutput {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let [address, amount] = tuple(value, "output")?;
        Ok(Self::new(
            Address::from_cbor(address, cfg)?,
            u64::from_cbor(amount, cfg)?,
        ))
    }
}

// ---------------------------------------------------------------------------
// TxBody
// ---------------------------------------------------------------------------

/// The signed part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TxBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
    pub ttl: Option<u64>,
    #[serde(serialize_with = "serialize_hash_opt")]
    pub auxiliary_data_hash: Option<TxHash>,
}

fn serialize_hash_opt<S: serde::Serializer>(
    hash: &Option<TxHash>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match hash {
        Some(h) => serializer.serialize_some(&hex::encode(h)),
        None => serializer.serialize_none(),
    }
}

impl ToCbor for TxBody {
    fn to_cbor(&self, cfg: &CodecConfig) -> Result<Value, CodecError> {
        let inputs = self
            .inputs
            .iter()
            .map(|input| input.to_cbor(cfg))
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = self
            .outputs
            .iter()
            .map(|output| output.to_cbor(cfg))
            .collect::<Result<Vec<_>, _>>()?;

        let mut fields = vec![
            (uint(BODY_INPUTS), tagged_set(inputs, cfg)),
            (uint(BODY_OUTPUTS), Value::Array(outputs)),
            (uint(BODY_FEE), self.fee.to_cbor(cfg)?),
        ];
        if let Some(ttl) = self.ttl {
            fields.push((uint(BODY_TTL), ttl.to_cbor(cfg)?));
        }
        if let Some(hash) = &self.auxiliary_data_hash {
            fields.push((uint(BODY_AUX_HASH), hash.to_cbor(cfg)?));
        }
        Ok(Value::Map(fields))
    }
}

impl FromCbor for TxBody {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let mut fields = FieldMap::new(
            value,
            &[BODY_INPUTS, BODY_OUTPUTS, BODY_FEE, BODY_TTL, BODY_AUX_HASH],
            "transaction body",
        )?;

        let inputs = set_items(fields.required(BODY_INPUTS, cfg)?, cfg, "inputs")?
            .into_iter()
            .map(|v| TxInput::from_cbor(v, cfg))
            .collect::<Result<_, _>>()?;
        let outputs = codec::array(fields.required(BODY_OUTPUTS, cfg)?, "outputs")?
            .into_iter()
            .map(|v| TxOutput::from_cbor(v, cfg))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            inputs,
            outputs,
            fee: fields.required(BODY_FEE, cfg)?,
            ttl: fields.optional(BODY_TTL, cfg)?,
            auxiliary_data_hash: fields.optional(BODY_AUX_HASH, cfg)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Witnesses
// ---------------------------------------------------------------------------

/// A public key and its signature over the transaction hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VKeyWitness {
    #[serde(with = "hex")]
    pub vkey: [u8; VERIFICATION_KEY_LENGTH],
    #[serde(with = "hex")]
    pub signature: [u8; SIGNATURE_LENGTH],
}

impl VKeyWitness {
    pub fn new(
        vkey: [u8; VERIFICATION_KEY_LENGTH],
        signature: [u8; SIGNATURE_LENGTH],
    ) -> Self {
        Self { vkey, signature }
    }

    /// Zero-filled witness of the real encoded size, used while sizing the fee.
    pub fn placeholder() -> Self {
        Self::new([0u8; VERIFICATION_KEY_LENGTH], [0u8; SIGNATURE_LENGTH])
    }
}

impl ToCbor for VKeyWitness {
    fn to_cbor(&self, cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(Value::Array(vec![
            self.vkey.to_cbor(cfg)?,
            self.signature.to_cbor(cfg)?,
        ]))
    }
}

impl FromCbor for VKeyWitness {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let [vkey, signature] = tuple(value, "vkey witness")?;
        Ok(Self::new(
            FromCbor::from_cbor(vkey, cfg)?,
            FromCbor::from_cbor(signature, cfg)?,
        ))
    }
}

/// Witnesses in signer order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<VKeyWitness>,
}

impl WitnessSet {
    /// `count` placeholder witnesses.
    pub fn placeholders(count: usize) -> Self {
        Self {
            vkey_witnesses: vec![VKeyWitness::placeholder(); count],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vkey_witnesses.is_empty()
    }
}

impl ToCbor for WitnessSet {
    fn to_cbor(&self, cfg: &CodecConfig) -> Result<Value, CodecError> {
        if self.vkey_witnesses.is_empty() {
            return Ok(Value::Map(Vec::new()));
        }
        let witnesses = self
            .vkey_witnesses
            .iter()
            .map(|w| w.to_cbor(cfg))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Map(vec![(
            uint(WITNESS_VKEYS),
            tagged_set(witnesses, cfg),
        )]))
    }
}

impl FromCbor for WitnessSet {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let mut fields = FieldMap::new(value, &[WITNESS_VKEYS], "witness set")?;
        let vkey_witnesses = match fields.optional::<Value>(WITNESS_VKEYS, cfg)? {
            Some(set) => set_items(set, cfg, "vkey witnesses")?
                .into_iter()
                .map(|v| VKeyWitness::from_cbor(v, cfg))
                .collect::<Result<_, _>>()?,
            None => Vec::new(),
        };
        Ok(Self { vkey_witnesses })
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

impl ToCbor for Metadata {
    fn to_cbor(&self, cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(Value::Map(
            self.iter()
                .map(|(label, value)| Ok((uint(*label), value.to_cbor(cfg)?)))
                .collect::<Result<_, CodecError>>()?,
        ))
    }
}

impl FromCbor for Metadata {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let Value::Map(entries) = value else {
            return Err(CodecError::UnexpectedType {
                context: "metadata",
                expected: "map",
            });
        };
        let mut metadata = Metadata::new();
        for (label, value) in entries {
            let label = u64::from_cbor(label, cfg)?;
            if metadata.insert(label, Metadatum::from_cbor(value, cfg)?).is_some() {
                return Err(CodecError::Semantic(format!("duplicate metadata label {label}")));
            }
        }
        Ok(metadata)
    }
}

// ---------------------------------------------------------------------------
// Tx
// ---------------------------------------------------------------------------

/// A complete transaction: body, witnesses, validity flag and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tx {
    pub body: TxBody,
    pub witness_set: WitnessSet,
    pub valid: bool,
    pub metadata: Metadata,
}

impl Default for Tx {
    fn default() -> Self {
        Self {
            body: TxBody::default(),
            witness_set: WitnessSet::default(),
            valid: true,
            metadata: Metadata::new(),
        }
    }
}

impl Tx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode leniently: non-minimal heads, indefinite lengths, unsorted
    /// maps and untagged sets are accepted. Hashes computed on the result
    /// cover its canonical re-encoding, which differs from the submitted
    /// id when `bytes` were not canonical.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        Ok(codec::decode(bytes)?)
    }

    /// Decode, then require that `bytes` are exactly the canonical
    /// encoding of the result, so [`body_hash`](Self::body_hash) is the
    /// id of these bytes.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, TxError> {
        let tx = Self::from_bytes(bytes)?;
        if tx.to_bytes()? != bytes {
            return Err(TxError::Encoding(CodecError::NonCanonical {
                context: "transaction",
            }));
        }
        Ok(tx)
    }

    /// Canonical encoding of the whole transaction.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TxError> {
        Ok(codec::encode(self)?)
    }

    /// Bring the body's auxiliary data hash in line with `metadata`:
    /// Blake2b-256 of its canonical bytes, or absent when it is empty.
    pub fn refresh_auxiliary_data_hash(&mut self) -> Result<(), TxError> {
        self.body.auxiliary_data_hash = if self.metadata.is_empty() {
            None
        } else {
            Some(blake2b_256(&codec::encode(&self.metadata)?))
        };
        Ok(())
    }

    /// Transaction id and signing payload. Refreshes the auxiliary data
    /// hash first so the body reflects the current metadata.
    pub fn hash(&mut self) -> Result<TxHash, TxError> {
        self.refresh_auxiliary_data_hash()?;
        self.body_hash()
    }

    /// Hash of the body as it stands, for transactions that are final.
    pub fn body_hash(&self) -> Result<TxHash, TxError> {
        Ok(blake2b_256(&codec::encode(&self.body)?))
    }

    /// Minimum fee for the transaction at its current encoded size.
    pub fn min_fee(&mut self, params: &ProtocolParams) -> Result<u64, TxError> {
        self.refresh_auxiliary_data_hash()?;
        Ok(fee_at_size(params, self.to_bytes()?.len()))
    }

    pub fn total_input(&self) -> u128 {
        self.body.inputs.iter().map(|i| u128::from(i.amount)).sum()
    }

    pub fn total_output(&self) -> u128 {
        self.body.outputs.iter().map(|o| u128::from(o.amount)).sum()
    }
}

impl ToCbor for Tx {
    fn to_cbor(&self, cfg: &CodecConfig) -> Result<Value, CodecError> {
        let metadata = if self.metadata.is_empty() {
            Value::Null
        } else {
            self.metadata.to_cbor(cfg)?
        };
        Ok(Value::Array(vec![
            self.body.to_cbor(cfg)?,
            self.witness_set.to_cbor(cfg)?,
            self.valid.to_cbor(cfg)?,
            metadata,
        ]))
    }
}

impl FromCbor for Tx {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let [body, witness_set, valid, metadata] = tuple(value, "transaction")?;
        let metadata = match metadata {
            Value::Null => Metadata::new(),
            other => Metadata::from_cbor(other, cfg)?,
        };
        Ok(Self {
            body: TxBody::from_cbor(body, cfg)?,
            witness_set: WitnessSet::from_cbor(witness_set, cfg)?,
            valid: bool::from_cbor(valid, cfg)?,
            metadata,
        })
    }
}
