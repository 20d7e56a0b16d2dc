//! # Canonical Encoding
//!
//! Deterministic CBOR for every ledger structure. A value is first lowered
//! into a [`Value`] tree through [`ToCbor`], normalized (map keys sorted by
//! their encoded bytes), and written by `ciborium`, which always picks the
//! shortest integer head and definite lengths. Decoding reverses the path
//! with a nesting ceiling and rejects trailing input.
//!
//! ## Head widths
//!
//! | value range              | head bytes |
//! |--------------------------|------------|
//! | `0..=23`                 | 1          |
//! | `24..=0xff`              | 2          |
//! | `0x100..=0xffff`         | 3          |
//! | `0x1_0000..=0xffff_ffff` | 5          |
//! | larger                   | 9          |
//!
//! Fee computation depends on this table: a fee crossing one of these
//! boundaries grows the transaction it is paying for.

pub mod metadatum;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use thiserror::Error;

pub use ciborium::value::{Integer, Value};
pub use metadatum::Metadatum;

use crate::config::{MAX_NESTING_DEPTH, SET_TAG};

/// Errors raised while encoding or decoding canonical CBOR.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(String),

    #[error("malformed cbor at byte {offset}")]
    Syntax { offset: usize },

    #[error("semantic error: {0}")]
    Semantic(String),

    #[error("nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("unknown field {key} in {context}")]
    UnknownField { context: &'static str, key: String },

    #[error("missing field {key} in {context}")]
    MissingField { context: &'static str, key: u64 },

    #[error("{context}: expected {expected}")]
    UnexpectedType {
        context: &'static str,
        expected: &'static str,
    },

    #[error("{context}: expected length {expected}, got {got}")]
    InvalidLength {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{context}: integer out of range")]
    IntegerOutOfRange { context: &'static str },

    #[error("{0} trailing bytes after top-level value")]
    TrailingBytes(usize),

    #[error("{context} is not canonically encoded")]
    NonCanonical { context: &'static str },
}

impl<T: std::fmt::Debug> From<ciborium::de::Error<T>> for CodecError {
    fn from(err: ciborium::de::Error<T>) -> Self {
        use ciborium::de::Error;
        match err {
            Error::Io(e) => Self::Io(format!("{e:?}")),
            Error::Syntax(offset) => Self::Syntax { offset },
            Error::Semantic(_, msg) => Self::Semantic(msg),
            // The limit is not carried by the error; callers fill it in.
            Error::RecursionLimitExceeded => Self::NestingTooDeep { limit: 0 },
        }
    }
}

impl<T: std::fmt::Debug> From<ciborium::ser::Error<T>> for CodecError {
    fn from(err: ciborium::ser::Error<T>) -> Self {
        match err {
            ciborium::ser::Error::Io(e) => Self::Io(format!("{e:?}")),
            ciborium::ser::Error::Value(msg) => Self::Semantic(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Process-wide encoding options. Built once, then only ever borrowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Tag wrapping set-valued fields (inputs, vkey witnesses).
    pub set_tag: u64,
    /// Maximum container nesting accepted by the decoder.
    pub max_nesting: usize,
    /// Sort map entries by encoded key bytes before writing.
    pub sort_map_keys: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            set_tag: SET_TAG,
            max_nesting: MAX_NESTING_DEPTH,
            sort_map_keys: true,
        }
    }
}

static CONFIG: OnceLock<CodecConfig> = OnceLock::new();

/// The shared codec configuration, initialized on first use.
pub fn config() -> &'static CodecConfig {
    CONFIG.get_or_init(CodecConfig::default)
}

// ---------------------------------------------------------------------------
// Traits & entry points
// ---------------------------------------------------------------------------

/// Lower a value into its CBOR tree.
pub trait ToCbor {
    fn to_cbor(&self, cfg: &CodecConfig) -> Result<Value, CodecError>;
}

/// Rebuild a value from its CBOR tree.
pub trait FromCbor: Sized {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError>;
}

/// Encode with the shared configuration.
pub fn encode<T: ToCbor + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    encode_with(value, config())
}

pub fn encode_with<T: ToCbor + ?Sized>(value: &T, cfg: &CodecConfig) -> Result<Vec<u8>, CodecError> {
    let mut tree = value.to_cbor(cfg)?;
    if cfg.sort_map_keys {
        canonicalize(&mut tree)?;
    }
    let mut out = Vec::new();
    ciborium::into_writer(&tree, &mut out)?;
    Ok(out)
}

/// Decode with the shared configuration.
pub fn decode<T: FromCbor>(bytes: &[u8]) -> Result<T, CodecError> {
    decode_with(bytes, config())
}

/// Decode exactly one value from `bytes`.
pub fn decode_with<T: FromCbor>(bytes: &[u8], cfg: &CodecConfig) -> Result<T, CodecError> {
    let mut rest = bytes;
    let tree: Value = ciborium::de::from_reader_with_recursion_limit(&mut rest, cfg.max_nesting)
        .map_err(|e| match CodecError::from(e) {
            CodecError::NestingTooDeep { .. } => CodecError::NestingTooDeep {
                limit: cfg.max_nesting,
            },
            other => other,
        })?;
    if !rest.is_empty() {
        return Err(CodecError::TrailingBytes(rest.len()));
    }
    T::from_cbor(tree, cfg)
}

/// Size of the CBOR head (major type plus argument) for `n`.
pub const fn head_len(n: u64) -> usize {
    match n {
        0..=23 => 1,
        24..=0xff => 2,
        0x100..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Sort every map in the tree by the bytewise order of its encoded keys.
/// Duplicate keys are rejected since they have no canonical form.
fn canonicalize(value: &mut Value) -> Result<(), CodecError> {
    match value {
        Value::Array(items) => items.iter_mut().try_for_each(canonicalize),
        Value::Tag(_, inner) => canonicalize(inner),
        Value::Map(entries) => {
            let mut keyed = Vec::with_capacity(entries.len());
            for (mut k, mut v) in entries.drain(..) {
                canonicalize(&mut k)?;
                canonicalize(&mut v)?;
                let mut key_bytes = Vec::new();
                ciborium::into_writer(&k, &mut key_bytes)?;
                keyed.push((key_bytes, k, v));
            }
            keyed.sort_by(|a, b| a.0.cmp(&b.0));
            if keyed.windows(2).any(|w| w[0].0 == w[1].0) {
                return Err(CodecError::Semantic("duplicate map key".into()));
            }
            entries.extend(keyed.into_iter().map(|(_, k, v)| (k, v)));
            Ok(())
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Structural helpers
// ---------------------------------------------------------------------------

/// Wrap `items` in the configured set tag.
pub(crate) fn tagged_set(items: Vec<Value>, cfg: &CodecConfig) -> Value {
    Value::Tag(cfg.set_tag, Box::new(Value::Array(items)))
}

/// Elements of a set-valued field. Untagged arrays from older encoders are
/// accepted; any other tag is not.
pub(crate) fn set_items(
    value: Value,
    cfg: &CodecConfig,
    context: &'static str,
) -> Result<Vec<Value>, CodecError> {
    match value {
        Value::Tag(tag, inner) if tag == cfg.set_tag => array(*inner, context),
        Value::Array(items) => Ok(items),
        _ => Err(CodecError::UnexpectedType {
            context,
            expected: "set",
        }),
    }
}

pub(crate) fn array(value: Value, context: &'static str) -> Result<Vec<Value>, CodecError> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(CodecError::UnexpectedType {
            context,
            expected: "array",
        }),
    }
}

/// A fixed-length array, as used for positional structures.
pub(crate) fn tuple<const N: usize>(
    value: Value,
    context: &'static str,
) -> Result<[Value; N], CodecError> {
    let items = array(value, context)?;
    let got = items.len();
    items.try_into().map_err(|_| CodecError::InvalidLength {
        context,
        expected: N,
        got,
    })
}

pub(crate) fn uint(value: u64) -> Value {
    Value::Integer(value.into())
}

/// Integer-keyed map being consumed field by field.
pub(crate) struct FieldMap {
    context: &'static str,
    fields: BTreeMap<u64, Value>,
}

impl FieldMap {
    /// Accept only `known` keys, each at most once.
    pub(crate) fn new(
        value: Value,
        known: &[u64],
        context: &'static str,
    ) -> Result<Self, CodecError> {
        let Value::Map(entries) = value else {
            return Err(CodecError::UnexpectedType {
                context,
                expected: "map",
            });
        };
        let mut fields = BTreeMap::new();
        for (key, value) in entries {
            let id = match &key {
                Value::Integer(i) => u64::try_from(*i).ok(),
                _ => None,
            };
            let key = id
                .filter(|k| known.contains(k))
                .ok_or_else(|| CodecError::UnknownField {
                    context,
                    key: format!("{key:?}"),
                })?;
            if fields.insert(key, value).is_some() {
                return Err(CodecError::Semantic(format!(
                    "duplicate field {key} in {context}"
                )));
            }
        }
        Ok(Self { context, fields })
    }

    pub(crate) fn required<T: FromCbor>(
        &mut self,
        key: u64,
        cfg: &CodecConfig,
    ) -> Result<T, CodecError> {
        let value = self.fields.remove(&key).ok_or(CodecError::MissingField {
            context: self.context,
            key,
        })?;
        T::from_cbor(value, cfg)
    }

    pub(crate) fn optional<T: FromCbor>(
        &mut self,
        key: u64,
        cfg: &CodecConfig,
    ) -> Result<Option<T>, CodecError> {
        self.fields
            .remove(&key)
            .map(|value| T::from_cbor(value, cfg))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Primitive impls
// ---------------------------------------------------------------------------

/// Pass-through so [`FieldMap`] can hand out raw sub-trees.
impl FromCbor for Value {
    fn from_cbor(value: Value, _cfg: &CodecConfig) -> Result<Self, CodecError> {
        Ok(value)
    }
}

impl ToCbor for u64 {
    fn to_cbor(&self, _cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(uint(*self))
    }
}

impl FromCbor for u64 {
    fn from_cbor(value: Value, _cfg: &CodecConfig) -> Result<Self, CodecError> {
        match value {
            Value::Integer(i) => {
                u64::try_from(i).map_err(|_| CodecError::IntegerOutOfRange { context: "u64" })
            }
            _ => Err(CodecError::UnexpectedType {
                context: "u64",
                expected: "unsigned integer",
            }),
        }
    }
}

impl ToCbor for u16 {
    fn to_cbor(&self, _cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(uint(u64::from(*self)))
    }
}

impl FromCbor for u16 {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let wide = u64::from_cbor(value, cfg)?;
        u16::try_from(wide).map_err(|_| CodecError::IntegerOutOfRange { context: "u16" })
    }
}

impl ToCbor for bool {
    fn to_cbor(&self, _cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(Value::Bool(*self))
    }
}

impl FromCbor for bool {
    fn from_cbor(value: Value, _cfg: &CodecConfig) -> Result<Self, CodecError> {
        match value {
            Value::Bool(b) => Ok(b),
            _ => Err(CodecError::UnexpectedType {
                context: "bool",
                expected: "boolean",
            }),
        }
    }
}

impl ToCbor for Vec<u8> {
    fn to_cbor(&self, _cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(Value::Bytes(self.clone()))
    }
}

impl FromCbor for Vec<u8> {
    fn from_cbor(value: Value, _cfg: &CodecConfig) -> Result<Self, CodecError> {
        match value {
            Value::Bytes(b) => Ok(b),
            _ => Err(CodecError::UnexpectedType {
                context: "bytes",
                expected: "byte string",
            }),
        }
    }
}

impl<const N: usize> ToCbor for [u8; N] {
    fn to_cbor(&self, _cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(Value::Bytes(self.to_vec()))
    }
}

impl<const N: usize> FromCbor for [u8; N] {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        let bytes = Vec::<u8>::from_cbor(value, cfg)?;
        let got = bytes.len();
        bytes.try_into().map_err(|_| CodecError::InvalidLength {
            context: "fixed bytes",
            expected: N,
            got,
        })
    }
}
