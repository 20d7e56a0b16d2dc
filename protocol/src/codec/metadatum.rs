//! Transaction metadata values.
//!
//! Metadata is schemaless on chain, so values form a closed tree of five
//! shapes. Every shape has exactly one canonical encoding; maps are written
//! in encoded-key order by the codec and decoded in wire order. Map equality
//! ignores entry order, so a decoded map equals the one that was encoded.

use serde::Serialize;

use super::{CodecConfig, CodecError, FromCbor, Integer, ToCbor, Value};

/// One node of a metadata tree.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metadatum {
    /// Any integer in the CBOR range `-2^64..2^64`.
    Int(i128),
    Bytes(#[serde(with = "hex")] Vec<u8>),
    Text(String),
    List(Vec<Metadatum>),
    Map(Vec<(Metadatum, Metadatum)>),
}

impl Metadatum {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Metadatum]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Value stored under a text key, if this is a map.
    pub fn get(&self, key: &str) -> Option<&Metadatum> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

impl PartialEq for Metadatum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            // Keys are unique (the encoder rejects duplicates), so equal
            // length plus containment is set equality.
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len() && a.iter().all(|entry| b.contains(entry))
            }
            _ => false,
        }
    }
}

impl Eq for Metadatum {}

impl From<&str> for Metadatum {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<u64> for Metadatum {
    fn from(n: u64) -> Self {
        Self::Int(i128::from(n))
    }
}

impl ToCbor for Metadatum {
    fn to_cbor(&self, cfg: &CodecConfig) -> Result<Value, CodecError> {
        Ok(match self {
            Self::Int(n) => Value::Integer(
                Integer::try_from(*n)
                    .map_err(|_| CodecError::IntegerOutOfRange { context: "metadatum" })?,
            ),
            Self::Bytes(b) => Value::Bytes(b.clone()),
            Self::Text(s) => Value::Text(s.clone()),
            Self::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| item.to_cbor(cfg))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Map(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.to_cbor(cfg)?, v.to_cbor(cfg)?)))
                    .collect::<Result<_, CodecError>>()?,
            ),
        })
    }
}

impl FromCbor for Metadatum {
    fn from_cbor(value: Value, cfg: &CodecConfig) -> Result<Self, CodecError> {
        Ok(match value {
            Value::Integer(i) => Self::Int(i128::from(i)),
            Value::Bytes(b) => Self::Bytes(b),
            Value::Text(s) => Self::Text(s),
            Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(|item| Self::from_cbor(item, cfg))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Map(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((Self::from_cbor(k, cfg)?, Self::from_cbor(v, cfg)?)))
                    .collect::<Result<_, CodecError>>()?,
            ),
            _ => {
                return Err(CodecError::UnexpectedType {
                    context: "metadatum",
                    expected: "int, bytes, text, list or map",
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};

    #[test]
    fn negative_and_wide_integers() {
        assert_eq!(encode(&Metadatum::Int(-1)).unwrap(), vec![0x20]);
        let min = Metadatum::Int(-(1i128 << 64));
        let bytes = encode(&min).unwrap();
        assert_eq!(bytes[0], 0x3b);
        assert_eq!(decode::<Metadatum>(&bytes).unwrap(), min);
    }

    #[test]
    fn integers_beyond_cbor_range_fail() {
        assert!(matches!(
            encode(&Metadatum::Int(1i128 << 64)),
            Err(CodecError::IntegerOutOfRange { .. })
        ));
    }

    #[test]
    fn cip20_envelope_encoding() {
        let envelope = Metadatum::Map(vec![(
            "msg".into(),
            Metadatum::List(vec!["hi".into()]),
        )]);
        assert_eq!(hex::encode(encode(&envelope).unwrap()), "a1636d736781626869");
        assert_eq!(envelope.get("msg").and_then(Metadatum::as_list).map(|l| l.len()), Some(1));
    }

    #[test]
    fn map_equality_ignores_entry_order() {
        let wire_order = Metadatum::Map(vec![("b".into(), 1u64.into()), ("a".into(), 2u64.into())]);
        let decoded = decode::<Metadatum>(&encode(&wire_order).unwrap()).unwrap();
        match &decoded {
            Metadatum::Map(entries) => assert_eq!(entries[0].0, Metadatum::text("a")),
            other => panic!("expected a map, got {other:?}"),
        }
        assert_eq!(decoded, wire_order);

        let different = Metadatum::Map(vec![("b".into(), 2u64.into()), ("a".into(), 1u64.into())]);
        assert_ne!(decoded, different);
    }

    #[test]
    fn floats_are_not_metadata() {
        // 0xf9 3c00 is half-precision 1.0
        assert!(matches!(
            decode::<Metadatum>(&[0xf9, 0x3c, 0x00]),
            Err(CodecError::UnexpectedType { .. })
        ));
    }
}
