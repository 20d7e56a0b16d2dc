//! CIP-20 transaction messages.
//!
//! A memo lives under metadata label 674 as `{"msg": [chunk, ...]}`. Each
//! chunk is a metadata text string and therefore at most 64 bytes, so longer
//! messages are split. Splits fall on UTF-8 character boundaries, which keeps
//! every chunk a valid string on its own.

use super::types::Metadata;
use super::TxError;
use crate::codec::{CodecError, Metadatum};
use crate::config::{MEMO_CHUNK_BYTES, MEMO_KEY, MEMO_LABEL};

/// Split `text` into chunks of at most 64 bytes, in order.
pub fn chunk_memo(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let mut end = rest.len().min(MEMO_CHUNK_BYTES);
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk.to_string());
        rest = tail;
    }
    chunks
}

/// The label-674 envelope for already-chunked text.
pub fn memo_envelope(chunks: &[String]) -> Result<Metadatum, TxError> {
    if let Some(long) = chunks.iter().find(|c| c.len() > MEMO_CHUNK_BYTES) {
        return Err(TxError::MemoTooLong { length: long.len() });
    }
    Ok(Metadatum::Map(vec![(
        Metadatum::text(MEMO_KEY),
        Metadatum::List(chunks.iter().map(|c| Metadatum::text(c.as_str())).collect()),
    )]))
}

/// Reassemble the memo carried by `metadata`, if any.
///
/// Returns `Ok(None)` when label 674 is absent. An envelope that does not
/// have the `{"msg": [text, ...]}` shape is an encoding error.
pub fn decode_memo(metadata: &Metadata) -> Result<Option<String>, TxError> {
    let Some(envelope) = metadata.get(&MEMO_LABEL) else {
        return Ok(None);
    };
    let malformed = |expected| {
        TxError::Encoding(CodecError::UnexpectedType {
            context: "memo envelope",
            expected,
        })
    };

    let chunks = envelope
        .get(MEMO_KEY)
        .ok_or_else(|| malformed("map with a \"msg\" key"))?
        .as_list()
        .ok_or_else(|| malformed("list of messages"))?;

    chunks
        .iter()
        .map(|chunk| chunk.as_text().ok_or_else(|| malformed("text message")))
        .collect::<Result<String, _>>()
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_memo_splits_at_64_bytes() {
        let memo = "a".repeat(130);
        let lengths: Vec<usize> = chunk_memo(&memo).iter().map(String::len).collect();
        assert_eq!(lengths, vec![64, 64, 2]);
    }

    #[test]
    fn multibyte_characters_are_not_split() {
        // 63 ASCII bytes then a 3-byte character straddling the boundary.
        let memo = format!("{}€tail", "x".repeat(63));
        let chunks = chunk_memo(&memo);
        assert_eq!(chunks[0].len(), 63);
        assert_eq!(chunks[1], "€tail");
        assert_eq!(chunks.concat(), memo);
    }

    #[test]
    fn empty_memo_has_no_chunks() {
        assert!(chunk_memo("").is_empty());
    }

    #[test]
    fn oversized_chunk_is_rejected() {
        let chunks = vec!["ok".to_string(), "b".repeat(65)];
        assert!(matches!(
            memo_envelope(&chunks),
            Err(TxError::MemoTooLong { length: 65 })
        ));
    }

    #[test]
    fn decode_reassembles_chunks() {
        let text = "hello ".repeat(30);
        let mut metadata = Metadata::new();
        metadata.insert(MEMO_LABEL, memo_envelope(&chunk_memo(&text)).unwrap());
        assert_eq!(decode_memo(&metadata).unwrap(), Some(text));
    }

    #[test]
    fn missing_label_is_none() {
        let mut metadata = Metadata::new();
        assert_eq!(decode_memo(&metadata).unwrap(), None);
        metadata.insert(1, Metadatum::text("unrelated"));
        assert_eq!(decode_memo(&metadata).unwrap(), None);
    }

    #[test]
    fn malformed_envelope_is_an_encoding_error() {
        let mut metadata = Metadata::new();
        metadata.insert(MEMO_LABEL, Metadatum::text("not an envelope"));
        assert!(matches!(decode_memo(&metadata), Err(TxError::Encoding(_))));

        metadata.insert(
            MEMO_LABEL,
            Metadatum::Map(vec![(
                Metadatum::text("msg"),
                Metadatum::List(vec![Metadatum::Int(1)]),
            )]),
        );
        assert!(matches!(decode_memo(&metadata), Err(TxError::Encoding(_))));
    }
}
