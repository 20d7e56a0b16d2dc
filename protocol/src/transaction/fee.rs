//! Linear fee rule.
//!
//! `fee = min_fee_coefficient * size + min_fee_constant + fee_margin`, where
//! `size` is the length of the fully encoded transaction, witnesses included.

use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MIN_FEE_COEFFICIENT, DEFAULT_MIN_FEE_CONSTANT};

/// The protocol parameters the builder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParams {
    /// Lovelace per encoded byte (`min_fee_a`).
    pub min_fee_coefficient: u64,
    /// Fixed lovelace per transaction (`min_fee_b`).
    pub min_fee_constant: u64,
    /// Extra lovelace added on top of the ledger minimum.
    #[serde(default)]
    pub fee_margin: u64,
}

impl ProtocolParams {
    pub fn new(min_fee_coefficient: u64, min_fee_constant: u64) -> Self {
        Self {
            min_fee_coefficient,
            min_fee_constant,
            fee_margin: 0,
        }
    }
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FEE_COEFFICIENT, DEFAULT_MIN_FEE_CONSTANT)
    }
}

/// Fee owed by a transaction whose encoding is `encoded_len` bytes long.
pub fn fee_at_size(params: &ProtocolParams, encoded_len: usize) -> u64 {
    params
        .min_fee_coefficient
        .saturating_mul(encoded_len as u64)
        .saturating_add(params.min_fee_constant)
        .saturating_add(params.fee_margin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_defaults() {
        let params = ProtocolParams::default();
        assert_eq!(fee_at_size(&params, 0), 155_381);
        assert_eq!(fee_at_size(&params, 250), 44 * 250 + 155_381);
    }

    #[test]
    fn margin_is_added_once() {
        let params = ProtocolParams {
            fee_margin: 1_000,
            ..ProtocolParams::new(1, 10)
        };
        assert_eq!(fee_at_size(&params, 5), 5 + 10 + 1_000);
    }

    #[test]
    fn params_deserialize_without_margin() {
        let params: ProtocolParams =
            serde_json::from_str(r#"{"min_fee_coefficient":44,"min_fee_constant":155381}"#)
                .unwrap();
        assert_eq!(params, ProtocolParams::default());
    }
}
