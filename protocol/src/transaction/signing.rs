//! Witness creation and checking.
//!
//! The signed message is the 32-byte body hash itself. Ed25519 applies its
//! own internal hashing; nothing else is layered on top.

use super::types::{Tx, TxHash, VKeyWitness, WitnessSet};
use super::TxError;
use crate::crypto::keys::{PaymentKeypair, Signature, VerificationKey};

/// One witness per key over `hash`, in key order.
pub fn sign_hash(hash: &TxHash, keys: &[PaymentKeypair]) -> WitnessSet {
    let vkey_witnesses = keys
        .iter()
        .map(|key| {
            VKeyWitness::new(
                *key.verification_key().as_bytes(),
                *key.sign(hash).as_bytes(),
            )
        })
        .collect();
    WitnessSet { vkey_witnesses }
}

/// Check every witness against the transaction's body hash.
///
/// Uses the body as it stands; call this on finalized transactions.
pub fn verify_witnesses(tx: &Tx) -> Result<(), TxError> {
    if tx.witness_set.is_empty() {
        return Err(TxError::Signing("transaction carries no witnesses".into()));
    }
    let hash = tx.body_hash()?;
    for (position, witness) in tx.witness_set.vkey_witnesses.iter().enumerate() {
        let vkey = VerificationKey::try_from_slice(&witness.vkey)
            .map_err(|e| TxError::Signing(format!("witness {position}: {e}")))?;
        if !vkey.verify(&hash, &Signature::from_bytes(witness.signature)) {
            return Err(TxError::Signing(format!(
                "witness {position} does not verify for key {}",
                vkey.to_hex()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::types::TxInput;

    fn sample_tx() -> Tx {
        let mut tx = Tx::new();
        tx.body.inputs.push(TxInput::new([1u8; 32], 0, 10));
        tx.body.fee = 5;
        tx
    }

    #[test]
    fn witnesses_follow_key_order() {
        let keys = [
            PaymentKeypair::from_seed(&[1u8; 32]),
            PaymentKeypair::from_seed(&[2u8; 32]),
        ];
        let set = sign_hash(&[9u8; 32], &keys);
        assert_eq!(set.vkey_witnesses.len(), 2);
        assert_eq!(
            &set.vkey_witnesses[0].vkey,
            keys[0].verification_key().as_bytes()
        );
        assert_eq!(
            &set.vkey_witnesses[1].vkey,
            keys[1].verification_key().as_bytes()
        );
    }

    #[test]
    fn signed_transaction_verifies() {
        let mut tx = sample_tx();
        let hash = tx.hash().unwrap();
        tx.witness_set = sign_hash(&hash, &[PaymentKeypair::generate()]);
        verify_witnesses(&tx).unwrap();
    }

    #[test]
    fn tampered_body_fails_verification() {
        let mut tx = sample_tx();
        let hash = tx.hash().unwrap();
        tx.witness_set = sign_hash(&hash, &[PaymentKeypair::generate()]);
        tx.body.fee += 1;
        assert!(matches!(verify_witnesses(&tx), Err(TxError::Signing(_))));
    }

    #[test]
    fn placeholders_do_not_verify() {
        let mut tx = sample_tx();
        tx.witness_set = WitnessSet::placeholders(1);
        assert!(verify_witnesses(&tx).is_err());
    }

    #[test]
    fn unsigned_transaction_is_rejected() {
        assert!(matches!(
            verify_witnesses(&sample_tx()),
            Err(TxError::Signing(_))
        ));
    }
}
