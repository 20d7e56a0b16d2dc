//! Greedy input selection.
//!
//! Candidates are taken smallest first, ties in their original order, until
//! the running total exceeds the target. Small outputs get consolidated
//! along the way; no attempt is made to minimise input count or change.

use tracing::debug;

use super::types::TxInput;
use super::TxError;

/// Select inputs covering `target` lovelace.
///
/// Stops at the first input that takes the total strictly above `target`.
/// If the candidates run out first, a total exactly equal to `target` is
/// still accepted; anything less fails with the exact shortfall.
pub fn select_greedy(candidates: &[TxInput], target: u64) -> Result<Vec<TxInput>, TxError> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by_key(|input| input.amount);

    let mut selected = Vec::new();
    let mut total: u128 = 0;
    for input in sorted {
        total += u128::from(input.amount);
        selected.push(input);
        if total > u128::from(target) {
            break;
        }
    }

    if total < u128::from(target) {
        // total < target <= u64::MAX, so the difference fits.
        let shortfall = (u128::from(target) - total) as u64;
        return Err(TxError::InsufficientFunds { shortfall });
    }

    debug!(
        selected = selected.len(),
        available = candidates.len(),
        total = %total,
        target,
        "selected inputs"
    );
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(tag: u8, amount: u64) -> TxInput {
        TxInput::new([tag; 32], 0, amount)
    }

    fn tags(inputs: &[TxInput]) -> Vec<u8> {
        inputs.iter().map(|i| i.tx_hash[0]).collect()
    }

    #[test]
    fn takes_smallest_first_until_target_exceeded() {
        let candidates = [input(1, 50), input(2, 10), input(3, 30), input(4, 20)];
        let selected = select_greedy(&candidates, 35).unwrap();
        // 10 + 20 = 30, + 30 = 60 > 35
        assert_eq!(tags(&selected), vec![2, 4, 3]);
    }

    #[test]
    fn equal_amounts_keep_candidate_order() {
        let candidates = [input(1, 10), input(2, 10), input(3, 10)];
        let selected = select_greedy(&candidates, 15).unwrap();
        assert_eq!(tags(&selected), vec![1, 2]);
    }

    #[test]
    fn exact_total_is_accepted_when_exhausted() {
        let candidates = [input(1, 10), input(2, 20)];
        let selected = select_greedy(&candidates, 30).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn shortfall_is_exact() {
        let candidates = [input(1, 10), input(2, 20)];
        assert!(matches!(
            select_greedy(&candidates, 100),
            Err(TxError::InsufficientFunds { shortfall: 70 })
        ));
        assert!(matches!(
            select_greedy(&[], 5),
            Err(TxError::InsufficientFunds { shortfall: 5 })
        ));
    }
}
