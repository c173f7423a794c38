//! Determinism verification utilities for cross-replica consistency.
//!
//! Every replica executing the same pool batch must produce the exact same
//! match results. The `match_root` is a hash over all of them that enables
//! quick verification without comparing full payloads.

use ammbatch_types::{AmmbatchError, BatchIndex, MatchResult, PoolId, Result};
use sha2::{Digest, Sha256};

/// Compute the match root hash over one batch's match results.
///
/// The hash depends on:
/// - The pool and batch index
/// - Request indices and directions (in order)
/// - Every amount of each match
///
/// The same matches in the same order always produce the same root.
#[must_use]
pub fn compute_match_root(
    pool_id: PoolId,
    batch_index: BatchIndex,
    matches: &[MatchResult],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"ammbatch:match_root:v1:");
    hasher.update(pool_id.0.to_le_bytes());
    hasher.update(batch_index.0.to_le_bytes());
    hasher.update((matches.len() as u64).to_le_bytes());

    for m in matches {
        hasher.update(m.msg_index.0.to_le_bytes());
        hasher.update(m.direction.to_string().as_bytes());
        // Normalized so that 1.10 and 1.1 hash identically.
        for amount in [
            m.order_price,
            m.offer_amount,
            m.transacted_amount,
            m.exchanged_demand_amount,
            m.offer_fee_amount,
            m.exchanged_fee_amount,
        ] {
            hasher.update(amount.normalize().to_string().as_bytes());
            hasher.update(b"|");
        }
    }

    let result = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&result);
    root
}

/// Verify that a given match root matches the expected hash.
#[must_use]
pub fn verify_match_root(
    pool_id: PoolId,
    batch_index: BatchIndex,
    matches: &[MatchResult],
    expected_root: &[u8; 32],
) -> bool {
    compute_match_root(pool_id, batch_index, matches) == *expected_root
}

/// [`verify_match_root`] against a hex-encoded root, as a
/// [`AmmbatchError::DeterminismViolation`] on mismatch.
pub fn ensure_match_root(
    pool_id: PoolId,
    batch_index: BatchIndex,
    matches: &[MatchResult],
    expected_hex: &str,
) -> Result<()> {
    let actual = hex::encode(compute_match_root(pool_id, batch_index, matches));
    if actual != expected_hex {
        return Err(AmmbatchError::DeterminismViolation {
            expected: expected_hex.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use ammbatch_types::{MsgIndex, OrderDirection};
    use rust_decimal::Decimal;

    use super::*;

    fn make_match(index: u64) -> MatchResult {
        MatchResult {
            direction: OrderDirection::XtoY,
            msg_index: MsgIndex(index),
            order_price: Decimal::new(11, 1),
            offer_amount: Decimal::new(10_000, 0),
            transacted_amount: Decimal::new(10_000, 0),
            exchanged_demand_amount: Decimal::new(9_433, 0),
            offer_fee_amount: Decimal::new(15, 0),
            exchanged_fee_amount: Decimal::new(14, 0),
        }
    }

    #[test]
    fn empty_matches_deterministic() {
        let root1 = compute_match_root(PoolId(1), BatchIndex(1), &[]);
        let root2 = compute_match_root(PoolId(1), BatchIndex(1), &[]);
        assert_eq!(root1, root2);
    }

    #[test]
    fn batch_identity_changes_root() {
        let root_a = compute_match_root(PoolId(1), BatchIndex(1), &[]);
        let root_b = compute_match_root(PoolId(1), BatchIndex(2), &[]);
        let root_c = compute_match_root(PoolId(2), BatchIndex(1), &[]);
        assert_ne!(root_a, root_b);
        assert_ne!(root_a, root_c);
    }

    #[test]
    fn order_matters() {
        let m1 = make_match(1);
        let m2 = make_match(2);
        let root_ab = compute_match_root(PoolId(1), BatchIndex(1), &[m1.clone(), m2.clone()]);
        let root_ba = compute_match_root(PoolId(1), BatchIndex(1), &[m2, m1]);
        assert_ne!(root_ab, root_ba, "Order of matches must affect root hash");
    }

    #[test]
    fn scale_does_not_matter() {
        let a = make_match(1);
        let mut b = a.clone();
        b.order_price = "1.10".parse().unwrap();
        assert_eq!(
            compute_match_root(PoolId(1), BatchIndex(1), &[a]),
            compute_match_root(PoolId(1), BatchIndex(1), &[b])
        );
    }

    #[test]
    fn verify_correct_and_wrong_root() {
        let matches = vec![make_match(1), make_match(2)];
        let root = compute_match_root(PoolId(1), BatchIndex(3), &matches);
        assert!(verify_match_root(PoolId(1), BatchIndex(3), &matches, &root));
        assert!(!verify_match_root(PoolId(1), BatchIndex(3), &matches, &[0xAB; 32]));
    }

    #[test]
    fn ensure_reports_determinism_violation() {
        let matches = vec![make_match(1)];
        let hex_root = hex::encode(compute_match_root(PoolId(1), BatchIndex(1), &matches));
        ensure_match_root(PoolId(1), BatchIndex(1), &matches, &hex_root).unwrap();

        let err = ensure_match_root(PoolId(1), BatchIndex(1), &matches, "00").unwrap_err();
        assert!(matches!(err, AmmbatchError::DeterminismViolation { .. }));
        assert!(err.is_fatal());
    }
}
