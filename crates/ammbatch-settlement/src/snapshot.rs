//! Engine state export and import.
//!
//! The snapshot holds the parameters and every pool record, ordered by pool
//! id. Escrow balances and the settled-batch guard are not stored: escrow is
//! rebuilt from the pending requests on import.

use std::collections::HashSet;

use ammbatch_types::{AmmbatchError, PoolId, PoolParams, PoolRecord, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub params: PoolParams,
    pub pools: Vec<PoolRecord>,
}

impl EngineSnapshot {
    /// Structural checks: valid parameters, valid records, strictly
    /// increasing pool ids, one pool per reserve pair.
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        let mut last: Option<PoolId> = None;
        let mut pairs = HashSet::with_capacity(self.pools.len());
        for record in &self.pools {
            record.validate()?;
            let id = record.id();
            if last.is_some_and(|prev| id <= prev) {
                return Err(AmmbatchError::InvalidPoolRecord {
                    reason: format!("{id} out of order or duplicated"),
                });
            }
            if !pairs.insert(record.pool.reserve_denoms.clone()) {
                return Err(AmmbatchError::InvalidPoolRecord {
                    reason: format!(
                        "{id} duplicates pair {}/{}",
                        record.pool.denom_x(),
                        record.pool.denom_y()
                    ),
                });
            }
            last = Some(id);
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        self.validate()?;
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use ammbatch_types::{MsgIndex, OrderDirection, Pool, Reserves, SwapMsgState};
    use rust_decimal::Decimal;

    use super::*;

    fn record(id: u64) -> PoolRecord {
        PoolRecord::new(
            Pool::dummy(id),
            Reserves::new(Decimal::new(1_000, 0), Decimal::new(1_000, 0)),
            Decimal::new(1_000, 0),
        )
    }

    #[test]
    fn json_roundtrip_with_queued_swap() {
        let mut rec = record(1);
        rec.swap_msgs
            .push(SwapMsgState::dummy(1, OrderDirection::XtoY, Decimal::ONE, Decimal::new(500, 0)));
        rec.batch.swap_msg_index = MsgIndex(2);
        let snapshot = EngineSnapshot {
            params: PoolParams::default(),
            pools: vec![rec],
        };
        let json = snapshot.to_json().unwrap();
        let back = EngineSnapshot::from_json(&json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.to_json().unwrap(), json);
    }

    #[test]
    fn unordered_pools_rejected() {
        let mut second = record(2);
        second.pool = Pool::new(second.id(), "denomA", "denomB").unwrap();
        let snapshot = EngineSnapshot {
            params: PoolParams::default(),
            pools: vec![second, record(1)],
        };
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn duplicate_pair_rejected() {
        let snapshot = EngineSnapshot {
            params: PoolParams::default(),
            pools: vec![record(1), record(2)],
        };
        let err = snapshot.validate().unwrap_err();
        assert!(err.to_string().contains("duplicates pair"), "Got: {err}");
    }

    #[test]
    fn broken_counter_rejected_on_import() {
        let mut rec = record(1);
        rec.batch.swap_msg_index = MsgIndex(5);
        let snapshot = EngineSnapshot {
            params: PoolParams::default(),
            pools: vec![rec],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(EngineSnapshot::from_json(&json).is_err());
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = EngineSnapshot::from_json("{ not json").unwrap_err();
        assert!(matches!(err, AmmbatchError::Serialization(_)));
    }
}
