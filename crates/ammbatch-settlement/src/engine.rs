//! The liquidity engine: pools, escrow, and the two batch hooks.
//!
//! ```text
//! create_pool / submit_*  → validate → enqueue → escrow hold
//! end_block(h)            → execute every open batch (atomic across pools)
//! begin_block(h)          → drop executed requests, open the next batches
//! ```
//!
//! Both hooks work on a staged copy of the state and commit only when every
//! pool succeeded and escrow still matches the pending requests.

use std::collections::BTreeMap;

use ammbatch_ingress::{
    RequestValidator, enqueue_deposit, enqueue_swap, enqueue_withdraw, order_expiry_height,
};
use ammbatch_types::{
    Account, AccountId, AmmbatchError, BatchMsg, Coin, DepositRequest, Height, MsgIndex, Pool,
    PoolId, PoolParams, PoolRecord, Reserves, Result, SettlementEvent, SwapRequest, Transfer,
    WithdrawRequest, alphabetical_denom_pair, constants,
};
use tracing::{error, info};

use crate::escrow::EscrowLedger;
use crate::executor::execute_pool_batch;
use crate::idempotency::BatchGuard;
use crate::snapshot::EngineSnapshot;
use crate::transact::refund_swap;

/// A queued request and the transfers moving its coins into escrow.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub pool_id: PoolId,
    pub msg_index: MsgIndex,
    pub transfers: Vec<Transfer>,
}

/// Everything `end_block` settled.
#[derive(Debug, Clone, Default)]
pub struct BlockOutcome {
    pub transfers: Vec<Transfer>,
    pub events: Vec<SettlementEvent>,
}

/// Batch-based AMM engine over any number of pools.
#[derive(Debug, Clone)]
pub struct LiquidityEngine {
    validator: RequestValidator,
    pools: BTreeMap<PoolId, PoolRecord>,
    escrow: EscrowLedger,
    guard: BatchGuard,
}

impl LiquidityEngine {
    /// # Errors
    /// [`AmmbatchError::Configuration`] for out-of-range parameters.
    pub fn new(params: PoolParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            validator: RequestValidator::new(params),
            pools: BTreeMap::new(),
            escrow: EscrowLedger::new(),
            guard: BatchGuard::new(constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE),
        })
    }

    #[must_use]
    pub fn params(&self) -> &PoolParams {
        self.validator.params()
    }

    #[must_use]
    pub fn pool(&self, id: PoolId) -> Option<&PoolRecord> {
        self.pools.get(&id)
    }

    /// Pool records ordered by id.
    pub fn pools(&self) -> impl Iterator<Item = &PoolRecord> {
        self.pools.values()
    }

    /// Pool over the `a`/`b` pair, in either order.
    #[must_use]
    pub fn find_pool(&self, a: &str, b: &str) -> Option<&PoolRecord> {
        let (x, y) = alphabetical_denom_pair(a, b);
        self.pools
            .values()
            .find(|r| r.pool.denom_x() == x && r.pool.denom_y() == y)
    }

    #[must_use]
    pub fn escrow(&self) -> &EscrowLedger {
        &self.escrow
    }

    /// Create a pool funded by `creator` with `a` and `b`.
    ///
    /// The new pool takes the next free id and mints the initial pool coin
    /// amount to the creator.
    ///
    /// # Errors
    /// Any admission error from [`RequestValidator::validate_create_pool`],
    /// or [`AmmbatchError::PoolAlreadyExists`] for a known pair.
    pub fn create_pool(
        &mut self,
        creator: AccountId,
        a: Coin,
        b: Coin,
    ) -> Result<(PoolId, Vec<Transfer>)> {
        self.validator.validate_create_pool(&a, &b)?;
        if let Some(existing) = self.find_pool(&a.denom, &b.denom) {
            return Err(AmmbatchError::PoolAlreadyExists {
                denom_x: existing.pool.denom_x().to_string(),
                denom_y: existing.pool.denom_y().to_string(),
            });
        }

        let id = self
            .pools
            .keys()
            .next_back()
            .map_or(PoolId(1), |last| last.next());
        let pool = Pool::new(id, &a.denom, &b.denom)?;
        let (x, y) = if a.denom == pool.denom_x() { (&a, &b) } else { (&b, &a) };
        let minted = self.params().init_pool_coin_mint_amount;
        let record = PoolRecord::new(pool, Reserves::new(x.amount, y.amount), minted);

        let user = Account::User(creator);
        let reserve = Account::Reserve(id);
        let transfers = vec![
            Transfer::new(user, reserve, x.clone()),
            Transfer::new(user, reserve, y.clone()),
            Transfer::mint(user, Coin::new(record.pool.pool_coin_denom.clone(), minted)),
        ];
        info!(
            pool_id = %id,
            x = %x,
            y = %y,
            pool_coin = %record.pool.pool_coin_denom,
            "pool created"
        );
        self.pools.insert(id, record);
        Ok((id, transfers))
    }

    fn hold(
        &mut self,
        user: AccountId,
        pool_id: PoolId,
        msg_index: MsgIndex,
        coins: Vec<Coin>,
    ) -> Receipt {
        let transfers: Vec<Transfer> = coins
            .into_iter()
            .filter(Coin::is_positive)
            .map(|c| Transfer::new(Account::User(user), Account::Escrow, c))
            .collect();
        for t in &transfers {
            self.escrow.hold(&t.coin);
        }
        Receipt {
            pool_id,
            msg_index,
            transfers,
        }
    }

    /// Queue a swap at `height`, expiring `order_expiry_span` heights later
    /// (zero: at the end of the current batch).
    ///
    /// # Errors
    /// [`AmmbatchError::PoolNotFound`] or any admission error from
    /// [`RequestValidator::validate_swap`].
    pub fn submit_swap(
        &mut self,
        request: SwapRequest,
        height: Height,
        order_expiry_span: u64,
    ) -> Result<Receipt> {
        let unit = self.params().unit_batch_height;
        let record = self
            .pools
            .get_mut(&request.pool_id)
            .ok_or(AmmbatchError::PoolNotFound(request.pool_id))?;
        self.validator.validate_swap(record, &request)?;
        let (user, pool_id) = (request.requester, request.pool_id);
        let expiry = order_expiry_height(height, order_expiry_span, unit);
        let queued = enqueue_swap(record, request, height, expiry);
        Ok(self.hold(user, pool_id, queued.msg_index, queued.escrow))
    }

    /// Queue a deposit at `height`.
    ///
    /// # Errors
    /// [`AmmbatchError::PoolNotFound`] or any admission error from
    /// [`RequestValidator::validate_deposit`].
    pub fn submit_deposit(&mut self, request: DepositRequest, height: Height) -> Result<Receipt> {
        let record = self
            .pools
            .get_mut(&request.pool_id)
            .ok_or(AmmbatchError::PoolNotFound(request.pool_id))?;
        self.validator.validate_deposit(record, &request)?;
        let (user, pool_id) = (request.depositor, request.pool_id);
        let queued = enqueue_deposit(record, request, height);
        Ok(self.hold(user, pool_id, queued.msg_index, queued.escrow))
    }

    /// Queue a withdrawal at `height`.
    ///
    /// # Errors
    /// [`AmmbatchError::PoolNotFound`] or any admission error from
    /// [`RequestValidator::validate_withdraw`].
    pub fn submit_withdraw(&mut self, request: WithdrawRequest, height: Height) -> Result<Receipt> {
        let record = self
            .pools
            .get_mut(&request.pool_id)
            .ok_or(AmmbatchError::PoolNotFound(request.pool_id))?;
        self.validator.validate_withdraw(record, &request)?;
        let (user, pool_id) = (request.withdrawer, request.pool_id);
        let queued = enqueue_withdraw(record, request, height);
        Ok(self.hold(user, pool_id, queued.msg_index, queued.escrow))
    }

    /// Close and execute every open batch when `height` ends a batch period.
    ///
    /// # Errors
    /// Fatal errors, or an arithmetic overflow while matching. On error no
    /// pool, escrow, or guard state changes.
    pub fn end_block(&mut self, height: Height) -> Result<BlockOutcome> {
        if height % self.params().unit_batch_height != 0 {
            return Ok(BlockOutcome::default());
        }

        let mut pools = self.pools.clone();
        let mut escrow = self.escrow.clone();
        let mut guard = self.guard.clone();
        let mut outcome = BlockOutcome::default();

        let staged = (|| -> Result<()> {
            for record in pools.values_mut() {
                if record.batch.executed {
                    continue;
                }
                let (pool_id, batch_index) = (record.id(), record.batch.index);
                guard.check(pool_id, batch_index)?;
                let Some(exec) = execute_pool_batch(record, &self.validator, height)? else {
                    continue;
                };
                escrow.apply(&exec.transfers)?;
                guard.mark_settled(pool_id, batch_index)?;
                outcome.transfers.extend(exec.transfers);
                outcome.events.push(exec.event);
            }
            escrow.verify(pools.values())
        })();
        if let Err(err) = staged {
            error!(height, error = %err, "end_block aborted, state unchanged");
            return Err(err);
        }

        self.pools = pools;
        self.escrow = escrow;
        self.guard = guard;
        Ok(outcome)
    }

    /// Drop executed requests and open the next batch of every pool whose
    /// batch was executed.
    ///
    /// Swaps past their expiry are refunded. Carried swaps are reset to be
    /// matched again.
    ///
    /// # Errors
    /// Fatal errors only. On error no state changes.
    pub fn begin_block(&mut self, height: Height) -> Result<Vec<Transfer>> {
        let mut pools = self.pools.clone();
        let mut escrow = self.escrow.clone();
        let mut transfers = Vec::new();

        for record in pools.values_mut().filter(|r| r.batch.executed) {
            record.deposit_msgs.retain(|m| !m.to_be_deleted);
            for m in &mut record.deposit_msgs {
                m.executed = false;
                m.succeeded = false;
            }
            record.withdraw_msgs.retain(|m| !m.to_be_deleted);
            for m in &mut record.withdraw_msgs {
                m.executed = false;
                m.succeeded = false;
            }
            for m in record.swap_msgs.iter_mut().filter(|m| !m.to_be_deleted) {
                if height > m.order_expiry_height {
                    m.to_be_deleted = true;
                    transfers.extend(refund_swap(m));
                } else {
                    m.executed = false;
                    m.succeeded = false;
                }
            }
            record.swap_msgs.retain(|m| !m.to_be_deleted);

            let batch = &mut record.batch;
            batch.deposit_msg_index = next_index(&record.deposit_msgs);
            batch.withdraw_msg_index = next_index(&record.withdraw_msgs);
            batch.swap_msg_index = next_index(&record.swap_msgs);
            batch.index = batch.index.next();
            batch.begin_height = height;
            batch.executed = false;
            info!(
                pool_id = %record.pool.id,
                batch_index = %batch.index,
                carried_swaps = record.swap_msgs.len(),
                "batch opened"
            );
        }

        let staged = escrow
            .apply(&transfers)
            .and_then(|()| escrow.verify(pools.values()));
        if let Err(err) = staged {
            error!(height, error = %err, "begin_block aborted, state unchanged");
            return Err(err);
        }
        self.pools = pools;
        self.escrow = escrow;
        Ok(transfers)
    }

    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            params: self.params().clone(),
            pools: self.pools.values().cloned().collect(),
        }
    }

    /// Serialize the full engine state to JSON.
    pub fn export_state(&self) -> Result<String> {
        self.snapshot().to_json()
    }

    /// Rebuild an engine from [`LiquidityEngine::export_state`] output.
    ///
    /// # Errors
    /// [`AmmbatchError::Serialization`] for malformed JSON, or any
    /// validation error of the snapshot.
    pub fn import_state(json: &str) -> Result<Self> {
        Self::from_snapshot(EngineSnapshot::from_json(json)?)
    }

    pub fn from_snapshot(snapshot: EngineSnapshot) -> Result<Self> {
        snapshot.validate()?;
        let pools: BTreeMap<PoolId, PoolRecord> =
            snapshot.pools.into_iter().map(|r| (r.id(), r)).collect();
        let escrow = EscrowLedger::rebuild(pools.values());
        Ok(Self {
            validator: RequestValidator::new(snapshot.params),
            pools,
            escrow,
            guard: BatchGuard::new(constants::SETTLEMENT_IDEMPOTENCY_CACHE_SIZE),
        })
    }
}

fn next_index<M: BatchMsg>(msgs: &[M]) -> MsgIndex {
    msgs.last().map_or(MsgIndex::first(), |m| m.msg_index().next())
}
