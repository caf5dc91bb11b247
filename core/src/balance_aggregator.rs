//! Per-user point balances, recomputed from the ledger.
//!
//! Stateless: every run rebuilds each row from `points_ledger` alone.
//! `updated_at` is the user's latest ledger timestamp rather than the
//! wall clock, so an unchanged ledger always yields identical rows.

use crate::{
    error::SeedResult,
    ledger_simulator::LedgerEntry,
    store::SeedStore,
    types::UserId,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBalance {
    pub user_id: UserId,
    pub current_balance: i64,
    pub total_earned: i64,
    pub total_spent: i64,
    pub updated_at: NaiveDateTime,
}

const AGGREGATE_SQL: &str = "
    INSERT INTO points (user_id, current_balance, total_earned, total_spent, updated_at)
    SELECT
        user_id,
        SUM(delta),
        SUM(CASE WHEN delta > 0 THEN delta ELSE 0 END),
        SUM(CASE WHEN delta < 0 THEN -delta ELSE 0 END),
        MAX(created_at)
    FROM points_ledger
    WHERE true
    GROUP BY user_id
    ON CONFLICT (user_id) DO UPDATE SET
        current_balance = excluded.current_balance,
        total_earned    = excluded.total_earned,
        total_spent     = excluded.total_spent,
        updated_at      = excluded.updated_at";

const PRUNE_SQL: &str = "
    DELETE FROM points
    WHERE user_id NOT IN (SELECT DISTINCT user_id FROM points_ledger)";

/// Upsert one balance row per user present in the ledger and drop rows of
/// users the ledger no longer mentions. Returns the number of rows written.
pub fn recompute(store: &SeedStore) -> SeedResult<usize> {
    let tx = store.transaction()?;
    let dropped = tx.execute(PRUNE_SQL, [])?;
    let rows = tx.execute(AGGREGATE_SQL, [])?;
    tx.commit()?;
    if dropped > 0 {
        log::info!("balances: dropped {dropped} balances with no ledger entries");
    }
    log::info!("balances: {rows} user balances recomputed from the ledger");
    Ok(rows)
}

/// The same aggregate computed in memory, ordered by user.
pub fn fold_ledger(entries: &[LedgerEntry]) -> Vec<PointsBalance> {
    let mut by_user: BTreeMap<UserId, PointsBalance> = BTreeMap::new();
    for e in entries {
        let b = by_user.entry(e.user_id).or_insert(PointsBalance {
            user_id: e.user_id,
            current_balance: 0,
            total_earned: 0,
            total_spent: 0,
            updated_at: e.created_at,
        });
        b.current_balance += e.delta;
        if e.delta > 0 {
            b.total_earned += e.delta;
        } else {
            b.total_spent -= e.delta;
        }
        b.updated_at = b.updated_at.max(e.created_at);
    }
    by_user.into_values().collect()
}
