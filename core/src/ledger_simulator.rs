//! Loyalty-points ledger simulation.
//!
//! RULES:
//!   - Balances here are simulation values. The store's `points` table is
//!     never read; it is recomputed from the ledger afterwards.
//!   - Stock is one map shared by every user in the run, seeded from the
//!     persisted catalog. A reward with no stock left cannot be chosen,
//!     so total redemptions per reward are capped by its initial stock.
//!   - A user can only redeem a reward whose cost is within the balance
//!     earned so far in generation order.
//!   - Event timestamps are drawn independently of that order; persisted
//!     chronology does not promise earn-before-spend.
//!   - Entries, redemptions and final stock are written in one transaction.

use crate::{
    clock::{timestamp_value, SeedClock},
    config::{active_count, GenerationParams},
    error::{SeedError, SeedResult},
    rng::StreamRng,
    row::{rows_of, Row, TableRow},
    store::{prune_above, set_reward_stock, SeedStore},
    types::{RewardId, RowId, Table, UserId},
    writer::BulkWriter,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const REDEMPTION_STATUS: &str = "completed";

/// A catalog entry as the simulation reads it from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSlot {
    pub id: RewardId,
    pub points_required: i64,
    pub stock: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Earn,
    Spend,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Spend => "spend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Generation order: a lower id was simulated earlier.
    pub id: RowId,
    pub user_id: UserId,
    /// Positive for earn, negative for spend.
    pub delta: i64,
    pub kind: EntryKind,
    pub reason: String,
    pub created_at: NaiveDateTime,
}

impl TableRow for LedgerEntry {
    const TABLE: Table = Table::PointsLedger;
    const COLUMNS: &'static [&'static str] =
        &["id", "user_id", "delta", "type", "reason", "created_at"];

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("user_id", self.user_id)
            .with("delta", self.delta)
            .with("type", self.kind.as_str().to_string())
            .with("reason", self.reason.clone())
            .with("created_at", timestamp_value(&self.created_at))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    pub id: RowId,
    pub user_id: UserId,
    pub reward_id: RewardId,
    /// The reward's points_required when the redemption was simulated.
    pub points_used: i64,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl TableRow for Redemption {
    const TABLE: Table = Table::Redemptions;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "reward_id",
        "points_used",
        "status",
        "created_at",
    ];

    fn to_row(&self) -> Row {
        Row::new()
            .with("id", self.id)
            .with("user_id", self.user_id)
            .with("reward_id", self.reward_id)
            .with("points_used", self.points_used)
            .with("status", self.status.clone())
            .with("created_at", timestamp_value(&self.created_at))
    }
}

/// Everything one simulation pass produced, not yet persisted.
#[derive(Debug, Clone, Default)]
pub struct LedgerPlan {
    pub entries: Vec<LedgerEntry>,
    pub redemptions: Vec<Redemption>,
    pub initial_stock: BTreeMap<RewardId, i64>,
    pub final_stock: BTreeMap<RewardId, i64>,
    pub point_active_users: usize,
}

impl LedgerPlan {
    pub fn redemptions_of(&self, reward_id: RewardId) -> usize {
        self.redemptions
            .iter()
            .filter(|r| r.reward_id == reward_id)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerCounts {
    pub ledger_rows: usize,
    pub redemption_rows: usize,
    pub stock_updates: usize,
    /// Rows from an earlier, larger run that no longer belong to the plan.
    pub pruned_rows: usize,
}

pub struct LedgerSimulator<'a> {
    params: &'a GenerationParams,
    rewards: Vec<RewardSlot>,
    stock: BTreeMap<RewardId, i64>,
    entries: Vec<LedgerEntry>,
    redemptions: Vec<Redemption>,
}

impl<'a> LedgerSimulator<'a> {
    /// Fails with `CatalogMissing` when there is nothing to redeem;
    /// an empty catalog means the catalog step never ran.
    pub fn new(params: &'a GenerationParams, rewards: Vec<RewardSlot>) -> SeedResult<Self> {
        if rewards.is_empty() {
            return Err(SeedError::CatalogMissing);
        }
        let stock = rewards.iter().map(|r| (r.id, r.stock)).collect();
        Ok(Self {
            params,
            rewards,
            stock,
            entries: Vec::new(),
            redemptions: Vec::new(),
        })
    }

    /// The leading share of active users that take part in the programme.
    pub fn point_active<'u>(&self, active_users: &'u [UserId]) -> &'u [UserId] {
        let n = active_count(active_users.len(), self.params.point_active_fraction);
        &active_users[..n]
    }

    /// Simulate every point-active user in order and hand back the plan.
    pub fn run(
        mut self,
        active_users: &[UserId],
        months_back: u32,
        clock: &SeedClock,
        rng: &mut StreamRng,
    ) -> LedgerPlan {
        let initial_stock = self.stock.clone();
        let users = self.point_active(active_users).to_vec();
        for &user_id in &users {
            self.simulate_user(user_id, months_back, clock, rng);
        }
        log::info!(
            "ledger: {} users, {} entries, {} redemptions simulated",
            users.len(),
            self.entries.len(),
            self.redemptions.len()
        );
        LedgerPlan {
            entries: self.entries,
            redemptions: self.redemptions,
            initial_stock,
            final_stock: self.stock,
            point_active_users: users.len(),
        }
    }

    /// Earn across the whole window, then maybe redeem. Returns the user's
    /// simulated balance afterwards.
    pub fn simulate_user(
        &mut self,
        user_id: UserId,
        months_back: u32,
        clock: &SeedClock,
        rng: &mut StreamRng,
    ) -> i64 {
        let p = self.params;
        let mut balance = 0i64;

        for offset in 0..months_back as i64 {
            let (lo, hi) = p.earn_events_per_month;
            for _ in 0..rng.range_inclusive(lo, hi) {
                let points = rng.pick(&p.earn_point_values).copied().unwrap_or(0);
                let reason = rng.pick(&p.earn_reasons).cloned().unwrap_or_default();
                let days_back = 30 * offset + rng.range_inclusive(0, 29);
                self.push_entry(user_id, points, EntryKind::Earn, reason, clock.days_ago(days_back));
                balance += points;
            }
        }

        if rng.chance(p.redemption_probability) {
            let (lo, hi) = p.redemptions_per_user;
            for _ in 0..rng.range_inclusive(lo, hi) {
                let Some(reward) = self.choose_reward(balance, rng) else {
                    continue;
                };
                let when = clock.days_ago(rng.range_inclusive(0, p.redemption_lookback_days));
                balance -= reward.points_required;
                self.redeem(user_id, reward, when);
            }
        }
        balance
    }

    /// Uniform over rewards the balance covers that still have stock.
    fn choose_reward(&self, balance: i64, rng: &mut StreamRng) -> Option<RewardSlot> {
        let affordable: Vec<RewardSlot> = self
            .rewards
            .iter()
            .filter(|r| r.points_required <= balance)
            .filter(|r| self.stock.get(&r.id).copied().unwrap_or(0) > 0)
            .copied()
            .collect();
        rng.pick(&affordable).copied()
    }

    fn redeem(&mut self, user_id: UserId, reward: RewardSlot, when: NaiveDateTime) {
        if let Some(left) = self.stock.get_mut(&reward.id) {
            *left -= 1;
        }
        self.push_entry(
            user_id,
            -reward.points_required,
            EntryKind::Spend,
            format!("Exchanged for reward #{}", reward.id),
            when,
        );
        self.redemptions.push(Redemption {
            id: self.redemptions.len() as RowId + 1,
            user_id,
            reward_id: reward.id,
            points_used: reward.points_required,
            status: REDEMPTION_STATUS.to_string(),
            created_at: when,
        });
    }

    fn push_entry(
        &mut self,
        user_id: UserId,
        delta: i64,
        kind: EntryKind,
        reason: String,
        created_at: NaiveDateTime,
    ) {
        self.entries.push(LedgerEntry {
            id: self.entries.len() as RowId + 1,
            user_id,
            delta,
            kind,
            reason,
            created_at,
        });
    }
}

/// Persist a plan atomically: ledger entries, redemptions and the final
/// stock of every reward, or nothing at all. Ids above the plan's last
/// entry or redemption are deleted in the same transaction, so the stored
/// ledger is exactly the plan even after a larger earlier run.
pub fn commit(plan: &LedgerPlan, store: &SeedStore, writer: &BulkWriter<'_>) -> SeedResult<LedgerCounts> {
    let tx = store.transaction()?;
    let staged = (|| -> SeedResult<LedgerCounts> {
        let ledger_rows = writer.upsert_within(&tx, Table::PointsLedger, &rows_of(&plan.entries))?;
        let redemption_rows =
            writer.upsert_within(&tx, Table::Redemptions, &rows_of(&plan.redemptions))?;
        let pruned_rows = prune_above(&tx, Table::Redemptions, plan.redemptions.len() as RowId)?
            + prune_above(&tx, Table::PointsLedger, plan.entries.len() as RowId)?;
        let mut stock_updates = 0;
        for (&reward_id, &stock) in &plan.final_stock {
            stock_updates += set_reward_stock(&tx, reward_id, stock)?;
        }
        Ok(LedgerCounts {
            ledger_rows,
            redemption_rows,
            stock_updates,
            pruned_rows,
        })
    })();

    match staged {
        Ok(counts) => {
            tx.commit()
                .map_err(|e| SeedError::LedgerTransactionFailure(Box::new(e.into())))?;
            log::info!(
                "ledger: committed {} entries, {} redemptions, {} stock updates ({} stale rows pruned)",
                counts.ledger_rows,
                counts.redemption_rows,
                counts.stock_updates,
                counts.pruned_rows
            );
            Ok(counts)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback() {
                log::error!("ledger: rollback failed: {rb}");
            }
            log::error!("ledger: transaction rolled back: {e}");
            Err(SeedError::LedgerTransactionFailure(Box::new(e)))
        }
    }
}
