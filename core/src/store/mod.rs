//! SQLite persistence layer.
//!
//! RULE: Only the store and the bulk writer talk to the database.
//! Generators build records; they never execute SQL directly.

mod schema;

pub use schema::{ColumnInfo, SchemaCatalog, TableSchema};

use crate::{
    balance_aggregator::PointsBalance,
    error::{SeedError, SeedResult},
    ledger_simulator::{EntryKind, LedgerEntry, Redemption, RewardSlot},
    types::{RewardId, RowId, Table},
};
use rusqlite::{params, Connection, OptionalExtension, Params, Transaction};

pub struct SeedStore {
    conn: Connection,
}

impl SeedStore {
    /// Open (or create) the target database at `path`.
    pub fn open(path: &str) -> SeedResult<Self> {
        let connect = || -> rusqlite::Result<Connection> {
            let conn = Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI,
            )?;
            // :memory: answers "memory" here rather than failing.
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            conn.execute_batch("PRAGMA foreign_keys=ON;")?;
            Ok(conn)
        };
        let conn = connect().map_err(|source| SeedError::ConnectionFailure {
            target: path.to_string(),
            source,
        })?;
        log::info!("store: opened {path}");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SeedResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| SeedError::ConnectionFailure {
            target: ":memory:".into(),
            source,
        })?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply the schema migrations in order.
    pub fn migrate(&self) -> SeedResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_seed_schema.sql"))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open an explicit transaction. Dropping it without commit rolls back.
    pub fn transaction(&self) -> SeedResult<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Run a direct parameterized statement. Returns affected rows.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> SeedResult<usize> {
        Ok(self.conn.execute(sql, params)?)
    }

    /// Run raw SQL (DDL, triggers, pragmas).
    pub fn execute_batch(&self, sql: &str) -> SeedResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn count_rows(&self, table: Table) -> SeedResult<i64> {
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM \"{}\"", table.as_str()),
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Ids of every company already in the store, ascending.
    pub fn company_ids(&self) -> SeedResult<Vec<RowId>> {
        let mut stmt = self.conn.prepare("SELECT id FROM companies ORDER BY id ASC")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // ── Rewards ────────────────────────────────────────────────

    /// The persisted catalog as the ledger simulation sees it.
    pub fn reward_inventory(&self) -> SeedResult<Vec<RewardSlot>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, points_required, stock FROM rewards ORDER BY id ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(RewardSlot {
                    id: row.get(0)?,
                    points_required: row.get(1)?,
                    stock: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn reward_stock(&self, reward_id: RewardId) -> SeedResult<Option<i64>> {
        let stock = self
            .conn
            .query_row(
                "SELECT stock FROM rewards WHERE id = ?1",
                params![reward_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stock)
    }

    // ── Ledger ─────────────────────────────────────────────────

    pub fn ledger_entries(&self) -> SeedResult<Vec<LedgerEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, delta, type, reason, created_at
             FROM points_ledger ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let kind: String = row.get(3)?;
                Ok(LedgerEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    delta: row.get(2)?,
                    kind: if kind == "spend" {
                        EntryKind::Spend
                    } else {
                        EntryKind::Earn
                    },
                    reason: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn redemptions(&self) -> SeedResult<Vec<Redemption>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, reward_id, points_used, status, created_at
             FROM redemptions ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Redemption {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    reward_id: row.get(2)?,
                    points_used: row.get(3)?,
                    status: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Balances ───────────────────────────────────────────────

    pub fn point_balances(&self) -> SeedResult<Vec<PointsBalance>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, current_balance, total_earned, total_spent, updated_at
             FROM points ORDER BY user_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PointsBalance {
                    user_id: row.get(0)?,
                    current_balance: row.get(1)?,
                    total_earned: row.get(2)?,
                    total_spent: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Overwrite one reward's stock. Runs on whatever connection or
/// transaction the caller holds.
pub fn set_reward_stock(conn: &Connection, reward_id: RewardId, stock: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE rewards SET stock = ?1 WHERE id = ?2",
        params![stock, reward_id],
    )
}

/// Delete every row of `table` whose id is above `max_id`: the tail left
/// behind by an earlier, larger run. Returns the rows removed.
pub fn prune_above(conn: &Connection, table: Table, max_id: RowId) -> rusqlite::Result<usize> {
    conn.execute(
        &format!("DELETE FROM \"{}\" WHERE id > ?1", table.as_str()),
        params![max_id],
    )
}
